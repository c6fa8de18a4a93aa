use clap::{Parser, Subcommand};
use std::sync::Arc;

use cogbot::application::errors::BotError;
use cogbot::application::messaging::{BlacklistMiddleware, LoggingMiddleware, MessageDispatcher};
use cogbot::application::services::{
    BlacklistManager, BotService, CommandService, MessageService, PrefixManager, TagManager,
};
use cogbot::cogs::{tags, BlacklistCog, GeneralCog, TagsCog};
use cogbot::domain::traits::Bot;
use cogbot::infrastructure::adapters::console::ConsoleAdapter;
use cogbot::infrastructure::adapters::discord::DiscordAdapter;
use cogbot::infrastructure::config::Config;
use cogbot::infrastructure::storage::Stores;

#[derive(Parser)]
#[command(name = "cogbot")]
#[command(about = "A Discord bot with guild prefixes, tags and a blacklist", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_bot(cli.config, cli.token) {
                tracing::error!("Bot error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("cogbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

fn run_bot(config_path: String, token_override: Option<String>) -> Result<(), BotError> {
    let mut config = load_config(&config_path);
    if token_override.is_some() {
        config.discord.token = token_override;
    }

    tracing::info!("Starting cogbot: {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("Failed to start runtime: {}", e)))?;

    rt.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), BotError> {
    let stores = Stores::open(&config.storage.directory)?;
    tracing::info!("Stores opened in {}", config.storage.directory.display());

    let prefixes = PrefixManager::new(stores.prefixes.clone(), config.bot.prefixes.clone());
    let blacklist = BlacklistManager::new(stores.blacklist.clone());
    let service = Arc::new(BotService::new(config.clone(), prefixes, blacklist));

    let mut commands = CommandService::new();
    commands.add_cog(Arc::new(GeneralCog::new(service.clone())))?;
    commands.add_cog(Arc::new(TagsCog::new(
        TagManager::new(stores.tags.clone(), &tags::SUBCOMMANDS),
        service.clone(),
    )))?;
    commands.add_cog(Arc::new(BlacklistCog::new(service.clone())))?;

    let dispatcher = MessageDispatcher::new(service.clone(), commands)
        .with_middleware(LoggingMiddleware)
        .with_middleware(BlacklistMiddleware::new(service.clone()));

    let result = match config.discord.token.clone() {
        Some(token) => {
            let bot = Arc::new(DiscordAdapter::new(token));
            run(bot, dispatcher, service.clone()).await
        }
        None => {
            let user_id = config.bot.owners.first().copied().unwrap_or_default();
            tracing::info!("No Discord token configured, reading commands from stdin as {}", user_id);
            let bot = Arc::new(ConsoleAdapter::new(user_id));
            run(bot, dispatcher, service.clone()).await
        }
    };

    // Persistence goes down whatever way the adapter stopped
    if let Err(e) = stores.close_all().await {
        tracing::error!("Failed to close stores: {}", e);
    }
    tracing::info!("Shutdown complete");
    result
}

async fn run<B: Bot + 'static>(
    bot: Arc<B>,
    dispatcher: MessageDispatcher,
    service: Arc<BotService>,
) -> Result<(), BotError> {
    let events = Arc::new(MessageService::new(bot.clone(), dispatcher, service.clone()));

    let ctrl_c = service.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C");
                ctrl_c.request_shutdown();
            }
            Err(e) => tracing::warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    bot.start(events).await
}

fn init_config() {
    match Config::default().to_yaml() {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => eprintln!("Failed to render default config: {}", e),
    }
}
