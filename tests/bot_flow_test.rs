//! End-to-end command flow over in-memory stores and a recording bot
//! Run with: cargo test --test bot_flow_test

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use cogbot::application::errors::BotError;
use cogbot::application::messaging::{Args, BlacklistMiddleware, Context, LoggingMiddleware, MessageDispatcher};
use cogbot::application::pagination::PageAction;
use cogbot::application::services::{
    BlacklistManager, BotService, CommandService, MessageService, PrefixManager, TagManager,
};
use cogbot::cogs::{tags, BlacklistCog, Cog, CommandResult, GeneralCog, TagsCog};
use cogbot::domain::entities::{Command, Message, User};
use cogbot::domain::traits::{Bot, BotInfo, EventHandler, PageView, UserLookup};
use cogbot::infrastructure::config::Config;
use cogbot::infrastructure::storage::Stores;

const ME: u64 = 42;
const OWNER: u64 = 100;
const GUILD: u64 = 7;
const CHANNEL: u64 = 8;
/// A bot account the platform knows about
const OTHER_BOT: u64 = 9;

static INIT: Once = Once::new();

fn ensure_init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Send(u64, String),
    /// Sent page and the message id it got
    Page(u64, PageView),
    Edit(u64, PageView),
    Delete(u64),
    React(u64, String),
}

struct MockBot {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
}

impl MockBot {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(10_000),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }
}

#[async_trait]
impl UserLookup for MockBot {
    async fn fetch_user(&self, user_id: u64) -> Result<Option<User>, BotError> {
        Ok(match user_id {
            ME | OTHER_BOT => Some(User::new(user_id).bot()),
            1..=8 | OWNER | 1000..=1099 => Some(User::new(user_id)),
            _ => None,
        })
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn start(&self, _events: Arc<dyn EventHandler>) -> Result<(), BotError> {
        Ok(())
    }

    async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64, BotError> {
        self.record(Call::Send(channel_id, text.to_string()));
        Ok(self.next_id())
    }

    async fn send_page(&self, _channel_id: u64, view: &PageView) -> Result<u64, BotError> {
        let id = self.next_id();
        self.record(Call::Page(id, view.clone()));
        Ok(id)
    }

    async fn edit_page(&self, _channel_id: u64, message_id: u64, view: &PageView) -> Result<(), BotError> {
        self.record(Call::Edit(message_id, view.clone()));
        Ok(())
    }

    async fn delete_message(&self, _channel_id: u64, message_id: u64) -> Result<(), BotError> {
        self.record(Call::Delete(message_id));
        Ok(())
    }

    async fn add_reaction(&self, _channel_id: u64, message_id: u64, emoji: &str) -> Result<(), BotError> {
        self.record(Call::React(message_id, emoji.to_string()));
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: ME,
            name: "cogbot".to_string(),
        }
    }
}

/// Always panics, to exercise the dispatcher's failure path
struct Explosive;

#[async_trait]
impl Cog for Explosive {
    fn name(&self) -> &str {
        "Explosive"
    }

    fn description(&self) -> &str {
        "Goes boom"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("boom")]
    }

    async fn invoke(&self, _ctx: &Context, _args: Args) -> CommandResult {
        panic!("boom");
    }
}

struct Harness {
    bot: Arc<MockBot>,
    core: Arc<BotService>,
    stores: Stores,
    service: MessageService<MockBot>,
    next_message: AtomicU64,
}

impl Harness {
    fn new() -> Self {
        Self::with_timeout(Duration::from_secs(180))
    }

    fn with_timeout(timeout: Duration) -> Self {
        ensure_init();

        let mut config = Config::default();
        config.bot.owners = vec![OWNER];

        let stores = Stores::in_memory().unwrap();
        let prefixes = PrefixManager::new(stores.prefixes.clone(), config.bot.prefixes.clone());
        let blacklist = BlacklistManager::new(stores.blacklist.clone());
        let core = Arc::new(BotService::new(config, prefixes, blacklist));

        let mut commands = CommandService::new();
        commands.add_cog(Arc::new(GeneralCog::new(core.clone()))).unwrap();
        commands
            .add_cog(Arc::new(TagsCog::new(
                TagManager::new(stores.tags.clone(), &tags::SUBCOMMANDS),
                core.clone(),
            )))
            .unwrap();
        commands.add_cog(Arc::new(BlacklistCog::new(core.clone()))).unwrap();
        commands.add_cog(Arc::new(Explosive)).unwrap();

        let dispatcher = MessageDispatcher::new(core.clone(), commands)
            .with_middleware(LoggingMiddleware)
            .with_middleware(BlacklistMiddleware::new(core.clone()));

        let bot = Arc::new(MockBot::new());
        let service = MessageService::new(bot.clone(), dispatcher, core.clone()).with_timeout(timeout);

        Self {
            bot,
            core,
            stores,
            service,
            next_message: AtomicU64::new(1),
        }
    }

    fn message(&self, author: u64, text: &str) -> Message {
        let id = self.next_message.fetch_add(1, Ordering::Relaxed);
        Message::new(id, CHANNEL, User::new(author), text).in_guild(GUILD)
    }

    async fn send(&self, message: Message) -> Vec<Call> {
        self.service.process(message).await.unwrap();
        self.bot.take()
    }

    /// Send `text` in the guild channel as `author` and return what the bot did
    async fn say(&self, author: u64, text: &str) -> Vec<Call> {
        self.send(self.message(author, text)).await
    }

    async fn say_in_dm(&self, author: u64, text: &str) -> Vec<Call> {
        let id = self.next_message.fetch_add(1, Ordering::Relaxed);
        self.send(Message::new(id, CHANNEL, User::new(author), text)).await
    }
}

fn text(reply: &str) -> Vec<Call> {
    vec![Call::Send(CHANNEL, reply.to_string())]
}

fn is_tick(calls: &[Call]) -> bool {
    matches!(calls, [Call::React(_, emoji)] if emoji == "\u{2705}")
}

#[tokio::test]
async fn test_ping() {
    let h = Harness::new();
    assert_eq!(h.say(1, "!ping").await, text("Pong."));
    assert!(h.say(1, "ping").await.is_empty());
    assert!(h.say(1, "!nosuchcommand").await.is_empty());
}

#[tokio::test]
async fn test_guild_prefix_and_mentions() {
    let h = Harness::new();
    assert!(is_tick(&h.say(OWNER, "!prefix set ? ;;").await));

    assert!(h.say(1, "!ping").await.is_empty());
    assert_eq!(h.say(1, "?ping").await, text("Pong."));
    assert_eq!(h.say(1, ";;ping").await, text("Pong."));

    // Mentions keep working whatever the guild prefix is
    assert_eq!(h.say(1, "<@42> ping").await, text("Pong."));
    assert_eq!(h.say(1, "<@!42> ping").await, text("Pong."));

    // DMs keep the default
    assert_eq!(h.say_in_dm(1, "!ping").await, text("Pong."));

    assert!(is_tick(&h.say(OWNER, "?prefix reset").await));
    assert_eq!(h.say(1, "!ping").await, text("Pong."));
}

#[tokio::test]
async fn test_prefix_is_owner_only() {
    let h = Harness::new();
    assert!(h.say(1, "!prefix set ?").await.is_empty());
    assert_eq!(h.say(1, "!ping").await, text("Pong."));
}

#[tokio::test]
async fn test_show_prefix() {
    let h = Harness::new();
    assert_eq!(
        h.say(OWNER, "!show_prefix").await,
        text(r#"["!", "<@42> ", "<@!42> "]"#)
    );
    assert!(h.say(1, "!show_prefix").await.is_empty());
}

#[tokio::test]
async fn test_tag_lifecycle() {
    let h = Harness::new();

    assert_eq!(
        h.say(1, "!tag create create x").await,
        text("That tag name is reserved (probably for subcommands)")
    );

    assert!(is_tick(&h.say(1, "!tag create foo bar baz").await));
    assert_eq!(h.say(2, "!tag foo").await, text("bar baz"));
    assert_eq!(h.say(2, "!tag FOO").await, text("bar baz"));
    assert_eq!(h.say(2, "!tag create foo other").await, text("That tag already exists."));

    assert_eq!(h.say(2, "!tag delete foo").await, text("You are not the author of that tag"));
    assert_eq!(h.say(2, "!tag foo").await, text("bar baz"));

    assert!(is_tick(&h.say(1, "!tag delete foo").await));
    assert_eq!(h.say(1, "!tag delete foo").await, text("I could not find that tag."));
}

#[tokio::test]
async fn test_blank_tag_name_shows_help() {
    let h = Harness::new();
    for input in ["!tag create \"\" some response", "!tag create \"  \" some response"] {
        match h.say(1, input).await.as_slice() {
            [Call::Send(_, help)] => assert!(help.starts_with("!tag create <name> <response>"), "{}", help),
            other => panic!("unexpected calls for {}: {:?}", input, other),
        }
    }
    assert_eq!(h.say(1, "!tag list").await, text("There are no tags in this server"));
}

#[tokio::test]
async fn test_owner_may_delete_any_tag() {
    let h = Harness::new();
    assert!(is_tick(&h.say(1, "!tag create foo bar").await));
    assert!(is_tick(&h.say(OWNER, "!tag delete foo").await));
}

#[tokio::test]
async fn test_unknown_tag_shows_help() {
    let h = Harness::new();
    let calls = h.say(1, "!tag nope").await;
    match calls.as_slice() {
        [Call::Send(_, help)] => assert!(help.starts_with("!tag <name>"), "{}", help),
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn test_tags_are_guild_only() {
    let h = Harness::new();
    assert!(h.say_in_dm(1, "!tag create foo bar").await.is_empty());
    assert!(h.say_in_dm(1, "!tag list").await.is_empty());
}

#[tokio::test]
async fn test_tag_list() {
    let h = Harness::new();
    assert_eq!(h.say(1, "!tag list").await, text("There are no tags in this server"));

    h.say(1, "!tag create beta b").await;
    h.say(1, "!tag create alpha a").await;

    match h.say(1, "!tag list").await.as_slice() {
        [Call::Page(_, view)] => {
            assert_eq!(view.title, "Tags");
            assert_eq!(view.body, "```yml\nTags:\n\t- alpha\n\t- beta```");
            assert_eq!(view.footer, "Page 1/1");
        }
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn test_long_replies_are_split() {
    let h = Harness::new();
    let response = "word ".repeat(500);
    assert!(is_tick(&h.say(1, &format!("!tag create long {}", response)).await));

    let calls = h.say(1, "!tag long").await;
    assert_eq!(calls.len(), 2);
    for call in calls {
        match call {
            Call::Send(_, chunk) => assert!(chunk.chars().count() <= 2000),
            other => panic!("unexpected call: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_blacklist_blocks_and_unblocks() {
    let h = Harness::new();
    assert!(is_tick(&h.say(OWNER, "!blacklist add <@5> spamming").await));
    assert!(h.core.is_blocked(5).await);

    assert!(h.say(5, "!ping").await.is_empty());
    assert!(h.say(5, "<@42> ping").await.is_empty());

    match h.say(OWNER, "!blacklist list").await.as_slice() {
        [Call::Page(_, view)] => {
            assert_eq!(view.title, "Blacklist");
            assert!(view.body.contains("Blacklisted Users:\n\t- 5: spamming"), "{}", view.body);
        }
        other => panic!("unexpected calls: {:?}", other),
    }

    assert!(is_tick(&h.say(OWNER, "!blacklist remove <@5>").await));
    assert!(!h.core.is_blocked(5).await);
    assert_eq!(h.say(5, "!ping").await, text("Pong."));
    assert_eq!(h.say(OWNER, "!blacklist list").await, text("There are no blacklisted users"));
}

#[tokio::test]
async fn test_blacklist_default_reason() {
    let h = Harness::new();
    assert!(is_tick(&h.say(OWNER, "!blacklist add 5 6").await));
    let list = h.core.blacklist_manager().get_blacklist().await.unwrap();
    assert_eq!(list.get(&5).map(String::as_str), Some("No reason provided"));
    assert_eq!(list.get(&6).map(String::as_str), Some("No reason provided"));
}

#[tokio::test]
async fn test_blacklist_users_stop_at_unknown_word() {
    let h = Harness::new();
    assert!(is_tick(&h.say(OWNER, "!blacklist add <@5> 3000 strikes").await));

    let list = h.core.blacklist_manager().get_blacklist().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.get(&5).map(String::as_str), Some("3000 strikes"));
    assert!(!h.core.is_blocked(3000).await);

    // An unknown user where a user is required is a usage error
    match h.say(OWNER, "!blacklist remove <@5> 3000").await.as_slice() {
        [Call::Send(_, help)] => assert!(help.starts_with("!blacklist remove"), "{}", help),
        other => panic!("unexpected calls: {:?}", other),
    }
    assert!(h.core.is_blocked(5).await);
}

#[tokio::test]
async fn test_bare_bot_id_is_refused() {
    let h = Harness::new();
    assert_eq!(h.say(OWNER, "!blacklist add 9 beep").await, text("That user is a bot"));
    assert_eq!(h.say(OWNER, "!blacklist add 42").await, text("Oh, I see how it is"));
    assert!(!h.core.is_blocked(OTHER_BOT).await);
}

#[tokio::test]
async fn test_blacklist_refusals() {
    let h = Harness::new();

    assert_eq!(h.say(OWNER, "!blacklist add <@42>").await, text("Oh, I see how it is"));
    assert_eq!(
        h.say(OWNER, "!blacklist add <@100>").await,
        text("If you don't wanna talk to me just don't talk to me")
    );
    let mentions_bot = h
        .message(OWNER, "!blacklist add <@9>")
        .with_mentions(vec![User::new(9).bot()]);
    assert_eq!(h.send(mentions_bot).await, text("That user is a bot"));

    assert_eq!(h.say(OWNER, "!blacklist remove <@42>").await, text("Bruh"));
    assert_eq!(h.say(OWNER, "!blacklist remove <@100>").await, text("*angery noises*"));
    let mentions_bot = h
        .message(OWNER, "!blacklist remove <@9>")
        .with_mentions(vec![User::new(9).bot()]);
    assert_eq!(h.send(mentions_bot).await, text("That user is a bot"));

    assert!(h.core.blacklist_manager().get_blacklist().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blacklist_without_users_shows_help() {
    let h = Harness::new();
    h.say(OWNER, "!blacklist add 5").await;

    for (input, usage) in [
        ("!blacklist add", "!blacklist add <users...> [reason]"),
        ("!blacklist remove", "!blacklist remove <users...>"),
        ("!blacklist", "!blacklist"),
    ] {
        match h.say(OWNER, input).await.as_slice() {
            [Call::Send(_, help)] => assert!(help.starts_with(usage), "{}", help),
            other => panic!("unexpected calls for {}: {:?}", input, other),
        }
    }

    // Nothing was dropped
    assert!(h.core.is_blocked(5).await);
}

#[tokio::test]
async fn test_blacklist_is_owner_only() {
    let h = Harness::new();
    assert!(h.say(1, "!blacklist add <@5>").await.is_empty());
    assert!(h.say(1, "!blacklist list").await.is_empty());
    assert!(!h.core.is_blocked(5).await);
}

async fn open_long_blacklist(h: &Harness) -> (u64, PageView) {
    let users: Vec<String> = (1000..1030).map(|id| id.to_string()).collect();
    let command = format!("!blacklist add {} being rude", users.join(" "));
    assert!(is_tick(&h.say(OWNER, &command).await));

    match h.say(OWNER, "!blacklist list").await.as_slice() {
        [Call::Page(id, view)] => (*id, view.clone()),
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn test_page_navigation() {
    let h = Harness::new();
    let (page_id, first) = open_long_blacklist(&h).await;
    assert!(first.footer.starts_with("Page 1/"));
    let total: usize = first.footer["Page 1/".len()..].parse().unwrap();
    assert!(total > 1);

    // Wraps backwards from the first page
    assert!(h.service.handle_page_action(page_id, OWNER, PageAction::Previous).await.unwrap());
    match h.bot.take().as_slice() {
        [Call::Edit(id, view)] => {
            assert_eq!(*id, page_id);
            assert_eq!(view.footer, format!("Page {}/{}", total, total));
        }
        other => panic!("unexpected calls: {:?}", other),
    }

    // And forwards from the last one
    assert!(h.service.handle_page_action(page_id, OWNER, PageAction::Next).await.unwrap());
    match h.bot.take().as_slice() {
        [Call::Edit(_, view)] => assert_eq!(view, &first),
        other => panic!("unexpected calls: {:?}", other),
    }

    // Only the invoker drives the view
    assert!(!h.service.handle_page_action(page_id, 1, PageAction::Next).await.unwrap());
    assert!(h.bot.take().is_empty());

    assert!(h.service.handle_page_action(page_id, OWNER, PageAction::Stop).await.unwrap());
    assert_eq!(h.bot.take(), vec![Call::Delete(page_id)]);
    assert!(!h.service.handle_page_action(page_id, OWNER, PageAction::Next).await.unwrap());
    assert_eq!(h.service.active_sessions().await, 0);
}

#[tokio::test]
async fn test_component_ids_route_to_sessions() {
    let h = Harness::new();
    let (page_id, _) = open_long_blacklist(&h).await;

    assert!(h.service.on_component(page_id, OWNER, "pager:last").await);
    assert!(!h.service.on_component(page_id, OWNER, "something:else").await);
    assert!(!h.service.on_component(page_id + 100, OWNER, "pager:next").await);
}

#[tokio::test]
async fn test_page_session_times_out() {
    let h = Harness::with_timeout(Duration::ZERO);
    let (page_id, _) = open_long_blacklist(&h).await;

    assert!(!h.service.handle_page_action(page_id, OWNER, PageAction::Next).await.unwrap());
    assert!(h.bot.take().is_empty());
}

#[tokio::test]
async fn test_shutdown() {
    let h = Harness::new();
    let mut signal = h.core.shutdown_signal();

    assert!(h.say(1, "!shutdown").await.is_empty());
    assert!(!h.core.is_shutting_down());

    assert_eq!(h.say(OWNER, "!shutdown").await, text("Okay, I'm shutting down"));
    assert!(h.core.is_shutting_down());
    signal.changed().await.unwrap();
    assert!(*signal.borrow());
}

#[tokio::test]
async fn test_application_owner_added_on_ready() {
    let h = Harness::new();
    assert!(h.say(55, "!show_prefix").await.is_empty());

    h.service.on_ready(h.bot.bot_info(), Some(55)).await;
    assert!(!h.say(55, "!show_prefix").await.is_empty());
}

#[tokio::test]
async fn test_panicking_command_reports_error() {
    let h = Harness::new();
    assert_eq!(h.say(1, "!boom").await, text("I'm sorry! That command errored."));
    // The bot keeps working afterwards
    assert_eq!(h.say(1, "!ping").await, text("Pong."));
}

#[tokio::test]
async fn test_storage_failure_reports_error() {
    let h = Harness::new();
    assert!(is_tick(&h.say(1, "!tag create foo bar").await));
    h.stores.close_all().await.unwrap();

    let errored = text("I'm sorry! That command errored.");
    assert_eq!(h.say(1, "!tag create other thing").await, errored);
    assert_eq!(h.say(1, "!tag list").await, errored);
    assert_eq!(h.say(OWNER, "!blacklist add <@5>").await, errored);

    // Commands that need no storage still answer
    assert_eq!(h.say(1, "!ping").await, text("Pong."));
}

#[tokio::test]
async fn test_bots_are_ignored() {
    let h = Harness::new();
    let from_bot = Message::new(1, CHANNEL, User::new(77).bot(), "!ping").in_guild(GUILD);
    assert!(h.send(from_bot).await.is_empty());
}

#[tokio::test]
async fn test_help() {
    let h = Harness::new();
    match h.say(1, "!help").await.as_slice() {
        [Call::Send(_, help)] => {
            assert!(help.starts_with("Available commands:"));
            assert!(help.contains("!tag - Show a tag"));
            assert!(help.contains("!blacklist - Manage the blacklist"));
        }
        other => panic!("unexpected calls: {:?}", other),
    }
    match h.say(1, "!help tag create").await.as_slice() {
        [Call::Send(_, help)] => assert_eq!(help, "!tag create <name> <response>\nCreate a tag"),
        other => panic!("unexpected calls: {:?}", other),
    }
}
