//! Application services - Business logic orchestration

pub mod blacklist_service;
pub mod bot_service;
pub mod command_service;
pub mod message_service;
pub mod prefix_service;
pub mod tag_service;

pub use blacklist_service::BlacklistManager;
pub use bot_service::BotService;
pub use command_service::CommandService;
pub use message_service::MessageService;
pub use prefix_service::PrefixManager;
pub use tag_service::TagManager;
