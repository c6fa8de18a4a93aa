//! Domain entities - Core business objects with no external dependencies

pub mod user;
pub mod message;
pub mod command;
pub mod tag;

pub use user::User;
pub use message::Message;
pub use command::{Command, CommandRegistry};
pub use tag::{Tag, TagKey, TagRecord, normalize_tag_name};
