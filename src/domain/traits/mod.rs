//! Domain traits - Abstractions for infrastructure implementations

pub mod bot;
pub mod store;

pub use bot::{Bot, BotInfo, EventHandler, PageView, UserLookup};
pub use store::{KeyedStore, Removal};
