//! What a command asks the platform adapter to do

use crate::application::pagination::Paginator;

pub const TICK_OK: &str = "\u{2705}";
pub const TICK_FAILED: &str = "\u{274C}";

#[derive(Debug, Clone)]
pub enum Reply {
    /// Send text to the invoking channel
    Text(String),
    /// React to the invoking message with a check mark (or a cross)
    Tick(bool),
    /// Start an interactive paginated view
    Pages(Paginator),
    /// Close the gateway and persistence, then exit
    Shutdown,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn tick() -> Self {
        Reply::Tick(true)
    }

    pub fn emoji(check: bool) -> &'static str {
        if check {
            TICK_OK
        } else {
            TICK_FAILED
        }
    }
}
