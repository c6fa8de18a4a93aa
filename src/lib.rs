//! cogbot - a small Discord bot with guild prefixes, tags and a user blacklist

pub mod application;
pub mod cogs;
pub mod domain;
pub mod infrastructure;
