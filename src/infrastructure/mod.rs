//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite table definitions
//! - Storage: Cache-backed keyed stores
//! - Adapters: Platform integrations (Discord, console)

pub mod adapters;
pub mod config;
pub mod database;
pub mod storage;
