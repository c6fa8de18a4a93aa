//! Domain layer - Core business objects and the seams to infrastructure
//!
//! This layer contains:
//! - Entities: Core business objects (User, Message, Command, Tag)
//! - Traits: Abstractions for infrastructure (Bot, KeyedStore)

pub mod entities;
pub mod traits;
