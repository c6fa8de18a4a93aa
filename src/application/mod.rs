//! Application layer - Use cases and business logic
//!
//! This layer contains:
//! - Services: Bot façade, keyed managers, command registry, message flow
//! - Errors: Closed error kinds switched on by the dispatcher
//! - Messaging: Message parsing, middleware, dispatching
//! - Pagination: Text chunking and page navigation

pub mod errors;
pub mod services;
pub mod messaging;
pub mod pagination;
