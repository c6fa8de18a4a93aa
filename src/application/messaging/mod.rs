//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod middleware;
pub mod parser;
pub mod reply;

pub use dispatcher::MessageDispatcher;
pub use middleware::{BlacklistMiddleware, Context, LoggingMiddleware, Middleware, MiddlewareError, Next};
pub use parser::{Args, Invocation, MessageParser};
pub use reply::Reply;
