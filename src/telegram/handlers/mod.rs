//! Telegram bot handler tree configuration
//!
//! Builds the dispatcher schema used by `main`.

mod callbacks;
mod commands;
mod messages;
mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
