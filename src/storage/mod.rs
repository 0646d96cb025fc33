//! In-memory session state

pub mod session;

pub use session::{spawn_sweeper, SessionKey, SessionStore};
