use thiserror::Error;

use crate::download::error::DownloadError;
use crate::download::pipeline::TransportError;

/// Centralized error types for the application
///
/// Component boundaries return their own error kinds (`DownloadError`,
/// `ToolError`); everything is converted to this enum at the top level.
///
/// # Example
///
/// ```no_run
/// use vidrelay::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Pipeline errors (probe, fetch, split, delivery)
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Chat transport errors outside a download attempt
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
