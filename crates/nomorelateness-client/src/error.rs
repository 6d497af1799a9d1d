//! Client error types.

use nomorelateness_core::TracingError;
use nomorelateness_providers::ProviderError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A `pass::` or `env::` reference could not be resolved.
    #[error("secret error: {0}")]
    Secret(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Launching a meeting link failed.
    #[error("action failed: {0}")]
    Action(String),

    #[error("failed to initialise logging: {0}")]
    Tracing(#[from] TracingError),
}
