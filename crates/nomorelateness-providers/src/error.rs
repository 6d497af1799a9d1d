//! Error types for calendar provider operations.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What went wrong while talking to a calendar backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// No usable tokens: never authenticated, or the refresh was rejected.
    AuthenticationFailed,
    /// Tokens are valid but lack access to the calendar.
    AuthorizationFailed,
    /// The request never got an HTTP answer.
    NetworkError,
    RateLimited,
    /// The backend answered with an unexpected status.
    ServerError,
    /// The body could not be decoded.
    InvalidResponse,
    /// The calendar ID does not exist.
    NotFound,
    /// Bad credentials, unreadable files, unwritable token paths.
    ConfigurationError,
    InternalError,
}

impl ProviderErrorCode {
    /// Transient failures that the same request may get past later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::RateLimited | Self::ServerError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed provider operation.
///
/// Displays as `[provider] code: message`, with the retry delay appended
/// when the backend sent one.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    provider: Option<String>,
    retry_after: Option<Duration>,
    #[source]
    source: Option<BoxError>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::RateLimited, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Maps a non-success status from the calendar API.
    pub fn from_http_status(status: u16, body: &str) -> Self {
        let (code, message) = match status {
            401 => (
                ProviderErrorCode::AuthenticationFailed,
                "access token rejected".to_string(),
            ),
            403 => (
                ProviderErrorCode::AuthorizationFailed,
                "calendar access denied".to_string(),
            ),
            404 => (ProviderErrorCode::NotFound, "calendar not found".to_string()),
            429 => (ProviderErrorCode::RateLimited, "too many requests".to_string()),
            _ => (
                ProviderErrorCode::ServerError,
                format!("HTTP {}: {}", status, body.trim()),
            ),
        };
        Self::new(code, message)
    }

    /// Tags the error with the provider it came from.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// The delay requested by a `Retry-After` header.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.provider {
            Some(ref provider) => write!(f, "[{}] {}: {}", provider, self.code, self.message)?,
            None => write!(f, "{}: {}", self.code, self.message)?,
        }
        match self.retry_after {
            Some(delay) => write!(f, ", retry after {} seconds", delay.as_secs()),
            None => Ok(()),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
