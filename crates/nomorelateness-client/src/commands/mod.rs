//! Subcommand implementations.

#[cfg(feature = "google")]
pub mod auth;
pub mod config;
pub mod join;
pub mod view;

use nomorelateness_providers::CalendarProvider;

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Builds the calendar provider described by the configuration.
#[cfg(feature = "google")]
pub fn provider_from_config(config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    use nomorelateness_providers::google::GoogleProvider;

    let google_config = config.google_settings().to_provider_config()?;
    Ok(Box::new(GoogleProvider::new(google_config)?))
}

#[cfg(not(feature = "google"))]
pub fn provider_from_config(_config: &ClientConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(crate::error::ClientError::Config(
        "built without a calendar provider, enable the `google` feature".to_string(),
    ))
}
