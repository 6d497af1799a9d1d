//! Google Calendar provider.
//!
//! Talks to the Calendar API v3 with OAuth 2.0 tokens obtained through a
//! PKCE loopback flow. Users register their own OAuth desktop client in the
//! Google Cloud Console and point the provider at the downloaded JSON file
//! (by default `~/.config/google/no-more-lateness.json`).
//!
//! # Example
//!
//! ```ignore
//! use nomorelateness_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file(GoogleConfig::default_credentials_path())?;
//! let provider = GoogleProvider::new(GoogleConfig::new(credentials))?;
//!
//! if provider.needs_reauth() {
//!     provider.authenticate().await?;
//! }
//!
//! let events = provider.fetch_events(FetchOptions::upcoming(Utc::now())).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use config::{GoogleConfig, OAuthCredentials};
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
