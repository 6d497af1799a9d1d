//! Google Calendar provider configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Directory, under the home directory, holding the Google client files.
const GOOGLE_CONFIG_DIR: [&str; 2] = [".config", "google"];

/// File name of the OAuth client credentials downloaded from Google.
const CREDENTIALS_FILE_NAME: &str = "no-more-lateness.json";

/// File name of the persisted OAuth tokens.
const TOKEN_FILE_NAME: &str = "no-more-lateness_token.json";

/// OAuth 2.0 client credentials for Google API access.
///
/// Google requires a registered application, so users bring their own client
/// ID and secret from the Cloud Console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// The client secret JSON from the Cloud Console: an `installed` or `web`
/// section, or the two keys at the top level.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CredentialsFile {
    Installed { installed: ClientSecret },
    Web { web: ClientSecret },
    Flat(ClientSecret),
}

#[derive(Debug, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Loads OAuth credentials from a Google Cloud Console JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ProviderResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read credentials file {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        let secret = match serde_json::from_value(value) {
            Ok(CredentialsFile::Installed { installed }) => installed,
            Ok(CredentialsFile::Web { web }) => web,
            Ok(CredentialsFile::Flat(secret)) => secret,
            Err(_) => {
                return Err(ProviderError::configuration(
                    "credentials file needs an 'installed' or 'web' section, or client_id and client_secret at the top level",
                ));
            }
        };
        Ok(Self::new(secret.client_id, secret.client_secret))
    }

    /// Checks that the credentials look like a Google desktop client.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if !self.client_id.ends_with(".apps.googleusercontent.com") {
            return Err("client_id should end with .apps.googleusercontent.com");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for the Google Calendar provider.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub credentials: OAuthCredentials,

    /// Path to store OAuth tokens.
    ///
    /// Defaults to `~/.config/google/no-more-lateness_token.json`.
    pub token_path: PathBuf,

    /// Calendar IDs to fetch from, merged and re-sorted by start time.
    pub calendar_ids: Vec<String>,

    pub timeout: Duration,
    pub user_agent: String,

    /// Ports tried, in order, for the loopback OAuth redirect.
    pub loopback_port_range: (u16, u16),

    pub scopes: Vec<String>,
}

impl GoogleConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Read-only calendar access.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar.readonly";

    pub fn new(credentials: OAuthCredentials) -> Self {
        Self {
            credentials,
            token_path: Self::default_token_path(),
            calendar_ids: vec!["primary".to_string()],
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("no-more-lateness/{}", env!("CARGO_PKG_VERSION")),
            loopback_port_range: (8080, 8090),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    fn google_dir() -> PathBuf {
        let mut dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        dir.extend(GOOGLE_CONFIG_DIR);
        dir
    }

    /// `~/.config/google/no-more-lateness.json`
    pub fn default_credentials_path() -> PathBuf {
        Self::google_dir().join(CREDENTIALS_FILE_NAME)
    }

    /// `~/.config/google/no-more-lateness_token.json`
    pub fn default_token_path() -> PathBuf {
        Self::google_dir().join(TOKEN_FILE_NAME)
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    /// Replaces the calendar IDs; an empty list keeps the current ones.
    pub fn with_calendar_ids(mut self, ids: Vec<String>) -> Self {
        if !ids.is_empty() {
            self.calendar_ids = ids;
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_loopback_port_range(mut self, start: u16, end: u16) -> Self {
        self.loopback_port_range = (start, end);
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ProviderResult<()> {
        self.credentials
            .validate()
            .map_err(|e| ProviderError::configuration(format!("invalid credentials: {}", e)))?;

        if self.scopes.is_empty() {
            return Err(ProviderError::configuration(
                "at least one OAuth scope is required",
            ));
        }

        if self.loopback_port_range.0 > self.loopback_port_range.1 {
            return Err(ProviderError::configuration("invalid loopback port range"));
        }

        Ok(())
    }
}
