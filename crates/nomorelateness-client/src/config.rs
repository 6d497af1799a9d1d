//! Client configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/no-more-lateness/config.toml`. Every section is optional.
//!
//! ```toml
//! [google]
//! client_id = "pass::google/no-more-lateness/client_id"
//! client_secret = "env::NML_CLIENT_SECRET"
//! calendar_ids = ["primary"]
//!
//! [view]
//! attendee_address = "me@example.com"
//!
//! [fetch]
//! max_results = 5
//! ```
//!
//! Credential values accept secret references, see [`crate::secret`].

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use nomorelateness_providers::FetchOptions;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

const CONFIG_DIR_NAME: &str = "no-more-lateness";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration for the no-more-lateness client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Google Calendar settings.
    pub google: Option<GoogleSettings>,

    pub view: ViewSettings,

    pub fetch: FetchSettings,
}

/// Settings for the `view` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Whose response status fills the GOING column.
    pub attendee_address: Option<String>,

    /// Links longer than this are cut.
    pub max_link_length: usize,

    /// Bold rows on or off; unset means bold only when stdout is a terminal.
    pub color: Option<bool>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            attendee_address: None,
            max_link_length: 80,
            color: None,
        }
    }
}

impl ViewSettings {
    pub fn emphasis(&self) -> bool {
        self.color
            .unwrap_or_else(|| std::io::stdout().is_terminal())
    }
}

/// How many events are fetched, and from how far back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_results: usize,

    /// Meetings that started up to this many minutes ago are still listed.
    pub lookback_minutes: i64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_results: FetchOptions::DEFAULT_MAX_RESULTS,
            lookback_minutes: FetchOptions::DEFAULT_LOOKBACK_MINUTES,
        }
    }
}

impl FetchSettings {
    /// Fetch options as seen at `now`.
    pub fn options(&self, now: DateTime<Utc>) -> FetchOptions {
        FetchOptions::new(now - Duration::minutes(self.lookback_minutes))
            .with_max_results(self.max_results)
    }
}

impl ClientConfig {
    /// Loads configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// `~/.config/no-more-lateness/config.toml`
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join(CONFIG_FILE_NAME)
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    /// The `[google]` section, or its defaults when absent.
    pub fn google_settings(&self) -> GoogleSettings {
        self.google.clone().unwrap_or_default()
    }
}

/// Google Calendar provider settings.
///
/// Credentials come from, in order: inline `client_id` / `client_secret`,
/// `credentials_file`, then the default credentials file
/// `~/.config/google/no-more-lateness.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleSettings {
    /// Path to a Cloud Console credentials JSON file.
    pub credentials_file: Option<PathBuf>,

    /// OAuth client ID (supports `pass::` and `env::` prefixes).
    pub client_id: Option<String>,

    /// OAuth client secret (supports `pass::` and `env::` prefixes).
    pub client_secret: Option<String>,

    /// Calendar IDs to fetch; empty means `primary`.
    #[serde(default)]
    pub calendar_ids: Vec<String>,

    /// Where OAuth tokens are stored.
    pub token_path: Option<PathBuf>,
}

#[cfg(feature = "google")]
impl GoogleSettings {
    /// Builds the provider configuration, resolving credentials on the way.
    pub fn to_provider_config(
        &self,
    ) -> ClientResult<nomorelateness_providers::google::GoogleConfig> {
        use nomorelateness_providers::google::GoogleConfig;

        let credentials = self.resolve_credentials()?;
        credentials
            .validate()
            .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

        let mut config =
            GoogleConfig::new(credentials).with_calendar_ids(self.calendar_ids.clone());
        if let Some(ref path) = self.token_path {
            config = config.with_token_path(path);
        }
        Ok(config)
    }

    /// Resolves OAuth credentials from inline values or a credentials file.
    pub(crate) fn resolve_credentials(
        &self,
    ) -> ClientResult<nomorelateness_providers::google::OAuthCredentials> {
        use nomorelateness_providers::google::{GoogleConfig, OAuthCredentials};

        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) => {
                return Ok(OAuthCredentials::new(
                    crate::secret::resolve(id)?,
                    crate::secret::resolve(secret)?,
                ));
            }
            (Some(_), None) => {
                return Err(ClientError::Config(
                    "client_secret is missing from the [google] section".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ClientError::Config(
                    "client_id is missing from the [google] section".to_string(),
                ));
            }
            (None, None) => {}
        }

        if let Some(ref path) = self.credentials_file {
            return Ok(OAuthCredentials::from_file(path)?);
        }

        let default_path = GoogleConfig::default_credentials_path();
        if default_path.exists() {
            return Ok(OAuthCredentials::from_file(&default_path)?);
        }

        Err(ClientError::Config(format!(
            "Google credentials not found. Either save the Cloud Console JSON as {}, \
             or add to {}:\n  \
             [google]\n  \
             client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
             client_secret = \"YOUR_SECRET\"\n\n  \
             Or run: no-more-lateness auth google --credentials-file <path>",
            default_path.display(),
            ClientConfig::default_path().display()
        )))
    }
}
