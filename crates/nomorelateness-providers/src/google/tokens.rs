//! OAuth token persistence.
//!
//! The token file uses the same JSON shape as Go's `oauth2.Token`
//! (`access_token`, `token_type`, `refresh_token`, `expiry`), so a token
//! written by an earlier no-more-lateness install keeps working.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use super::config::GoogleConfig;
use crate::error::{ProviderError, ProviderResult};

/// Refresh this long before the advertised expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Already reduced by the refresh margin.
    #[serde(
        rename = "expiry",
        default,
        deserialize_with = "non_zero_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    /// Files without this field only ever held the read-only calendar scope.
    #[serde(default = "read_only_scope")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<DateTime<Utc>>,
}

fn bearer() -> String {
    "Bearer".to_string()
}

fn read_only_scope() -> Vec<String> {
    vec![GoogleConfig::DEFAULT_SCOPE.to_string()]
}

/// Go writes `0001-01-01T00:00:00Z` for a token that never expires.
fn non_zero_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let expiry = Option::<DateTime<Utc>>::deserialize(deserializer)?;
    Ok(expiry.filter(|at| at.year() > 1))
}

fn expiry_in(lifetime_secs: Option<i64>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    lifetime_secs.map(|secs| now + Duration::seconds(secs - EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    /// Builds a token set from a token endpoint response.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            access_token: access_token.into(),
            token_type: bearer(),
            refresh_token,
            expires_at: expiry_in(expires_in_secs, now),
            scopes,
            last_refresh: Some(now),
        }
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Swaps in a refreshed access token; the refresh token is kept.
    pub fn update_access_token(&mut self, access_token: impl Into<String>, expires_in_secs: Option<i64>) {
        let now = Utc::now();
        self.access_token = access_token.into();
        self.expires_at = expiry_in(expires_in_secs, now);
        self.last_refresh = Some(now);
    }
}

/// Writes `content` next to `path` and renames it into place, owner-only on unix.
fn write_private(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staging, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(&staging, path)
}

/// The token file plus an in-memory copy of its contents.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    fn file_error(&self, action: &str, e: impl std::fmt::Display) -> ProviderError {
        ProviderError::configuration(format!(
            "failed to {} token file {}: {}",
            action,
            self.path.display(),
            e
        ))
    }

    /// Reads the token file. `Ok(false)` means there is none yet.
    pub fn load(&self) -> ProviderResult<bool> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no token file");
                return Ok(false);
            }
            Err(e) => return Err(self.file_error("read", e)),
        };

        let tokens: TokenInfo =
            serde_json::from_str(&content).map_err(|e| self.file_error("parse", e))?;
        debug!(path = %self.path.display(), expired = tokens.is_expired(), "loaded tokens");
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    fn persist(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;
        write_private(&self.path, &content).map_err(|e| self.file_error("write", e))?;
        info!(path = %self.path.display(), "saved tokens");
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the tokens and writes them out.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.persist(&tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    /// Records a refreshed access token and writes the file.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let tokens = guard
            .as_mut()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.update_access_token(access_token, expires_in_secs);
        self.persist(tokens)
    }

    /// Forgets the tokens and deletes the file.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "cleared tokens");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.file_error("remove", e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when there are no tokens or they were granted fewer scopes.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        self.get()
            .is_none_or(|tokens| !tokens.has_scopes(required_scopes))
    }
}
