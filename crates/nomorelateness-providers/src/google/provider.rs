//! [`CalendarProvider`] implementation for Google Calendar.

use nomorelateness_core::CalendarEvent;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, FetchOptions};

use super::client::{EventQuery, GoogleCalendarClient};
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const PROVIDER_NAME: &str = "google";

/// Google Calendar provider.
///
/// Tokens are loaded from the configured token file when the provider is
/// created; expired access tokens are refreshed on the next fetch.
pub struct GoogleProvider {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: RwLock<Option<GoogleCalendarClient>>,
}

impl GoogleProvider {
    /// Creates a provider, loading any stored tokens.
    ///
    /// Does not start the consent flow; see [`GoogleProvider::authenticate`].
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let token_storage = TokenStorage::new(&config.token_path);
        token_storage.load()?;

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: RwLock::new(None),
        })
    }

    /// Runs the OAuth consent flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.token_storage.set(tokens.clone())?;

        *self.api_client.write().await = Some(self.new_client(&tokens.access_token)?);

        info!(path = %self.token_storage.path().display(), "authentication successful");
        Ok(())
    }

    /// Returns true if stored tokens are missing or lack the configured scopes.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    fn new_client(&self, access_token: &str) -> ProviderResult<GoogleCalendarClient> {
        GoogleCalendarClient::new(access_token, self.config.timeout, &self.config.user_agent)
    }

    /// Makes sure an API client with a non-expired access token exists.
    async fn ensure_authenticated(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authenticated, run 'no-more-lateness auth google'")
        })?;

        let access_token = if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
                ProviderError::authentication("no refresh token, re-authentication required")
            })?;

            debug!("refreshing expired access token");
            let (access_token, expires_in) = self.oauth_client.refresh_token(refresh_token).await?;
            self.token_storage
                .update_access_token(&access_token, expires_in)?;
            Some(access_token)
        } else {
            None
        };

        let mut client = self.api_client.write().await;
        match client.as_mut() {
            Some(c) => {
                if let Some(token) = access_token {
                    c.set_access_token(token);
                }
            }
            None => {
                let token = access_token.unwrap_or(tokens.access_token);
                *client = Some(self.new_client(&token)?);
            }
        }
        Ok(())
    }

    /// Fetches from every calendar and merges the results by start time.
    async fn fetch(&self, options: FetchOptions) -> ProviderResult<Vec<CalendarEvent>> {
        self.ensure_authenticated().await?;

        let calendar_ids = options
            .calendar_ids
            .clone()
            .unwrap_or_else(|| self.config.calendar_ids.clone());
        let query = EventQuery {
            time_min: options.time_min,
            time_max: options.time_max,
            max_results: options.max_results,
        };

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;

        let mut events = Vec::new();
        for calendar_id in &calendar_ids {
            events.extend(client.list_events(calendar_id, query).await?);
        }

        if calendar_ids.len() > 1 {
            events.sort_by_key(|e| e.start.and_then(|t| t.as_datetime()));
            if let Some(max) = options.max_results {
                events.truncate(max);
            }
        }

        debug!(count = events.len(), calendars = calendar_ids.len(), "fetch complete");
        Ok(events)
    }
}

impl CalendarProvider for GoogleProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch_events(&self, options: FetchOptions) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            self.fetch(options)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn refresh_auth(&self) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(async move { self.ensure_authenticated().await })
    }

    fn is_authenticated(&self) -> bool {
        self.token_storage
            .get()
            .is_some_and(|tokens| !tokens.is_expired() || tokens.refresh_token.is_some())
    }
}
