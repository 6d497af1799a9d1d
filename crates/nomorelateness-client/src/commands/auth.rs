//! Authentication commands.

use std::path::{Path, PathBuf};

use nomorelateness_providers::CalendarProvider;
use nomorelateness_providers::google::{GoogleConfig, GoogleProvider, OAuthCredentials};
use tracing::{info, warn};

use crate::config::{ClientConfig, GoogleSettings};
use crate::error::{ClientError, ClientResult};

/// Credentials given on the command line.
#[derive(Debug, Clone, Default)]
pub struct GoogleAuthArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub force: bool,
}

/// Runs the Google OAuth flow.
///
/// Credentials passed on the command line are written to the `[google]`
/// section of `config_path` so later runs find them.
pub async fn google(
    args: GoogleAuthArgs,
    config: &ClientConfig,
    config_path: &Path,
) -> ClientResult<()> {
    let settings = config.google_settings();
    let (credentials, source) = resolve_google_credentials(&args, &settings)?;
    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;

    let mut google_config =
        GoogleConfig::new(credentials).with_calendar_ids(settings.calendar_ids.clone());
    if let Some(ref path) = settings.token_path {
        google_config = google_config.with_token_path(path);
    }
    let provider = GoogleProvider::new(google_config)?;

    if provider.is_authenticated() && !provider.needs_reauth() && !args.force {
        persist(config_path, &source);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authentication...");
    println!();
    println!("A browser window will open for you to authorize read-only calendar access.");
    println!("If the browser doesn't open, copy the URL printed below.");
    println!();

    provider.authenticate().await?;
    persist(config_path, &source);

    info!("Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Run 'no-more-lateness view' to see your upcoming meetings.");
    Ok(())
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CredentialSource {
    /// `--client-id` and `--client-secret`.
    Flags { client_id: String, client_secret: String },
    /// `--credentials-file`.
    File(PathBuf),
    /// Already in `config.toml`, or the default credentials file.
    Config,
}

/// Writes command-line credentials to the config file; failures are only logged.
fn persist(config_path: &Path, source: &CredentialSource) {
    match save_credentials(config_path, source) {
        Ok(true) => println!("Credentials saved to {}", config_path.display()),
        Ok(false) => {}
        Err(e) => warn!(path = %config_path.display(), error = %e, "could not save credentials"),
    }
}

/// Records the credential source under `[google]`, keeping the rest of the file.
///
/// Returns whether anything was written.
fn save_credentials(config_path: &Path, source: &CredentialSource) -> ClientResult<bool> {
    if *source == CredentialSource::Config {
        return Ok(false);
    }

    let content = if config_path.exists() {
        std::fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let mut doc = content.parse::<toml_edit::DocumentMut>().map_err(|e| {
        ClientError::Config(format!("could not parse {}: {}", config_path.display(), e))
    })?;

    if !doc.contains_key("google") {
        doc["google"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    let google = doc["google"].as_table_mut().ok_or_else(|| {
        ClientError::Config(format!("`google` in {} is not a table", config_path.display()))
    })?;

    match source {
        CredentialSource::Flags {
            client_id,
            client_secret,
        } => {
            google["client_id"] = toml_edit::value(client_id.as_str());
            google["client_secret"] = toml_edit::value(client_secret.as_str());
            google.remove("credentials_file");
        }
        CredentialSource::File(path) => {
            google["credentials_file"] = toml_edit::value(path.display().to_string());
            google.remove("client_id");
            google.remove("client_secret");
        }
        CredentialSource::Config => {}
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;

    info!(path = %config_path.display(), "saved Google credentials");
    Ok(true)
}

/// Resolves Google credentials.
///
/// Priority (highest to lowest):
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file`
/// 3. the `[google]` section, then the default credentials file
fn resolve_google_credentials(
    args: &GoogleAuthArgs,
    settings: &GoogleSettings,
) -> ClientResult<(OAuthCredentials, CredentialSource)> {
    if let (Some(id), Some(secret)) = (&args.client_id, &args.client_secret) {
        let source = CredentialSource::Flags {
            client_id: id.clone(),
            client_secret: secret.clone(),
        };
        return Ok((OAuthCredentials::new(id, secret), source));
    }

    if args.client_id.is_some() || args.client_secret.is_some() {
        return Err(ClientError::Config(
            "both --client-id and --client-secret are required when providing credentials directly"
                .to_string(),
        ));
    }

    if let Some(ref path) = args.credentials_file {
        let credentials = OAuthCredentials::from_file(path)?;
        return Ok((credentials, CredentialSource::File(path.clone())));
    }

    Ok((settings.resolve_credentials()?, CredentialSource::Config))
}
