//! no-more-lateness CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use nomorelateness_core::tracing::{TracingConfig, init_tracing};

use nomorelateness_client::cli::{AuthProvider, Cli, Command, ConfigAction};
use nomorelateness_client::commands::{self, view::ViewArgs};
use nomorelateness_client::config::ClientConfig;
use nomorelateness_client::error::ClientResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ClientResult<()> {
    let (config, config_path) = match cli.config {
        Some(ref path) => (ClientConfig::load_from(path)?, path.clone()),
        None => (ClientConfig::load()?, ClientConfig::default_path()),
    };

    match cli.command_or_default() {
        Command::View {
            attendee_address,
            limit,
        } => {
            let provider = commands::provider_from_config(&config)?;
            let args = ViewArgs {
                attendee_address,
                limit,
            };
            commands::view::run(provider.as_ref(), &config, &args).await
        }
        Command::Join { dry_run } => {
            let provider = commands::provider_from_config(&config)?;
            commands::join::run(provider.as_ref(), &config, dry_run).await
        }
        Command::Auth { provider } => match provider {
            #[cfg(feature = "google")]
            AuthProvider::Google {
                client_id,
                client_secret,
                credentials_file,
                force,
            } => {
                let args = commands::auth::GoogleAuthArgs {
                    client_id,
                    client_secret,
                    credentials_file,
                    force,
                };
                commands::auth::google(args, &config, &config_path).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
