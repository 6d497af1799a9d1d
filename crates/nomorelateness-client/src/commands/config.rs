//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", config_path.display());
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &ClientConfig) -> ClientResult<String> {
    toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    check(config)?;

    #[cfg(feature = "google")]
    {
        config.google_settings().to_provider_config()?;
        println!("Google credentials are valid.");
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Checks that do not touch secrets or credential files.
fn check(config: &ClientConfig) -> ClientResult<()> {
    if config.fetch.max_results == 0 {
        return Err(ClientError::Config(
            "[fetch] max_results must be at least 1".to_string(),
        ));
    }
    if config.fetch.lookback_minutes < 0 {
        return Err(ClientError::Config(
            "[fetch] lookback_minutes must not be negative".to_string(),
        ));
    }
    if config.view.max_link_length == 0 {
        return Err(ClientError::Config(
            "[view] max_link_length must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Show the configuration file path.
pub fn path(config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_checks() {
        assert!(check(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn zero_limits_fail_checks() {
        let mut config = ClientConfig::default();
        config.fetch.max_results = 0;
        assert!(check(&config).unwrap_err().to_string().contains("max_results"));

        let mut config = ClientConfig::default();
        config.view.max_link_length = 0;
        assert!(check(&config).unwrap_err().to_string().contains("max_link_length"));

        let mut config = ClientConfig::default();
        config.fetch.lookback_minutes = -5;
        assert!(check(&config).is_err());
    }

    #[test]
    fn dump_default_config() {
        insta::assert_snapshot!(render(&ClientConfig::default()).unwrap(), @r"
        [view]
        max_link_length = 80

        [fetch]
        max_results = 5
        lookback_minutes = 60
        ");
    }
}
