//! Configuration commands.

use std::path::Path;

use timeblock_providers::google::OAuthCredentials;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout, with secrets masked.
pub fn dump(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("# config.toml ({})", config_path.display());
    println!("{}", render(config)?);
    Ok(())
}

fn render(config: &ClientConfig) -> ClientResult<String> {
    let mut shown = config.clone();
    if let Some(secret) = shown.google.client_secret.as_mut()
        && !secret.starts_with("env::")
        && !secret.starts_with("pass::")
    {
        *secret = "********".to_string();
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;

    let (client_id, client_secret) = config.google.client()?;
    match OAuthCredentials::resolve(client_id.as_deref(), client_secret.as_deref()) {
        Ok(credentials) => {
            credentials.validate().map_err(|e| {
                ClientError::Config(format!("invalid Google credentials: {}", e))
            })?;
            println!("Google client credentials are valid.");
        }
        Err(e) => println!("warning: {}", e.message()),
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and credential store paths.
pub fn path(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    println!("credentials: {}", config.google.token_path().display());
    Ok(())
}
