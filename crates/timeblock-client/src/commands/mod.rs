//! Subcommand implementations.

pub mod auth;
pub mod config;
pub mod schedule;

use std::sync::Arc;

use timeblock_providers::google::{CredentialManager, CredentialStore};
use timeblock_providers::{FileSecretStore, LoopbackAuthorizer};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Builds the credential manager described by `config`.
///
/// `client` overrides the configured client id and secret when present.
pub fn credential_manager(
    config: &ClientConfig,
    client: Option<(String, String)>,
    open_browser: bool,
) -> ClientResult<CredentialManager> {
    let (client_id, client_secret) = match client {
        Some((id, secret)) => (Some(id), Some(secret)),
        None => config.google.client()?,
    };

    let store = CredentialStore::new(Arc::new(FileSecretStore::new(config.google.token_path())));
    let authorizer =
        LoopbackAuthorizer::new(config.google.loopback_port).with_browser(open_browser);

    Ok(CredentialManager::new(
        config.google.to_provider_config(),
        store,
        Arc::new(authorizer),
    )
    .with_client(client_id, client_secret))
}
