//! Authentication commands.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use timeblock_providers::google::OAuthCredentials;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Client id and secret given on the command line.
#[derive(Debug, Default)]
pub struct ConnectArgs {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub no_browser: bool,
    pub force: bool,
}

/// Runs the Google consent flow and stores the resulting credential.
///
/// Client values given on the command line (directly or through
/// `--credentials-file`) are persisted to `config_path` so later runs find
/// them.
pub async fn connect(args: ConnectArgs, config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    let explicit = explicit_client(
        args.client_id,
        args.client_secret,
        args.credentials_file.as_deref(),
    )?;

    let manager = super::credential_manager(config, explicit.clone(), !args.no_browser)?;

    if manager.is_authenticated() && !args.force {
        persist(explicit.as_ref(), config_path);
        println!("Already authenticated with Google Calendar.");
        println!("Use --force to re-authenticate.");
        return Ok(());
    }

    println!("Starting Google Calendar authorization...");
    println!();
    println!("A browser window will open for you to grant access.");
    println!("If it doesn't, copy the URL printed below into a browser.");
    println!();

    manager.start_auth_flow().await?;
    persist(explicit.as_ref(), config_path);

    info!("Google authorization successful");
    println!();
    println!("Authorization successful!");
    println!("Credentials stored in {}", config.google.token_path().display());
    Ok(())
}

/// What `auth status` reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub has_refresh_token: bool,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub store: PathBuf,
}

/// Reports the stored credential without touching the network.
pub fn status(config: &ClientConfig, json: bool) -> ClientResult<()> {
    let manager = super::credential_manager(config, None, false)?;
    let stored = manager.stored_credential()?;
    let report = AuthStatus {
        authenticated: manager.is_authenticated(),
        has_refresh_token: stored.as_ref().is_some_and(|c| c.refresh_token.is_some()),
        expires_at: stored.as_ref().map(|c| c.expires_at),
        store: config.google.token_path(),
    };

    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    match stored {
        None => println!("Not authenticated. Run `timeblock auth connect`."),
        Some(credential) => {
            let remaining = credential.time_until_expiry(Utc::now());
            if report.authenticated {
                println!(
                    "Authenticated; access token valid for {} more minute(s).",
                    remaining.num_minutes()
                );
            } else if report.has_refresh_token {
                println!("Access token expired; it will be refreshed on the next run.");
            } else {
                println!("Access token expired; run `timeblock auth connect` again.");
            }
        }
    }
    println!("Store: {}", report.store.display());
    Ok(())
}

/// Removes the stored credential.
pub fn logout(config: &ClientConfig) -> ClientResult<()> {
    let manager = super::credential_manager(config, None, false)?;
    manager.clear_credential()?;
    println!("Stored Google credential removed.");
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> ClientResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Config(format!("failed to serialize output: {}", e)))
}

/// Resolves a client id and secret supplied on the command line.
///
/// Priority:
/// 1. `--client-id` + `--client-secret`
/// 2. `--credentials-file` (Google Cloud Console JSON)
///
/// `None` means the configured or built-in values apply.
fn explicit_client(
    client_id: Option<String>,
    client_secret: Option<String>,
    credentials_file: Option<&Path>,
) -> ClientResult<Option<(String, String)>> {
    let credentials = match (client_id, client_secret, credentials_file) {
        (Some(id), Some(secret), _) => OAuthCredentials::new(id, secret),
        (Some(_), None, _) | (None, Some(_), _) => {
            return Err(ClientError::Config(
                "both --client-id and --client-secret are required when providing credentials directly"
                    .to_string(),
            ));
        }
        (None, None, Some(path)) => OAuthCredentials::from_file(path)?,
        (None, None, None) => return Ok(None),
    };

    credentials
        .validate()
        .map_err(|e| ClientError::Config(format!("invalid Google credentials: {}", e)))?;
    Ok(Some((credentials.client_id, credentials.client_secret)))
}

fn persist(client: Option<&(String, String)>, config_path: &Path) {
    let Some((id, secret)) = client else {
        return;
    };
    match save_client_to_config(config_path, id, secret) {
        Ok(()) => println!("Client credentials saved to {}", config_path.display()),
        Err(e) => warn!("could not save client credentials: {}", e),
    }
}

/// Writes `client_id`/`client_secret` under `[google]`, keeping the rest of
/// the file intact.
fn save_client_to_config(config_path: &Path, client_id: &str, client_secret: &str) -> ClientResult<()> {
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
        ClientError::Config(format!("[google] in {} is not a table", config_path.display()))
    })?;
    google["client_id"] = toml_edit::value(client_id);
    google["client_secret"] = toml_edit::value(client_secret);

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, doc.to_string())?;
    info!("client credentials saved to {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_client_from_flags() {
        let client = explicit_client(
            Some("cli-id.apps.googleusercontent.com".to_string()),
            Some("cli-secret".to_string()),
            None,
        )
        .unwrap();
        assert_eq!(
            client,
            Some((
                "cli-id.apps.googleusercontent.com".to_string(),
                "cli-secret".to_string()
            ))
        );
    }

    #[test]
    fn no_flags_defers_to_config() {
        assert_eq!(explicit_client(None, None, None).unwrap(), None);
    }

    #[test]
    fn partial_flags_fail() {
        let err = explicit_client(Some("id.apps.googleusercontent.com".to_string()), None, None)
            .unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
        assert!(explicit_client(None, Some("secret".to_string()), None).is_err());
    }

    #[test]
    fn malformed_client_id_is_rejected() {
        let err = explicit_client(Some("not-google".to_string()), Some("s".to_string()), None)
            .unwrap_err();
        assert!(err.to_string().contains(".apps.googleusercontent.com"));
    }

    #[test]
    fn explicit_client_from_credentials_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("creds.json");
        std::fs::write(
            &path,
            r#"{
                "installed": {
                    "client_id": "file-id.apps.googleusercontent.com",
                    "client_secret": "file-secret"
                }
            }"#,
        )
        .unwrap();

        let client = explicit_client(None, None, Some(&path)).unwrap().unwrap();
        assert_eq!(client.0, "file-id.apps.googleusercontent.com");
        assert_eq!(client.1, "file-secret");
    }

    #[test]
    fn save_preserves_existing_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "# my settings\n[schedule]\ntimezone = \"Europe/Madrid\"\n",
        )
        .unwrap();

        save_client_to_config(&path, "test.apps.googleusercontent.com", "test-secret").unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# my settings"));
        let reloaded = ClientConfig::parse(&written).unwrap();
        assert_eq!(
            reloaded.google.client_id.as_deref(),
            Some("test.apps.googleusercontent.com")
        );
        assert_eq!(reloaded.google.client_secret.as_deref(), Some("test-secret"));
        assert_eq!(reloaded.schedule.timezone, "Europe/Madrid");
    }

    #[test]
    fn save_creates_missing_file_and_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        save_client_to_config(&path, "new.apps.googleusercontent.com", "s").unwrap();

        let reloaded = ClientConfig::load_from(&path).unwrap();
        assert_eq!(
            reloaded.google.client_id.as_deref(),
            Some("new.apps.googleusercontent.com")
        );
    }

    #[test]
    fn status_and_logout_on_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::default();
        config.google.token_path = Some(tmp.path().join("credentials.json"));

        status(&config, true).unwrap();
        logout(&config).unwrap();
        assert!(!tmp.path().join("credentials.json").exists());
    }
}
