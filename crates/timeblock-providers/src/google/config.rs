//! Google Calendar provider configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ProviderError, ProviderResult};

/// Google's OAuth consent page.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Client id compiled into the binary, if the build provided one.
pub const BUILTIN_CLIENT_ID: Option<&str> = option_env!("TIMEBLOCK_GOOGLE_CLIENT_ID");

/// Client secret compiled into the binary, if the build provided one.
pub const BUILTIN_CLIENT_SECRET: Option<&str> = option_env!("TIMEBLOCK_GOOGLE_CLIENT_SECRET");

/// Environment variable consulted last when resolving the client id.
pub const PLATFORM_CLIENT_ID_VAR: &str = "GOOGLE_CLIENT_ID";

/// The remote URLs the provider talks to.
///
/// Overridable so tests can point everything at a local mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleEndpoints {
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            api_base: CALENDAR_API_BASE.to_string(),
        }
    }
}

impl GoogleEndpoints {
    /// Puts every endpoint under one base URL, e.g. a mockito server.
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth_url: format!("{}/o/oauth2/v2/auth", base),
            token_url: format!("{}/token", base),
            api_base: format!("{}/calendar/v3", base),
        }
    }
}

/// OAuth 2.0 client credentials for Google API access.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredentials {
    /// The OAuth 2.0 client ID from Google Cloud Console.
    pub client_id: String,
    /// The OAuth 2.0 client secret from Google Cloud Console.
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Structure of Google's OAuth credentials JSON file.
///
/// Accepts both the console download (`installed` or `web` section) and a
/// flat `{client_id, client_secret}` object.
#[derive(Debug, Deserialize)]
struct GoogleCredentialsFile {
    installed: Option<NestedCredentials>,
    web: Option<NestedCredentials>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NestedCredentials {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    /// Creates new OAuth credentials.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Resolves the credentials from configured values, falling back to the
    /// values built into the binary and, for the id only, to the
    /// [`PLATFORM_CLIENT_ID_VAR`] environment variable.
    pub fn resolve(
        configured_id: Option<&str>,
        configured_secret: Option<&str>,
    ) -> ProviderResult<Self> {
        let platform_id = std::env::var(PLATFORM_CLIENT_ID_VAR).ok();
        Self::resolve_from(
            [configured_id, BUILTIN_CLIENT_ID, platform_id.as_deref()],
            [configured_secret, BUILTIN_CLIENT_SECRET],
        )
    }

    /// Picks the first non-blank value from each precedence list.
    pub fn resolve_from(
        id_candidates: [Option<&str>; 3],
        secret_candidates: [Option<&str>; 2],
    ) -> ProviderResult<Self> {
        let client_id = first_present(&id_candidates).ok_or_else(|| {
            ProviderError::configuration(
                "no Google client id configured; set google.client_id or run `timeblock auth connect --client-id ...`",
            )
        })?;
        let client_secret = first_present(&secret_candidates).ok_or_else(|| {
            ProviderError::configuration(
                "no Google client secret configured; set google.client_secret",
            )
        })?;
        Ok(Self::new(client_id, client_secret))
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
        })?;
        Self::from_json(&content)
    }

    /// Parses OAuth credentials from a Google credentials JSON string.
    pub fn from_json(json: &str) -> ProviderResult<Self> {
        let file: GoogleCredentialsFile = serde_json::from_str(json).map_err(|e| {
            ProviderError::configuration(format!("failed to parse credentials JSON: {}", e))
        })?;

        if let Some(creds) = file.installed.or(file.web) {
            return Ok(Self::new(creds.client_id, creds.client_secret));
        }

        if let (Some(client_id), Some(client_secret)) = (file.client_id, file.client_secret) {
            return Ok(Self::new(client_id, client_secret));
        }

        Err(ProviderError::configuration(
            "credentials file must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
        ))
    }

    /// Checks that the credentials look like Google desktop credentials.
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

fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Configuration for the Google Calendar provider.
///
/// Client credentials are not part of it: they are resolved only when a
/// token request actually needs them.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub endpoints: GoogleEndpoints,

    /// Request timeout.
    pub timeout: Duration,

    /// User agent string for API requests.
    pub user_agent: String,

    /// OAuth scopes to request.
    pub scopes: Vec<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Full calendar access: free/busy queries and event insertion.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration pointing at Google's production endpoints.
    pub fn new() -> Self {
        Self {
            endpoints: GoogleEndpoints::default(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            user_agent: format!("timeblock/{}", env!("CARGO_PKG_VERSION")),
            scopes: vec![Self::DEFAULT_SCOPE.to_string()],
        }
    }

    /// Sets the remote endpoints.
    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the HTTP client for this configuration.
    pub(crate) fn http_client(&self) -> ProviderResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })
    }
}
