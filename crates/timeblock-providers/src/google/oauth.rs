//! OAuth 2.0 authorization-code flow with PKCE.
//!
//! [`PkceChallenge`] holds the per-attempt secrets (verifier, challenge and
//! state) and builds the consent URL. [`OAuthClient`] talks to the token
//! endpoint for the two grants we use: `authorization_code` and
//! `refresh_token`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::client::send_error;
use super::config::{GoogleConfig, OAuthCredentials};

/// Length of the generated code verifier, in characters.
pub const CODE_VERIFIER_LENGTH: usize = 64;

/// Characters allowed in a code verifier (RFC 7636 "unreserved").
const VERIFIER_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Per-attempt PKCE material.
///
/// Lives only for the duration of one interactive authorization and is
/// never persisted.
pub struct PkceChallenge {
    /// The code verifier, sent only to the token endpoint.
    pub verifier: String,
    /// SHA-256 of the verifier, base64url without padding.
    pub challenge: String,
    /// Random value echoed back on the redirect.
    pub state: String,
}

impl PkceChallenge {
    /// Creates a fresh challenge with random verifier and state.
    pub fn create() -> Self {
        let verifier = random_string(CODE_VERIFIER_LENGTH);
        let challenge = Self::compute_challenge(&verifier);
        let state = random_string(32);

        Self {
            verifier,
            challenge,
            state,
        }
    }

    /// Computes the S256 challenge for a code verifier.
    pub fn compute_challenge(verifier: &str) -> String {
        let digest = Sha256::digest(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(digest)
    }

    /// Builds the consent page URL for this attempt.
    pub fn build_auth_url(
        &self,
        auth_url: &str,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<String> {
        let mut url = url::Url::parse(auth_url).map_err(|e| {
            ProviderError::configuration(format!("invalid authorization URL {}: {}", auth_url, e))
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("code_challenge", &self.challenge)
            .append_pair("code_challenge_method", "S256")
            .append_pair("state", &self.state);

        Ok(url.into())
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("challenge", &self.challenge)
            .finish_non_exhaustive()
    }
}

fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(VERIFIER_ALPHABET[rng.random_range(0..VERIFIER_ALPHABET.len())]))
        .collect()
}

/// A successful answer from the token endpoint.
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Which grant a token request carries; selects the error code on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn failure(self, message: String) -> ProviderError {
        match self {
            Grant::AuthorizationCode => ProviderError::token_exchange(message),
            Grant::RefreshToken => ProviderError::token_refresh(message),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Grant::AuthorizationCode => "token exchange",
            Grant::RefreshToken => "token refresh",
        }
    }
}

/// Client for Google's OAuth token endpoint.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    token_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    /// Creates a token endpoint client for the given configuration.
    pub fn new(credentials: OAuthCredentials, config: &GoogleConfig) -> ProviderResult<Self> {
        Ok(Self {
            credentials,
            token_url: config.endpoints.token_url.clone(),
            http_client: config.http_client()?,
        })
    }

    /// The client credentials this client authenticates with.
    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    /// Exchanges an authorization code (and its PKCE verifier) for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
    ) -> ProviderResult<TokenGrant> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];

        let grant = self.post_form(Grant::AuthorizationCode, &params).await?;
        info!("successfully obtained tokens");
        Ok(grant)
    }

    /// Obtains a new access token from a refresh token.
    pub async fn refresh(&self, refresh_token: &str) -> ProviderResult<TokenGrant> {
        let params = [
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let grant = self.post_form(Grant::RefreshToken, &params).await?;
        info!("successfully refreshed access token");
        Ok(grant)
    }

    async fn post_form(&self, grant: Grant, params: &[(&str, &str)]) -> ProviderResult<TokenGrant> {
        debug!("{} request to {}", grant.label(), self.token_url);

        let response = self
            .http_client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(grant.failure(format!("{} failed ({}): {}", grant.label(), status, body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
        })
    }
}
