//! Credential lifecycle: validity, refresh, and interactive authorization.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authorizer::InteractiveAuthorizer;
use crate::error::{ProviderError, ProviderResult};
use crate::gateway::{AccessTokenSource, BoxFuture};

use super::config::{GoogleConfig, OAuthCredentials};
use super::oauth::{OAuthClient, PkceChallenge};
use super::tokens::{Credential, CredentialStore};

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Owns the stored [`Credential`] and keeps it usable.
///
/// Token acquisition is serialized within a process so concurrent callers
/// never run two consent flows at once.
pub struct CredentialManager {
    config: GoogleConfig,
    client_id: Option<String>,
    client_secret: Option<String>,
    store: CredentialStore,
    authorizer: Arc<dyn InteractiveAuthorizer>,
    now: Clock,
    acquire: Mutex<()>,
    /// Whether built-in and environment client values may fill gaps.
    fallbacks: bool,
}

impl CredentialManager {
    pub fn new(
        config: GoogleConfig,
        store: CredentialStore,
        authorizer: Arc<dyn InteractiveAuthorizer>,
    ) -> Self {
        Self {
            config,
            client_id: None,
            client_secret: None,
            store,
            authorizer,
            now: Arc::new(Utc::now),
            acquire: Mutex::new(()),
            fallbacks: true,
        }
    }

    /// Sets the user-configured client id and secret. Either may be absent,
    /// in which case built-in defaults apply.
    pub fn with_client(mut self, client_id: Option<String>, client_secret: Option<String>) -> Self {
        self.client_id = client_id;
        self.client_secret = client_secret;
        self
    }

    /// Replaces the clock, for tests.
    pub fn with_clock<F>(mut self, now: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.now = Arc::new(now);
        self
    }

    /// True when a stored access token is usable right now.
    ///
    /// Reads the store only; an unreadable store counts as not authenticated.
    pub fn is_authenticated(&self) -> bool {
        match self.store.load() {
            Ok(Some(credential)) => credential.is_valid_at((self.now)()),
            Ok(None) => false,
            Err(e) => {
                warn!("cannot read stored credential: {}", e);
                false
            }
        }
    }

    /// The stored credential, valid or not.
    pub fn stored_credential(&self) -> ProviderResult<Option<Credential>> {
        self.store.load()
    }

    /// Returns a valid access token, refreshing or re-authorizing as needed.
    pub async fn get_access_token(&self) -> ProviderResult<String> {
        let _guard = self.acquire.lock().await;

        let stored = self.store.load()?;
        if let Some(credential) = &stored
            && credential.is_valid_at((self.now)())
        {
            debug!("using stored access token");
            return Ok(credential.access_token.clone());
        }

        if let Some(credential) = stored.filter(|c| c.refresh_token.is_some()) {
            match self.refresh(&credential).await {
                Ok(refreshed) => return Ok(refreshed.access_token),
                Err(e) => warn!("refresh unavailable, falling back to consent: {}", e),
            }
        }

        Ok(self.run_interactive().await?.access_token)
    }

    /// Runs the interactive flow regardless of stored state.
    ///
    /// The stored credential is replaced only when the flow succeeds.
    pub async fn start_auth_flow(&self) -> ProviderResult<Credential> {
        let _guard = self.acquire.lock().await;
        self.run_interactive().await
    }

    /// Deletes any stored credential.
    pub fn clear_credential(&self) -> ProviderResult<()> {
        self.store.clear()?;
        info!("cleared stored credential");
        Ok(())
    }

    /// Resolves only the configured client values.
    #[cfg(test)]
    fn without_fallbacks(mut self) -> Self {
        self.fallbacks = false;
        self
    }

    fn oauth_client(&self) -> ProviderResult<OAuthClient> {
        let (id, secret) = (self.client_id.as_deref(), self.client_secret.as_deref());
        let credentials = if self.fallbacks {
            OAuthCredentials::resolve(id, secret)?
        } else {
            OAuthCredentials::resolve_from([id, None, None], [secret, None])?
        };
        OAuthClient::new(credentials, &self.config)
    }

    async fn refresh(&self, current: &Credential) -> ProviderResult<Credential> {
        let refresh_token = current.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::token_refresh("no refresh token stored, consent required")
        })?;

        debug!("refreshing expired access token");
        let grant = self.oauth_client()?.refresh(refresh_token).await?;

        let credential = Credential::issued(
            grant.access_token,
            grant.refresh_token.or_else(|| current.refresh_token.clone()),
            grant.expires_in,
            (self.now)(),
        );
        self.store.save(&credential)?;
        Ok(credential)
    }

    async fn run_interactive(&self) -> ProviderResult<Credential> {
        let oauth = self.oauth_client()?;
        let pkce = PkceChallenge::create();
        let redirect_uri = self.authorizer.redirect_uri();
        let auth_url = pkce.build_auth_url(
            &self.config.endpoints.auth_url,
            &oauth.credentials().client_id,
            &redirect_uri,
            &self.config.scopes,
        )?;

        info!("starting OAuth consent flow");
        debug!("authorization URL: {}", auth_url);

        let redirect = self.authorizer.launch_interactive(&auth_url).await?;
        let code = authorization_code(&redirect, &pkce.state)?;

        info!("received authorization code, exchanging for tokens");
        let grant = oauth
            .exchange_code(&code, &pkce.verifier, &redirect_uri)
            .await?;

        let credential = Credential::issued(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            (self.now)(),
        );
        self.store.save(&credential)?;
        info!("authorization complete");
        Ok(credential)
    }
}

impl AccessTokenSource for CredentialManager {
    fn access_token(&self) -> BoxFuture<'_, ProviderResult<String>> {
        Box::pin(self.get_access_token())
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("config", &self.config)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

/// Pulls the authorization code out of a redirect URL.
fn authorization_code(redirect: &str, expected_state: &str) -> ProviderResult<String> {
    let url = url::Url::parse(redirect).map_err(|e| {
        ProviderError::authorization(format!("unreadable redirect {}: {}", redirect, e))
    })?;

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(ProviderError::authorization(format!(
            "authorization cancelled: {}",
            error
        )));
    }
    if state.as_deref() != Some(expected_state) {
        return Err(ProviderError::authorization(
            "OAuth state mismatch in redirect",
        ));
    }
    code.filter(|c| !c.is_empty())
        .ok_or_else(|| ProviderError::authorization("missing authorization code in redirect"))
}
