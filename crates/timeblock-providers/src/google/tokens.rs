//! OAuth credential value and its persistence.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::store::SecretStore;

/// Seconds before `expires_at` at which an access token stops being used.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// The single store key holding the serialized [`Credential`].
const KEY_CREDENTIAL: &str = "google_credential";

/// A bearer credential and the refresh token that renews it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// The access token for API requests.
    pub access_token: String,

    /// The refresh token for obtaining new access tokens.
    pub refresh_token: Option<String>,

    /// The absolute instant at which the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential from a token endpoint answer received at `now`.
    pub fn issued(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        let lifetime = expires_in_secs.unwrap_or(DEFAULT_EXPIRES_IN_SECS).max(0);
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: now + Duration::seconds(lifetime),
        }
    }

    /// True when the access token is present and more than
    /// [`EXPIRY_MARGIN_SECS`] away from expiry at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }

    /// Returns the time left before expiry, ignoring the safety margin.
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

// Tokens stay out of logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Loads and saves the current [`Credential`] through a [`SecretStore`].
///
/// The credential is one JSON value under one key, so every save replaces
/// token, refresh token and expiry together. An unreadable value loads as
/// absent.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn SecretStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Returns the stored credential, if a readable one exists.
    pub fn load(&self) -> ProviderResult<Option<Credential>> {
        let Some(raw) = self.store.get(KEY_CREDENTIAL)? else {
            debug!("no stored credential");
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!("stored credential is unreadable ({}), ignoring it", e);
                Ok(None)
            }
        }
    }

    /// Replaces the stored credential in a single write.
    pub fn save(&self, credential: &Credential) -> ProviderResult<()> {
        let raw = serde_json::to_string(credential).map_err(|e| {
            ProviderError::internal(format!("failed to serialize credential: {}", e))
        })?;
        self.store.set(KEY_CREDENTIAL, &raw)?;
        debug!(expires_at = %credential.expires_at, "saved credential");
        Ok(())
    }

    /// Deletes any stored credential.
    pub fn clear(&self) -> ProviderResult<()> {
        self.store.remove(KEY_CREDENTIAL)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileSecretStore, MemorySecretStore};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn credential(expires_in: i64) -> Credential {
        Credential::issued("access", Some("refresh".to_string()), Some(expires_in), now())
    }

    #[test]
    fn validity_respects_margin() {
        assert!(!credential(30).is_valid_at(now()));
        assert!(credential(90).is_valid_at(now()));
        assert!(!credential(60).is_valid_at(now()));
        assert!(!credential(-10).is_valid_at(now()));
    }

    #[test]
    fn empty_token_is_never_valid() {
        let mut c = credential(3600);
        c.access_token.clear();
        assert!(!c.is_valid_at(now()));
    }

    #[test]
    fn default_lifetime_is_one_hour() {
        let c = Credential::issued("access", None, None, now());
        assert_eq!(c.expires_at, now() + Duration::seconds(3600));
        assert_eq!(c.time_until_expiry(now()), Duration::hours(1));
    }

    #[test]
    fn debug_redacts_tokens() {
        let rendered = format!("{:?}", credential(3600));
        assert!(!rendered.contains("access\""));
        assert!(!rendered.contains("refresh\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn store_round_trip() {
        let store = CredentialStore::new(Arc::new(MemorySecretStore::new()));
        assert!(store.load().unwrap().is_none());

        let c = credential(3600);
        store.save(&c).unwrap();
        assert_eq!(store.load().unwrap(), Some(c));
    }

    #[test]
    fn saving_without_refresh_token_drops_old_one() {
        let store = CredentialStore::new(Arc::new(MemorySecretStore::new()));
        store.save(&credential(3600)).unwrap();

        let replacement = Credential::issued("other", None, Some(3600), now());
        store.save(&replacement).unwrap();
        assert_eq!(store.load().unwrap().unwrap().refresh_token, None);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::new(Arc::new(FileSecretStore::new(&path)));

        store.save(&credential(3600)).unwrap();
        assert!(path.exists());
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_credential_loads_as_absent() {
        let secrets = Arc::new(MemorySecretStore::new());
        secrets.set(KEY_CREDENTIAL, r#"{"access_token":"access"}"#).unwrap();
        let store = CredentialStore::new(secrets.clone());
        assert!(store.load().unwrap().is_none());

        secrets.set(KEY_CREDENTIAL, "not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    /// Counts writes so a save can be checked to touch the store once.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySecretStore,
        writes: std::sync::atomic::AtomicUsize,
    }

    impl SecretStore for CountingStore {
        fn get(&self, key: &str) -> ProviderResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> ProviderResult<()> {
            self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> ProviderResult<()> {
            self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.remove(key)
        }
    }

    #[test]
    fn save_replaces_the_credential_in_one_write() {
        let secrets = Arc::new(CountingStore::default());
        let store = CredentialStore::new(secrets.clone());

        store.save(&credential(3600)).unwrap();
        let replacement = Credential::issued("other", None, Some(120), now());
        store.save(&replacement).unwrap();

        assert_eq!(secrets.writes.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert_eq!(store.load().unwrap(), Some(replacement));
    }
}
