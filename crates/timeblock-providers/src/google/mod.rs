//! Google Calendar backend.
//!
//! - [`CredentialManager`] keeps an OAuth credential usable: it checks the
//!   stored token, refreshes it, and falls back to the PKCE consent flow
//! - [`GoogleCalendarClient`] implements [`CalendarGateway`](crate::CalendarGateway)
//!   on top of the Calendar v3 API
//!
//! # Authentication Flow
//!
//! 1. Resolve the OAuth client id and secret (configured, built in, or from
//!    the environment)
//! 2. Generate a PKCE verifier, its S256 challenge, and a random state
//! 3. Hand the consent URL to an [`InteractiveAuthorizer`](crate::InteractiveAuthorizer)
//! 4. Read the authorization code from the redirect it returns
//! 5. Exchange the code and verifier for tokens and persist them
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use timeblock_providers::google::{CredentialManager, CredentialStore, GoogleConfig};
//! use timeblock_providers::{FileSecretStore, LoopbackAuthorizer};
//!
//! let store = CredentialStore::new(Arc::new(FileSecretStore::new(FileSecretStore::default_path())));
//! let manager = CredentialManager::new(GoogleConfig::new(), store, Arc::new(LoopbackAuthorizer::default()));
//! let token = manager.get_access_token().await?;
//! ```

mod client;
mod config;
mod credentials;
mod oauth;
mod tokens;

pub use client::GoogleCalendarClient;
pub use config::{
    BUILTIN_CLIENT_ID, BUILTIN_CLIENT_SECRET, GoogleConfig, GoogleEndpoints, OAuthCredentials,
    PLATFORM_CLIENT_ID_VAR,
};
pub use credentials::CredentialManager;
pub use oauth::{CODE_VERIFIER_LENGTH, OAuthClient, PkceChallenge, TokenGrant};
pub use tokens::{Credential, CredentialStore, EXPIRY_MARGIN_SECS};
