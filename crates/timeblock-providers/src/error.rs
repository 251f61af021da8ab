//! Error types for calendar provider operations.
//!
//! Every failure leaving this crate is a [`ProviderError`] tagged with a
//! [`ProviderErrorCode`].

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
///
/// Callers match on this to tell recoverable failures (a refresh that can
/// fall back to interactive consent) from fatal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Missing or invalid configuration: client id, client secret, endpoints.
    ConfigurationError,
    /// Interactive consent was cancelled, denied, or produced no usable code.
    AuthorizationFailed,
    /// The token endpoint rejected an authorization-code exchange.
    TokenExchangeFailed,
    /// The token endpoint rejected a refresh-token grant.
    TokenRefreshFailed,
    /// The free/busy query returned a non-success status.
    AvailabilityQueryFailed,
    /// The event insert returned a non-success status.
    EventCreationFailed,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Credential persistence failed.
    StorageError,
    /// Internal provider error - unexpected state, bug.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns a machine-readable name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configuration_error",
            Self::AuthorizationFailed => "authorization_failed",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::TokenRefreshFailed => "token_refresh_failed",
            Self::AvailabilityQueryFailed => "availability_query_failed",
            Self::EventCreationFailed => "event_creation_failed",
            Self::NetworkError => "network_error",
            Self::InvalidResponse => "invalid_response",
            Self::StorageError => "storage_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by credential handling or a calendar call.
#[derive(Debug, Error)]
pub struct ProviderError {
    /// The error code categorizing this error.
    code: ProviderErrorCode,
    /// A human-readable message describing the error.
    message: String,
    /// The provider that generated this error (e.g., "google").
    provider: Option<String>,
    /// The underlying cause of this error, if any.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProviderError {
    /// Creates a new provider error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            source: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthorizationFailed, message)
    }

    /// Creates a token exchange error.
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenExchangeFailed, message)
    }

    /// Creates a token refresh error.
    pub fn token_refresh(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::TokenRefreshFailed, message)
    }

    /// Creates an availability query error.
    pub fn availability_query(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AvailabilityQueryFailed, message)
    }

    /// Creates an event creation error.
    pub fn event_creation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::EventCreationFailed, message)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    /// Creates a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::StorageError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Sets the provider name for this error.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the provider name, if set.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref provider) = self.provider {
            write!(f, "[{}] ", provider)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A specialized Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;
