//! Client error types.

use thiserror::Error;
use timeblock_core::RequestError;
use timeblock_providers::ProviderError;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scheduling request failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    /// Provider error.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Machine-readable kind, stable across releases.
    ///
    /// A missing request field counts as a configuration error; malformed
    /// values and reversed dates are `invalid_request`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::InvalidRequest(RequestError::MissingField(_)) => "configuration_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Provider(err) => err.code().as_str(),
            Self::Io(_) => "io_error",
        }
    }
}
