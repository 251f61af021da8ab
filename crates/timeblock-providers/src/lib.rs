//! Credential lifecycle and calendar access.
//!
//! This crate provides everything that talks to the outside world:
//!
//! - [`AccessTokenSource`] / [`CalendarGateway`] - The seams the scheduler uses
//! - [`SecretStore`] - Key-value persistence for credential material
//! - [`InteractiveAuthorizer`] - Browser consent with a loopback redirect
//! - [`google`] - The Google Calendar implementation of all of the above
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────────┐
//! │ SecretStore      │   │ InteractiveAuthorizer│
//! └────────┬─────────┘   └──────────┬───────────┘
//!          │                        │
//!          ▼                        ▼
//!      ┌─────────────────────────────────┐
//!      │ CredentialManager               │──▶ AccessTokenSource
//!      └─────────────────────────────────┘
//!
//!      ┌─────────────────────────────────┐
//!      │ GoogleCalendarClient            │──▶ CalendarGateway
//!      └─────────────────────────────────┘
//! ```

pub mod authorizer;
pub mod error;
pub mod gateway;
pub mod google;
pub mod store;

// Re-export main types at crate root
pub use authorizer::{DEFAULT_LOOPBACK_PORT, InteractiveAuthorizer, LoopbackAuthorizer};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use gateway::{AccessTokenSource, BoxFuture, BusyQuery, CalendarGateway, EventReceipt, NewEvent};
pub use store::{FileSecretStore, MemorySecretStore, SecretStore};
