//! Core library for scantoken.
//!
//! Produces a short-lived scan ID token for a Hub user, reusing the copy
//! cached on disk while it still verifies against the known key set and
//! has at least one leeway window of lifetime left.
//!
//! - `auth`: key set, token validation, and the `Authenticator` orchestrator
//! - `cache`: the on-disk username to token map
//! - `api`: blocking Hub client used to negotiate fresh tokens
//! - `config`: configuration directory and settings

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;

pub use api::HubClient;
pub use auth::{
    Authenticator, Credentials, KeySet, Negotiator, ScanIdClaims, TokenValidator,
    ValidationError, ValidationErrorKind, DEFAULT_EXPIRATION_LEEWAY,
};
pub use cache::TokenStore;
pub use config::Config;
pub use error::{AuthError, StoreError};
