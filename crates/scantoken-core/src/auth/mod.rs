//! Authentication module for obtaining scan ID tokens.
//!
//! This module provides:
//! - `KeySet`: the immutable set of public verification keys
//! - `TokenValidator`: local signature and expiry checks with a leeway window
//! - `Authenticator`: cached lookup, validation, and renegotiation via Hub
//! - `Credentials`: the username/secret pair handed to the negotiator
//!
//! Validation failures never reach the caller of `Authenticator::get_token`;
//! they only decide whether a new token must be negotiated.

pub mod authenticator;
pub mod credentials;
pub mod keys;
pub mod validator;

#[cfg(test)]
pub(crate) mod testutil;

pub use authenticator::{Authenticator, Negotiator};
pub use credentials::Credentials;
pub use keys::KeySet;
pub use validator::{
    ScanIdClaims, TokenValidator, ValidationError, ValidationErrorKind, DEFAULT_EXPIRATION_LEEWAY,
};
