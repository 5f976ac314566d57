//! Local verification of cached scan ID tokens.
//!
//! A token is accepted only when it parses, names a key present in the
//! `KeySet`, carries a signature that verifies against that key, and stays
//! valid for at least one more leeway window from now. Anything else is a
//! `ValidationError`, which callers treat as a cache miss.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::KeySet;

/// A token must remain valid for at least this long to be reused.
/// One minute covers the remote call the token is about to authorize.
pub const DEFAULT_EXPIRATION_LEEWAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIdClaims {
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Empty,
    Malformed,
    KeyNotFound,
    SignatureInvalid,
    Expired,
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("empty token")]
    Empty,

    #[error("invalid token: {0}")]
    Malformed(String),

    #[error("invalid token: key identifier does not match ({0})")]
    KeyNotFound(String),

    #[error("invalid token: signature does not match the content: {0}")]
    SignatureInvalid(String),

    #[error("token has expired: expires at {expires_at}, must be valid until {deadline}")]
    Expired { expires_at: i64, deadline: i64 },
}

impl ValidationError {
    pub fn kind(&self) -> ValidationErrorKind {
        match self {
            ValidationError::Empty => ValidationErrorKind::Empty,
            ValidationError::Malformed(_) => ValidationErrorKind::Malformed,
            ValidationError::KeyNotFound(_) => ValidationErrorKind::KeyNotFound,
            ValidationError::SignatureInvalid(_) => ValidationErrorKind::SignatureInvalid,
            ValidationError::Expired { .. } => ValidationErrorKind::Expired,
        }
    }

    /// Classify a verification failure from `jsonwebtoken`.
    /// Key and algorithm mismatches count as signature failures; everything
    /// about the token's encoding counts as malformed.
    fn from_verification(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidAlgorithmName => ValidationError::SignatureInvalid(err.to_string()),
            _ => ValidationError::Malformed(err.to_string()),
        }
    }
}

/// Stateless checker for scan ID tokens against a fixed key set.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    keys: KeySet,
    leeway: Duration,
}

impl TokenValidator {
    pub fn new(keys: KeySet, leeway: Duration) -> Self {
        Self { keys, leeway }
    }

    pub fn with_default_leeway(keys: KeySet) -> Self {
        Self::new(keys, DEFAULT_EXPIRATION_LEEWAY)
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Validate against the current wall clock
    pub fn validate(&self, token: &str) -> Result<ScanIdClaims, ValidationError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate as if the current time were `now` (Unix seconds)
    pub fn validate_at(&self, token: &str, now: i64) -> Result<ScanIdClaims, ValidationError> {
        if token.is_empty() {
            return Err(ValidationError::Empty);
        }

        if token.split('.').count() != 3 {
            return Err(ValidationError::Malformed(
                "expected three dot-separated segments".to_string(),
            ));
        }
        let header =
            decode_header(token).map_err(|e| ValidationError::Malformed(e.to_string()))?;

        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| ValidationError::KeyNotFound("no key identifier in header".to_string()))?;
        let jwk = self
            .keys
            .find(kid)
            .ok_or_else(|| ValidationError::KeyNotFound(kid.to_string()))?;

        let key = DecodingKey::from_jwk(jwk).map_err(ValidationError::from_verification)?;

        // Expiry is checked below with our own forward-looking leeway
        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data = decode::<ScanIdClaims>(token, &key, &validation)
            .map_err(ValidationError::from_verification)?;

        let leeway = i64::try_from(self.leeway.as_secs()).unwrap_or(i64::MAX);
        let deadline = now.saturating_add(leeway);
        if data.claims.exp <= deadline {
            return Err(ValidationError::Expired {
                expires_at: data.claims.exp,
                deadline,
            });
        }

        Ok(data.claims)
    }
}
