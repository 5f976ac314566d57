//! Public verification keys for scan ID tokens.

use std::path::Path;

use anyhow::{Context, Result};
use jsonwebtoken::jwk::{Jwk, JwkSet};

/// Immutable set of public keys, each selected by its key identifier (`kid`).
///
/// The set is expected to hold a handful of keys (current plus rotated-out),
/// so lookup is a linear scan in declaration order.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: Vec<Jwk>,
}

impl KeySet {
    pub fn new(jwks: JwkSet) -> Self {
        Self { keys: jwks.keys }
    }

    /// Parse a JWKS document (`{"keys": [...]}`)
    pub fn from_json(json: &str) -> Result<Self> {
        let jwks: JwkSet = serde_json::from_str(json).context("Failed to parse JWKS document")?;
        Ok(Self::new(jwks))
    }

    /// Load a JWKS document from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JWKS file: {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// First key whose identifier equals `kid`
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys
            .iter()
            .find(|key| key.common.key_id.as_deref() == Some(kid))
    }

    /// Key identifiers in declaration order; keys without one are skipped
    pub fn kids(&self) -> Vec<&str> {
        self.keys
            .iter()
            .filter_map(|key| key.common.key_id.as_deref())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
