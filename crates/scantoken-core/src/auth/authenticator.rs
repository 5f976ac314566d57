//! Cached scan ID retrieval.
//!
//! `Authenticator::get_token` looks up the user's cached token, returns it
//! when it still validates, and otherwise logs in to Hub, exchanges the
//! session for a new scan ID and persists it before returning it.
//!
//! Each call is an independent, blocking transaction over the store and the
//! negotiator. Nothing is retried; callers retry the whole flow.

use tracing::{debug, info};

use super::{Credentials, TokenValidator};
use crate::cache::TokenStore;
use crate::error::AuthError;

/// Remote side of the flow: a Hub login followed by a scan ID exchange.
///
/// The session handle is opaque to the authenticator.
pub trait Negotiator {
    type Session;

    fn login(&self, credentials: &Credentials) -> anyhow::Result<Self::Session>;

    fn scan_id(&self, session: &Self::Session) -> anyhow::Result<String>;
}

pub struct Authenticator<N> {
    negotiator: N,
    store: TokenStore,
    validator: TokenValidator,
}

impl<N: Negotiator> Authenticator<N> {
    pub fn new(negotiator: N, store: TokenStore, validator: TokenValidator) -> Self {
        Self {
            negotiator,
            store,
            validator,
        }
    }

    pub fn negotiator(&self) -> &N {
        &self.negotiator
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// A scan ID valid for at least the validator's leeway window.
    ///
    /// A freshly negotiated token is only returned once it has been written
    /// to the store; if that write fails the token is dropped.
    pub fn get_token(&self, credentials: &Credentials) -> Result<String, AuthError> {
        let username = credentials.username.as_str();

        let cached = self.store.load(username);
        match self.validator.validate(&cached) {
            Ok(claims) => {
                debug!(username, expires_at = claims.exp, "Using cached scan id");
                return Ok(cached);
            }
            Err(e) => {
                debug!(username, kind = ?e.kind(), reason = %e, "Cached scan id unusable, negotiating");
            }
        }

        let token = self.negotiate(credentials)?;

        self.store
            .save(username, &token)
            .map_err(AuthError::PersistFailed)?;

        info!(username, "Negotiated new scan id");
        Ok(token)
    }

    fn negotiate(&self, credentials: &Credentials) -> Result<String, AuthError> {
        let session = self
            .negotiator
            .login(credentials)
            .map_err(AuthError::LoginFailed)?;
        self.negotiator
            .scan_id(&session)
            .map_err(AuthError::NegotiationFailed)
    }
}
