//! Blocking REST client for Hub.
//!
//! `HubClient` implements the two remote calls behind `auth::Negotiator`:
//! a username/password login and the exchange of the resulting session for
//! a scan ID token.

pub mod client;
pub mod error;

pub use client::{HubClient, HubSession};
pub use error::ApiError;
