//! Local caching of scan ID tokens.
//!
//! `TokenStore` keeps a single JSON object mapping Hub usernames to their
//! last negotiated token, e.g. `{"alice": "eyJhbGc..."}`, under the scan
//! configuration directory. A corrupt or missing file reads as empty.

pub mod store;

pub use store::{TokenMap, TokenStore};
