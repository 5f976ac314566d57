use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by `Authenticator::get_token`.
///
/// Local validation failures never appear here; they are recovered by
/// negotiating a new token. Each variant names the step that failed and
/// keeps the underlying cause as its source.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("could not negotiate scan id token: could not login")]
    LoginFailed(#[source] anyhow::Error),

    #[error("could not negotiate scan id token: could not get scan id")]
    NegotiationFailed(#[source] anyhow::Error),

    #[error("could not update local token")]
    PersistFailed(#[source] StoreError),
}

/// Failures writing the local token store. Read failures are not errors:
/// an unreadable or unparsable store is treated as empty.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create token store directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read token store {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize token store")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write token store {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
