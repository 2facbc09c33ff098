//! Demo error types.

use thiserror::Error;

/// Errors surfaced by the walkthrough.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Mapping, graph or store failure.
    #[error(transparent)]
    Strome(#[from] strome_core::Error),

    /// Backing store failure outside a context call.
    #[error(transparent)]
    Store(#[from] strome_core::StoreError),

    /// Dictionary encoding failure.
    #[error("encoding error: {0}")]
    Encoding(#[from] strome_proto::Error),

    /// Schema serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reloaded user differs from the saved one.
    #[error("reloaded {0} differs from the saved entity")]
    RoundTrip(String),
}
