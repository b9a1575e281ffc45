//! Error taxonomy for the geocoding core.

use thiserror::Error;

use crate::store::StoreError;

/// Failures that abort a request.
///
/// Bad parameters never show up here: they are corrected or dropped while the
/// request is parsed. Empty results are not errors either.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("place store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("place store rejected query: {0}")]
    MalformedQuery(String),

    #[error("place store call timed out after {0} ms")]
    Timeout(u64),

    #[error("request cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for GeocodeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => GeocodeError::StoreUnavailable(msg),
            StoreError::MalformedQuery(msg) => GeocodeError::MalformedQuery(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeocodeError>;
