//! Error types for the fetch path and pool construction.
//!
//! Nothing here ever reaches the page: `RelatedService` turns every
//! `FetchError` into an empty pool, and `RecordError`s only decide which raw
//! records are dropped.

use std::time::Duration;

use thiserror::Error;

/// Failure of a single content API call.
///
/// `Clone` because one in-flight result is handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("content fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("content API returned HTTP {0}")]
    Status(u16),

    #[error("content API unreachable: {0}")]
    Transport(String),

    #[error("content API response could not be decoded: {0}")]
    Decode(String),

    #[error("content API reported errors: {0}")]
    Api(String),
}

impl FetchError {
    /// Map a transport failure; `timeout` is the client's configured request
    /// timeout, reported when reqwest gives up on it.
    pub fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(timeout)
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Why a raw record was dropped from a pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("record is not an object")]
    NotAnObject,

    #[error("record has an unexpected shape: {0}")]
    Shape(String),

    #[error("record has no `{0}`")]
    MissingField(&'static str),

    #[error("record date `{0}` is not a recognised timestamp")]
    BadDate(String),
}
