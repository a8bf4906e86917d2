//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias.
//! Variants cover invalid configuration, placement exhaustion, worker pool construction, IO,
//! and generic errors.
//! Coordinates that leave the domain are repaired by [`crate::geometry::Domain::check_boundaries`]
//! and never surface here.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(
        "placement exhausted: accepted {placed} of {target} particles after {attempts} attempts"
    )]
    PlacementExhausted {
        placed: usize,
        target: usize,
        attempts: u64,
    },

    #[error("worker pool error: {0}")]
    ThreadPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Error::ThreadPool(value.to_string())
    }
}
