use core::fmt;

use thiserror::Error;

use crate::Vec3;

/// Which end of a query failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Origin,
    Destination,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Origin => f.write_str("origin"),
            Endpoint::Destination => f.write_str("destination"),
        }
    }
}

/// Recoverable search failures. None of these leave partial output behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("failed to resolve {endpoint} {point:?} to a node")]
    Unresolved { endpoint: Endpoint, point: Vec3 },

    #[error("goal unreachable: open list exhausted")]
    Exhausted,

    #[error("another search is already running on this instance")]
    Busy,

    #[error("search aborted after {0} expansions")]
    ExpansionLimit(usize),

    #[error("search worker failed: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;
