use std::path::PathBuf;
use thiserror::Error;

use crate::completeness::Incomplete;

/// Per-job failure taxonomy. Every variant is caught at the job boundary and
/// reported as a one-line summary; none of them aborts a batch.
#[derive(Debug, Error)]
pub enum ReuseError {
    #[error("malformed job identifier '{0}': expected '<entry1>-<entry2>'")]
    MalformedIdentifier(String),

    #[error("chains {missing:?} missing in {}", donor.display())]
    MissingChains {
        missing: Vec<String>,
        donor: PathBuf,
    },

    #[error("could not parse '{}': {source}", path.display())]
    UnreadableDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("'{}' does not hold a job document", path.display())]
    NotAJobDocument { path: PathBuf },

    #[error("could not render '{}': {source}", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation failed for '{}': {reason}", path.display())]
    ValidationFailed { path: PathBuf, reason: Incomplete },

    #[error("could not read batch table '{}': {message}", path.display())]
    BatchTable { path: PathBuf, message: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReuseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReuseError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ReuseError> = std::result::Result<T, E>;
