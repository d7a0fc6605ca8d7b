use crate::browser::LoadId;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Single-object operations that may fail without aborting a bulk action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Delete,
    Upload,
    Download,
    Link,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Delete => "delete",
            Operation::Upload => "upload",
            Operation::Download => "download",
            Operation::Link => "link",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BrowseError {
    /// Early termination requested by the user. Never shown as a failure.
    #[error("load canceled")]
    Canceled,
    /// A listing page failed; the load stops and keeps what it already has.
    #[error("failed to list objects: {0}")]
    Fetch(#[source] StoreError),
    /// Output of a superseded load.
    #[error("discarded update from stale load {0}")]
    StaleLoad(LoadId),
    #[error("{operation} failed for `{key}`: {source}")]
    Item {
        operation: Operation,
        key: String,
        #[source]
        source: StoreError,
    },
}

impl BrowseError {
    pub fn item(operation: Operation, key: impl Into<String>, source: StoreError) -> Self {
        BrowseError::Item {
            operation,
            key: key.into(),
            source,
        }
    }
}
