//! Error taxonomy for the import pipeline.
//!
//! Two layers: [`StoreError`] covers the document-store capability contract
//! (lock conflicts, validation rejections, missing documents, I/O), and
//! [`MergeError`] is what one record's merge can fail with. The job
//! controller pattern-matches on these kinds to decide whether a record is
//! retryable — no string-parsing of error messages anywhere.

use std::fmt;
use std::path::PathBuf;

use crate::model::types::{Actor, DocId, VersionNumber};
use crate::xml::XmlError;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Failure of a document-store call.
#[derive(Debug)]
pub enum StoreError {
    /// The document id is unknown to the store.
    NotFound {
        /// The id that was requested.
        doc_id: DocId,
    },

    /// The requested version does not exist for this document.
    VersionNotFound {
        /// The document.
        doc_id: DocId,
        /// The version number that was requested.
        number: VersionNumber,
    },

    /// Another actor holds the document's lock.
    ///
    /// Recoverable: retry the record on a later run. Never a data problem.
    LockConflict {
        /// The locked document.
        doc_id: DocId,
        /// Who holds the lock.
        holder: Actor,
    },

    /// A write was attempted without holding the lock.
    ///
    /// Indicates a lock-bookkeeping bug upstream; never retried.
    NotLocked {
        /// The document.
        doc_id: DocId,
    },

    /// The store rejected the candidate content.
    ValidationFailed {
        /// The document the save targeted, if known.
        doc_id: Option<DocId>,
        /// The store's rejection message.
        detail: String,
    },

    /// The store's on-disk state could not be read or parsed.
    Corrupt {
        /// Path of the offending file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// Network or filesystem trouble talking to the store.
    Io(std::io::Error),
}

impl StoreError {
    /// Whether retrying the whole record on a later run may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { doc_id } => {
                write!(f, "{doc_id} not found in the document store")
            }
            Self::VersionNotFound { doc_id, number } => {
                write!(f, "{doc_id} has no version {number}")
            }
            Self::LockConflict { doc_id, holder } => {
                write!(f, "{doc_id} is checked out by '{holder}'")
            }
            Self::NotLocked { doc_id } => {
                write!(f, "{doc_id} is not checked out; save or unlock refused")
            }
            Self::ValidationFailed { doc_id, detail } => {
                if let Some(id) = doc_id {
                    write!(f, "store validation rejected content for {id}: {detail}")
                } else {
                    write!(f, "store validation rejected content: {detail}")
                }
            }
            Self::Corrupt { path, detail } => {
                write!(f, "store state at '{}' is corrupt: {}", path.display(), detail)
            }
            Self::Io(err) => write!(f, "document store I/O error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

// ---------------------------------------------------------------------------
// MergeError
// ---------------------------------------------------------------------------

/// Failure of one record's merge operation.
///
/// Lock conflicts and publishable-branch validation rejections are *not*
/// errors — they are recorded on the [`MergeOutcome`](crate::model::MergeOutcome)
/// and the operation completes. This type covers everything else.
#[derive(Debug)]
pub enum MergeError {
    /// A store call failed.
    Store(StoreError),

    /// Document content could not be parsed or re-serialized.
    Xml(XmlError),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Xml(err) => write!(f, "document content error: {err}"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Xml(err) => Some(err),
        }
    }
}

impl From<StoreError> for MergeError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<XmlError> for MergeError {
    fn from(err: XmlError) -> Self {
        Self::Xml(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let io = StoreError::Io(std::io::Error::other("connection reset"));
        assert!(io.is_transient());

        let not_locked = StoreError::NotLocked {
            doc_id: DocId::new(5).expect("valid"),
        };
        assert!(!not_locked.is_transient());
    }

    #[test]
    fn display_names_the_document() {
        let err = StoreError::LockConflict {
            doc_id: DocId::new(42).expect("valid"),
            holder: Actor::new("editor1").expect("valid"),
        };
        let text = err.to_string();
        assert!(text.contains("doc#42"));
        assert!(text.contains("editor1"));
    }
}
