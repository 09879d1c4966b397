//! Data model: identifiers, versions, external records, and outcomes.

pub mod outcome;
pub mod types;

pub use outcome::{Failure, FailureKind, ImportEvent, JobSummary, MergeOutcome};
pub use types::{Actor, DocId, ExternalId, ExternalRecord, ValidationError, Version, VersionNumber};
