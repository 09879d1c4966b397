//! Per-record merge outcomes, the append-only import-event record, and the
//! end-of-job summary.

use std::fmt;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::types::{DocId, ExternalId};

// ---------------------------------------------------------------------------
// MergeOutcome
// ---------------------------------------------------------------------------

/// The result of applying one external record to the repository.
///
/// A lock conflict is an outcome, not an error: the record stays queued and
/// a later run retries it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// The document the record was applied to (set on creation for new
    /// documents).
    pub doc_id: Option<DocId>,
    /// True when no prior document existed and this operation created one.
    pub is_new_document: bool,
    /// Advisory: the update changed fields that matter for downstream
    /// indexing and a curator should look at it.
    pub needs_review: bool,
    /// A new publishable version was saved.
    pub publishable_version_created: bool,
    /// The document was locked by another actor; nothing was written.
    pub lock_conflict: bool,
    /// The pre-merge working copy had unversioned edits and was saved as a
    /// version before being overwritten.
    pub working_copy_preserved: bool,
    /// How many new versions this operation wrote.
    pub versions_written: u32,
    /// Detail of a publishable-branch validation rejection, if one occurred.
    pub publishable_rejection: Option<String>,
}

impl MergeOutcome {
    /// An outcome for an operation targeting an existing document.
    #[must_use]
    pub fn for_doc(doc_id: DocId) -> Self {
        Self {
            doc_id: Some(doc_id),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Category of a per-record failure, used by operators to decide between
/// re-running the job (transient) and manual intervention (content).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The record's content could not be parsed or transformed.
    Transform,
    /// The store rejected the candidate content.
    Validation,
    /// A programming or data-integrity problem (unknown document, lock
    /// bookkeeping mismatch). Not retried automatically.
    Integrity,
    /// Network or I/O trouble; retrying the record on a later run is safe.
    Transient,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transform => "transform",
            Self::Validation => "validation",
            Self::Integrity => "integrity",
            Self::Transient => "transient",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Failure
// ---------------------------------------------------------------------------

/// One failed record, with enough identity for manual follow-up.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// The registry key of the record that failed.
    pub external_id: ExternalId,
    /// The target document, if the record was mapped to one.
    pub doc_id: Option<DocId>,
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.external_id)?;
        if let Some(id) = self.doc_id {
            write!(f, "({id}) ")?;
        }
        write!(f, "[{}]: {}", self.kind, self.detail)
    }
}

// ---------------------------------------------------------------------------
// ImportEvent
// ---------------------------------------------------------------------------

/// One line of the append-only import-event log: what happened to one queued
/// record during one job run. Serialized as a single JSON object per line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportEvent {
    /// The registry key of the record.
    pub external_id: ExternalId,
    /// The target (or newly created) document.
    pub doc_id: Option<DocId>,
    /// True if the record created a new document.
    pub new: bool,
    /// True if the merge flagged the record for curator review.
    pub needs_review: bool,
    /// True if a new publishable version was saved.
    pub pub_version: bool,
    /// True if the document was locked by another actor.
    pub locked: bool,
    /// Failure detail when the record did not complete.
    pub failure: Option<Failure>,
    /// Unix epoch seconds when the record was processed.
    pub at: u64,
}

// ---------------------------------------------------------------------------
// JobSummary
// ---------------------------------------------------------------------------

/// Counts and failures for one batch run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    /// Records that completed (created or merged).
    pub processed: u32,
    /// Records that created a new document.
    pub added: u32,
    /// Records merged into an existing document.
    pub merged: u32,
    /// Records skipped because the document was locked by another actor.
    pub locked: u32,
    /// Records flagged for curator review.
    pub needs_review: u32,
    /// New publishable versions created across the batch.
    pub publishable_versions: u32,
    /// Individual failures, in queue order.
    pub failures: Vec<Failure>,
}

impl JobSummary {
    /// Number of failures of the given kind.
    #[must_use]
    pub fn failure_count(&self, kind: FailureKind) -> usize {
        self.failures.iter().filter(|f| f.kind == kind).count()
    }

    /// Render the operator-facing plain-text report.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "import job summary");
        let _ = writeln!(out, "  processed:            {}", self.processed);
        let _ = writeln!(out, "  new documents:        {}", self.added);
        let _ = writeln!(out, "  merged:               {}", self.merged);
        let _ = writeln!(out, "  locked (retry later): {}", self.locked);
        let _ = writeln!(out, "  needs review:         {}", self.needs_review);
        let _ = writeln!(out, "  publishable versions: {}", self.publishable_versions);
        let _ = writeln!(out, "  failures:             {}", self.failures.len());
        for failure in &self.failures {
            let _ = writeln!(out, "    - {failure}");
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ExternalId;

    fn failure(kind: FailureKind) -> Failure {
        Failure {
            external_id: ExternalId::new("NCT00000001").expect("valid"),
            doc_id: None,
            kind,
            detail: "boom".to_owned(),
        }
    }

    #[test]
    fn failure_counts_by_kind() {
        let summary = JobSummary {
            failures: vec![
                failure(FailureKind::Transient),
                failure(FailureKind::Validation),
                failure(FailureKind::Transient),
            ],
            ..JobSummary::default()
        };
        assert_eq!(summary.failure_count(FailureKind::Transient), 2);
        assert_eq!(summary.failure_count(FailureKind::Validation), 1);
        assert_eq!(summary.failure_count(FailureKind::Integrity), 0);
    }

    #[test]
    fn render_lists_failures() {
        let summary = JobSummary {
            processed: 3,
            failures: vec![failure(FailureKind::Validation)],
            ..JobSummary::default()
        };
        let text = summary.render();
        assert!(text.contains("processed:            3"));
        assert!(text.contains("NCT00000001"));
        assert!(text.contains("[validation]"));
    }

    #[test]
    fn import_event_round_trips_as_json() {
        let event = ImportEvent {
            external_id: ExternalId::new("NCT7").expect("valid"),
            doc_id: None,
            new: true,
            needs_review: false,
            pub_version: false,
            locked: false,
            failure: None,
            at: 1_700_000_000,
        };
        let line = serde_json::to_string(&event).expect("serialize");
        let back: ImportEvent = serde_json::from_str(&line).expect("deserialize");
        assert_eq!(back, event);
    }
}
