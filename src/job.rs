//! Job Controller: drive a queue of external records through the merge
//! engine, one at a time, in queue order.
//!
//! Each record is isolated: a failure is recorded on the summary and the
//! batch moves on. Records that completed are drained from the queue;
//! lock-skipped and failed records stay behind for a later run. Every record
//! emits one [`ImportEvent`] to the configured sink, success or not.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write as _};
use std::path::Path;

use tracing::{error, info, warn};

use crate::error::{MergeError, StoreError};
use crate::merge::MergeEngine;
use crate::model::outcome::{Failure, FailureKind, ImportEvent, JobSummary, MergeOutcome};
use crate::model::types::ExternalRecord;
use crate::store::DocStore;

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Destination for the append-only import-event log.
pub trait EventSink {
    /// Append one event.
    ///
    /// # Errors
    /// Returns an I/O error when the event cannot be written.
    fn append(&mut self, event: &ImportEvent) -> io::Result<()>;
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<ImportEvent>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far, in append order.
    #[must_use]
    pub fn events(&self) -> &[ImportEvent] {
        &self.events
    }
}

impl EventSink for MemorySink {
    fn append(&mut self, event: &ImportEvent) -> io::Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Line-delimited JSON sink appending to a log file. One event per line;
/// flushed after every append so a crash loses at most the in-flight record.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    /// Open (or create) the log file for appending.
    ///
    /// # Errors
    /// Returns an I/O error when the file cannot be opened.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl EventSink for JsonlSink {
    fn append(&mut self, event: &ImportEvent) -> io::Result<()> {
        let line = serde_json::to_string(event).map_err(io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// JobController
// ---------------------------------------------------------------------------

/// Batch driver: applies every queued record through one [`MergeEngine`].
pub struct JobController<'a> {
    engine: &'a MergeEngine,
    store: &'a dyn DocStore,
}

impl<'a> JobController<'a> {
    #[must_use]
    pub fn new(engine: &'a MergeEngine, store: &'a dyn DocStore) -> Self {
        Self { engine, store }
    }

    /// Run the batch. On return, `queue` holds only the records that should
    /// be retried on a later run (lock-skipped and failed); completed
    /// records are drained.
    ///
    /// A sink failure is logged and never interrupts the batch: losing a log
    /// line is preferable to abandoning the remaining records.
    pub fn run(&self, queue: &mut Vec<ExternalRecord>, sink: &mut dyn EventSink) -> JobSummary {
        let mut summary = JobSummary::default();
        let mut retained = Vec::new();

        for record in queue.drain(..) {
            let keep = match self.engine.merge(self.store, &record) {
                Ok(outcome) => {
                    self.tally(&record, &outcome, &mut summary, sink);
                    outcome.lock_conflict
                }
                Err(err) => {
                    self.record_failure(&record, &err, &mut summary, sink);
                    true
                }
            };
            if keep {
                retained.push(record);
            }
        }

        *queue = retained;
        info!(
            processed = summary.processed,
            locked = summary.locked,
            failures = summary.failures.len(),
            remaining = queue.len(),
            "batch complete"
        );
        summary
    }

    fn tally(
        &self,
        record: &ExternalRecord,
        outcome: &MergeOutcome,
        summary: &mut JobSummary,
        sink: &mut dyn EventSink,
    ) {
        if outcome.lock_conflict {
            summary.locked += 1;
        } else {
            summary.processed += 1;
            if outcome.is_new_document {
                summary.added += 1;
            } else {
                summary.merged += 1;
            }
            if outcome.needs_review {
                summary.needs_review += 1;
            }
            if outcome.publishable_version_created {
                summary.publishable_versions += 1;
            }
        }
        self.emit(
            sink,
            &ImportEvent {
                external_id: record.external_id.clone(),
                doc_id: outcome.doc_id,
                new: outcome.is_new_document,
                needs_review: outcome.needs_review,
                pub_version: outcome.publishable_version_created,
                locked: outcome.lock_conflict,
                failure: None,
                at: crate::store::now_epoch_secs(),
            },
        );
    }

    fn record_failure(
        &self,
        record: &ExternalRecord,
        err: &MergeError,
        summary: &mut JobSummary,
        sink: &mut dyn EventSink,
    ) {
        let failure = Failure {
            external_id: record.external_id.clone(),
            doc_id: record.doc_id,
            kind: classify(err),
            detail: err.to_string(),
        };
        error!(
            external_id = %failure.external_id,
            kind = %failure.kind,
            detail = %failure.detail,
            "record failed; continuing batch"
        );
        self.emit(
            sink,
            &ImportEvent {
                external_id: record.external_id.clone(),
                doc_id: record.doc_id,
                new: false,
                needs_review: false,
                pub_version: false,
                locked: false,
                failure: Some(failure.clone()),
                at: crate::store::now_epoch_secs(),
            },
        );
        summary.failures.push(failure);
    }

    fn emit(&self, sink: &mut dyn EventSink, event: &ImportEvent) {
        if let Err(err) = sink.append(event) {
            warn!(
                external_id = %event.external_id,
                error = %err,
                "failed to append import event"
            );
        }
    }
}

/// Map an engine error to the failure category operators act on.
fn classify(err: &MergeError) -> FailureKind {
    match err {
        MergeError::Xml(_) => FailureKind::Transform,
        MergeError::Store(store) => match store {
            StoreError::Io(_) => FailureKind::Transient,
            StoreError::ValidationFailed { .. } => FailureKind::Validation,
            _ => FailureKind::Integrity,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests — batch behavior is covered end to end in tests/job_batch.rs; these
// pin the failure classification.
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::DocId;
    use crate::xml::XmlError;

    #[test]
    fn classification_covers_the_error_taxonomy() {
        let ghost = DocId::new(1).expect("valid id");
        assert_eq!(
            classify(&MergeError::Xml(XmlError::NoRootElement)),
            FailureKind::Transform
        );
        assert_eq!(
            classify(&MergeError::Store(StoreError::Io(io::Error::other("nope")))),
            FailureKind::Transient
        );
        assert_eq!(
            classify(&MergeError::Store(StoreError::ValidationFailed {
                doc_id: Some(ghost),
                detail: "bad".to_owned(),
            })),
            FailureKind::Validation
        );
        assert_eq!(
            classify(&MergeError::Store(StoreError::NotFound { doc_id: ghost })),
            FailureKind::Integrity
        );
        assert_eq!(
            classify(&MergeError::Store(StoreError::NotLocked { doc_id: ghost })),
            FailureKind::Integrity
        );
    }
}
