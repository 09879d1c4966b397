//! Document-store capability interface and shared per-document state.
//!
//! The repository service that owns documents, assigns version numbers, and
//! enforces locks is an external collaborator. [`DocStore`] is the narrow
//! contract the merge core depends on; everything the engine knows about
//! versioning and locking flows through it. Two implementations ship with
//! the crate: [`MemoryStore`] for tests and fault-injection wrapping, and
//! [`JsonFileStore`] for batch runs from the CLI.
//!
//! All calls are blocking and sequential — the engine never issues a call
//! before the previous one returns. Retry and timeout policy belongs to the
//! store implementation, never to the callers.

pub mod file;
pub mod memory;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StoreError;
use crate::model::types::{Actor, DocId, Version, VersionNumber};

pub use file::JsonFileStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// DocStore
// ---------------------------------------------------------------------------

/// Reference metadata for a document, computed by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreRefPoints {
    /// Number of the latest version, if the document has ever been versioned.
    pub latest_version: Option<VersionNumber>,
    /// Number of the latest publishable version, if one exists.
    pub latest_publishable: Option<VersionNumber>,
    /// Whether the working copy has unsaved edits relative to the latest
    /// version.
    pub working_copy_changed: bool,
}

/// Capability contract for the external document repository.
///
/// Implementations use interior mutability: the batch is single-threaded and
/// the store's own per-document lock is the unit of isolation, not in-process
/// synchronization.
pub trait DocStore {
    /// Read a document's reference metadata. Does not require the lock.
    ///
    /// # Errors
    /// `NotFound` if the document id is unknown.
    fn fetch_reference_points(&self, doc_id: DocId) -> Result<StoreRefPoints, StoreError>;

    /// Acquire the document's lock and return the working-copy content.
    ///
    /// # Errors
    /// `LockConflict` if another actor holds the lock; `NotFound` if the
    /// document id is unknown.
    fn check_out(&self, doc_id: DocId, actor: &Actor) -> Result<String, StoreError>;

    /// Read the working copy without acquiring the lock.
    ///
    /// # Errors
    /// `NotFound` if the document id is unknown.
    fn fetch_working_copy(&self, doc_id: DocId) -> Result<String, StoreError>;

    /// Read the content of a specific version.
    ///
    /// # Errors
    /// `NotFound`/`VersionNotFound` if the document or version is unknown.
    fn fetch_version(&self, doc_id: DocId, number: VersionNumber) -> Result<String, StoreError>;

    /// Append a new version (and update the working copy to match). Requires
    /// the lock. `check_in` releases the lock after a successful save.
    ///
    /// # Errors
    /// `NotLocked` if no actor holds the lock; `ValidationFailed` if the
    /// store rejects the content.
    fn save_version(
        &self,
        doc_id: DocId,
        content: &str,
        publishable: bool,
        check_in: bool,
    ) -> Result<VersionNumber, StoreError>;

    /// Release the document's lock.
    ///
    /// # Errors
    /// `NotLocked` if `actor` does not hold the lock.
    fn unlock(&self, doc_id: DocId, actor: &Actor) -> Result<(), StoreError>;

    /// Create a brand-new document with `content` as version 1
    /// (non-publishable). The document is left unlocked.
    ///
    /// # Errors
    /// `ValidationFailed` if the store rejects the content.
    fn create_document(&self, content: &str) -> Result<DocId, StoreError>;
}

// ---------------------------------------------------------------------------
// CheckoutGuard
// ---------------------------------------------------------------------------

/// Scoped lock acquisition: release on every path reached after a successful
/// checkout.
///
/// [`release`](Self::release) surfaces unlock errors on the happy path; if
/// the guard is dropped instead (an early `?` return), the lock is still
/// released and any unlock failure is logged. A failed acquisition never
/// constructs a guard, so there is nothing to release in that case.
pub struct CheckoutGuard<'a> {
    store: &'a dyn DocStore,
    doc_id: DocId,
    actor: Actor,
    armed: bool,
}

impl<'a> CheckoutGuard<'a> {
    /// Check out `doc_id` as `actor`, returning the guard and the
    /// working-copy content as of acquisition.
    ///
    /// # Errors
    /// Propagates the store's `check_out` failure (notably `LockConflict`).
    pub fn acquire(
        store: &'a dyn DocStore,
        doc_id: DocId,
        actor: &Actor,
    ) -> Result<(Self, String), StoreError> {
        let content = store.check_out(doc_id, actor)?;
        Ok((
            Self {
                store,
                doc_id,
                actor: actor.clone(),
                armed: true,
            },
            content,
        ))
    }

    /// Release the lock explicitly, surfacing any unlock error.
    ///
    /// # Errors
    /// Propagates the store's `unlock` failure.
    pub fn release(mut self) -> Result<(), StoreError> {
        self.armed = false;
        self.store.unlock(self.doc_id, &self.actor)
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        if self.armed
            && let Err(err) = self.store.unlock(self.doc_id, &self.actor)
        {
            warn!(doc_id = %self.doc_id, error = %err, "failed to release lock on unwind path");
        }
    }
}

// ---------------------------------------------------------------------------
// StoredDocument — state shared by the provided store implementations
// ---------------------------------------------------------------------------

/// Content validation hook: `(content, publishable)` → accept or reject.
pub type Validator = dyn Fn(&str, bool) -> Result<(), String> + Send;

/// One document's full state: working copy, lock, and version history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredDocument {
    pub working_copy: String,
    pub lock: Option<Actor>,
    pub versions: Vec<Version>,
}

impl StoredDocument {
    pub fn new(content: &str, created_at: u64) -> Self {
        Self {
            working_copy: content.to_owned(),
            lock: None,
            versions: vec![Version {
                number: VersionNumber::FIRST,
                content: content.to_owned(),
                publishable: false,
                created_at,
            }],
        }
    }

    pub fn reference_points(&self) -> StoreRefPoints {
        let latest = self.versions.last();
        StoreRefPoints {
            latest_version: latest.map(|v| v.number),
            latest_publishable: self
                .versions
                .iter()
                .rev()
                .find(|v| v.publishable)
                .map(|v| v.number),
            working_copy_changed: latest.is_none_or(|v| v.content != self.working_copy),
        }
    }

    pub fn check_out(&mut self, doc_id: DocId, actor: &Actor) -> Result<String, StoreError> {
        if let Some(holder) = &self.lock
            && holder != actor
        {
            return Err(StoreError::LockConflict {
                doc_id,
                holder: holder.clone(),
            });
        }
        self.lock = Some(actor.clone());
        Ok(self.working_copy.clone())
    }

    pub fn fetch_version(
        &self,
        doc_id: DocId,
        number: VersionNumber,
    ) -> Result<String, StoreError> {
        self.versions
            .iter()
            .find(|v| v.number == number)
            .map(|v| v.content.clone())
            .ok_or(StoreError::VersionNotFound { doc_id, number })
    }

    pub fn save_version(
        &mut self,
        doc_id: DocId,
        content: &str,
        publishable: bool,
        check_in: bool,
        validator: Option<&Validator>,
    ) -> Result<VersionNumber, StoreError> {
        if self.lock.is_none() {
            return Err(StoreError::NotLocked { doc_id });
        }
        if let Some(validate) = validator {
            validate(content, publishable).map_err(|detail| StoreError::ValidationFailed {
                doc_id: Some(doc_id),
                detail,
            })?;
        }
        let number = self
            .versions
            .last()
            .map_or(VersionNumber::FIRST, |v| v.number.next());
        self.versions.push(Version {
            number,
            content: content.to_owned(),
            publishable,
            created_at: now_epoch_secs(),
        });
        self.working_copy = content.to_owned();
        if check_in {
            self.lock = None;
        }
        Ok(number)
    }

    pub fn unlock(&mut self, doc_id: DocId, actor: &Actor) -> Result<(), StoreError> {
        match &self.lock {
            Some(holder) if holder == actor => {
                self.lock = None;
                Ok(())
            }
            _ => Err(StoreError::NotLocked { doc_id }),
        }
    }
}

/// Current time as Unix epoch seconds (0 if the clock is before the epoch).
pub(crate) fn now_epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
