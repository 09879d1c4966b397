//! In-memory document store.
//!
//! The reference implementation of [`DocStore`]: enforces the lock
//! discipline, version monotonicity, and the publishable sub-lineage
//! invariant, entirely in process. Used by the test suites directly and as
//! the inner store for fault-injection wrappers. An optional validation
//! hook lets tests produce `ValidationFailed` on demand.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::error::StoreError;
use crate::model::types::{Actor, DocId, Version, VersionNumber};

use super::{DocStore, StoreRefPoints, StoredDocument, Validator, now_epoch_secs};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory [`DocStore`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    validator: Option<Box<Validator>>,
}

#[derive(Default)]
struct State {
    docs: BTreeMap<DocId, StoredDocument>,
    next_id: u32,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a validation hook run on every save: `(content, publishable)`.
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&str, bool) -> Result<(), String> + Send + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Full version history of a document (test inspection).
    ///
    /// # Errors
    /// `NotFound` if the document id is unknown.
    pub fn versions(&self, doc_id: DocId) -> Result<Vec<Version>, StoreError> {
        let state = self.lock_state();
        state
            .docs
            .get(&doc_id)
            .map(|doc| doc.versions.clone())
            .ok_or(StoreError::NotFound { doc_id })
    }

    /// Current lock holder of a document, if any (test inspection).
    ///
    /// # Errors
    /// `NotFound` if the document id is unknown.
    pub fn lock_holder(&self, doc_id: DocId) -> Result<Option<Actor>, StoreError> {
        let state = self.lock_state();
        state
            .docs
            .get(&doc_id)
            .map(|doc| doc.lock.clone())
            .ok_or(StoreError::NotFound { doc_id })
    }

    /// Overwrite the working copy without creating a version — what a human
    /// editor's in-progress edit looks like. Requires the lock.
    ///
    /// # Errors
    /// `NotFound` if the document id is unknown; `NotLocked` if no actor
    /// holds the lock.
    pub fn replace_working_copy(&self, doc_id: DocId, content: &str) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        let doc = state
            .docs
            .get_mut(&doc_id)
            .ok_or(StoreError::NotFound { doc_id })?;
        if doc.lock.is_none() {
            return Err(StoreError::NotLocked { doc_id });
        }
        doc.working_copy = content.to_owned();
        Ok(())
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocStore for MemoryStore {
    fn fetch_reference_points(&self, doc_id: DocId) -> Result<StoreRefPoints, StoreError> {
        let state = self.lock_state();
        state
            .docs
            .get(&doc_id)
            .map(StoredDocument::reference_points)
            .ok_or(StoreError::NotFound { doc_id })
    }

    fn check_out(&self, doc_id: DocId, actor: &Actor) -> Result<String, StoreError> {
        let mut state = self.lock_state();
        let doc = state
            .docs
            .get_mut(&doc_id)
            .ok_or(StoreError::NotFound { doc_id })?;
        doc.check_out(doc_id, actor)
    }

    fn fetch_working_copy(&self, doc_id: DocId) -> Result<String, StoreError> {
        let state = self.lock_state();
        state
            .docs
            .get(&doc_id)
            .map(|doc| doc.working_copy.clone())
            .ok_or(StoreError::NotFound { doc_id })
    }

    fn fetch_version(&self, doc_id: DocId, number: VersionNumber) -> Result<String, StoreError> {
        let state = self.lock_state();
        let doc = state
            .docs
            .get(&doc_id)
            .ok_or(StoreError::NotFound { doc_id })?;
        doc.fetch_version(doc_id, number)
    }

    fn save_version(
        &self,
        doc_id: DocId,
        content: &str,
        publishable: bool,
        check_in: bool,
    ) -> Result<VersionNumber, StoreError> {
        let mut state = self.lock_state();
        let doc = state
            .docs
            .get_mut(&doc_id)
            .ok_or(StoreError::NotFound { doc_id })?;
        doc.save_version(
            doc_id,
            content,
            publishable,
            check_in,
            self.validator.as_deref(),
        )
    }

    fn unlock(&self, doc_id: DocId, actor: &Actor) -> Result<(), StoreError> {
        let mut state = self.lock_state();
        let doc = state
            .docs
            .get_mut(&doc_id)
            .ok_or(StoreError::NotFound { doc_id })?;
        doc.unlock(doc_id, actor)
    }

    fn create_document(&self, content: &str) -> Result<DocId, StoreError> {
        if let Some(validate) = self.validator.as_deref() {
            validate(content, false).map_err(|detail| StoreError::ValidationFailed {
                doc_id: None,
                detail,
            })?;
        }
        let mut state = self.lock_state();
        state.next_id += 1;
        let doc_id = DocId::new(state.next_id).map_err(|e| StoreError::ValidationFailed {
            doc_id: None,
            detail: e.to_string(),
        })?;
        state
            .docs
            .insert(doc_id, StoredDocument::new(content, now_epoch_secs()));
        Ok(doc_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(name: &str) -> Actor {
        Actor::new(name).expect("valid actor")
    }

    #[test]
    fn create_yields_version_one_unlocked() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");
        let points = store.fetch_reference_points(id).expect("points");
        assert_eq!(points.latest_version, Some(VersionNumber::FIRST));
        assert_eq!(points.latest_publishable, None);
        assert!(!points.working_copy_changed);
        assert_eq!(store.lock_holder(id).expect("doc"), None);
    }

    #[test]
    fn checkout_conflicts_for_second_actor() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");
        store.check_out(id, &actor("editor1")).expect("first checkout");

        let err = store.check_out(id, &actor("importer")).expect_err("conflict");
        match err {
            StoreError::LockConflict { holder, .. } => {
                assert_eq!(holder.as_str(), "editor1");
            }
            other => panic!("expected LockConflict, got {other:?}"),
        }
    }

    #[test]
    fn save_requires_lock_and_numbers_increase() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");

        let err = store.save_version(id, "<T>2</T>", false, false);
        assert!(matches!(err, Err(StoreError::NotLocked { .. })));

        let importer = actor("importer");
        store.check_out(id, &importer).expect("checkout");
        let n2 = store.save_version(id, "<T>2</T>", false, false).expect("save");
        let n3 = store.save_version(id, "<T>3</T>", true, true).expect("save");
        assert_eq!(n2.get(), 2);
        assert_eq!(n3.get(), 3);
        assert_eq!(store.lock_holder(id).expect("doc"), None);

        let points = store.fetch_reference_points(id).expect("points");
        assert_eq!(points.latest_version.map(VersionNumber::get), Some(3));
        assert_eq!(points.latest_publishable.map(VersionNumber::get), Some(3));
    }

    #[test]
    fn working_copy_divergence_is_tracked() {
        let store = MemoryStore::new();
        let id = store.create_document("<T>1</T>").expect("create");
        let editor = actor("editor1");
        store.check_out(id, &editor).expect("checkout");
        store.replace_working_copy(id, "<T>edited</T>").expect("edit");
        store.unlock(id, &editor).expect("unlock");

        let points = store.fetch_reference_points(id).expect("points");
        assert!(points.working_copy_changed);
        assert_eq!(store.fetch_working_copy(id).expect("cwd"), "<T>edited</T>");
    }

    #[test]
    fn unlock_by_non_holder_is_refused() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");
        store.check_out(id, &actor("editor1")).expect("checkout");
        let err = store.unlock(id, &actor("importer"));
        assert!(matches!(err, Err(StoreError::NotLocked { .. })));
    }

    #[test]
    fn validator_rejection_is_validation_failed() {
        let store = MemoryStore::new().with_validator(|content, _publishable| {
            if content.contains("bad") {
                Err("schema violation".to_owned())
            } else {
                Ok(())
            }
        });
        let id = store.create_document("<T/>").expect("create");
        store.check_out(id, &actor("importer")).expect("checkout");
        let err = store.save_version(id, "<T>bad</T>", true, false);
        assert!(matches!(err, Err(StoreError::ValidationFailed { .. })));
    }

    #[test]
    fn guard_releases_on_drop() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");
        let importer = actor("importer");
        {
            let (_guard, content) =
                super::super::CheckoutGuard::acquire(&store, id, &importer).expect("acquire");
            assert_eq!(content, "<T/>");
            assert_eq!(store.lock_holder(id).expect("doc"), Some(importer.clone()));
        }
        assert_eq!(store.lock_holder(id).expect("doc"), None);
    }
}
