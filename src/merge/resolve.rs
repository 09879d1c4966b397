//! Version Resolver: the three reference points that drive every merge
//! decision.

use crate::error::StoreError;
use crate::model::types::{DocId, VersionNumber};
use crate::store::DocStore;

/// A document's reference points: current working copy, latest version,
/// latest publishable version, and whether the working copy has unsaved
/// edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferencePoints {
    /// The mutable head content.
    pub working_copy: String,
    /// Latest version number, if the document has ever been versioned.
    pub latest_version: Option<VersionNumber>,
    /// Latest publishable version number, if one exists. Always
    /// `<= latest_version`.
    pub latest_publishable: Option<VersionNumber>,
    /// Whether the working copy differs from the latest version, as computed
    /// by the store.
    pub working_copy_changed: bool,
}

/// Resolve a document's reference points. Does not require the lock.
///
/// # Errors
/// `NotFound` if the document id is unknown.
pub fn resolve(store: &dyn DocStore, doc_id: DocId) -> Result<ReferencePoints, StoreError> {
    let points = store.fetch_reference_points(doc_id)?;
    let working_copy = store.fetch_working_copy(doc_id)?;
    Ok(ReferencePoints {
        working_copy,
        latest_version: points.latest_version,
        latest_publishable: points.latest_publishable,
        working_copy_changed: points.working_copy_changed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::Actor;
    use crate::store::MemoryStore;

    #[test]
    fn unversioned_publishable_lineage_is_none() {
        let store = MemoryStore::new();
        let id = store.create_document("<T/>").expect("create");
        let points = resolve(&store, id).expect("resolve");
        assert_eq!(points.latest_version, Some(VersionNumber::FIRST));
        assert_eq!(points.latest_publishable, None);
        assert!(!points.working_copy_changed);
        assert_eq!(points.working_copy, "<T/>");
    }

    #[test]
    fn publishable_never_exceeds_latest() {
        let store = MemoryStore::new();
        let id = store.create_document("<T>1</T>").expect("create");
        let importer = Actor::new("importer").expect("valid");
        store.check_out(id, &importer).expect("checkout");
        store.save_version(id, "<T>2</T>", true, false).expect("save");
        store.save_version(id, "<T>3</T>", false, true).expect("save");

        let points = resolve(&store, id).expect("resolve");
        assert!(points.latest_publishable <= points.latest_version);
        assert_eq!(points.latest_publishable.map(VersionNumber::get), Some(2));
        assert_eq!(points.latest_version.map(VersionNumber::get), Some(3));
    }

    #[test]
    fn unknown_document_propagates_not_found() {
        let store = MemoryStore::new();
        let ghost = DocId::new(404).expect("valid id");
        assert!(matches!(
            resolve(&store, ghost),
            Err(StoreError::NotFound { .. })
        ));
    }
}
