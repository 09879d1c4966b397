//! JSON-file-backed document store.
//!
//! One JSON file per document under `<root>/docs/`, plus a `next-id` counter
//! file. Every mutation rewrites the document file through a temp-file
//! rename, so a crash mid-write never leaves a half-written document behind.
//! Version history inside each file is append-only.
//!
//! This is the store the CLI runs against; it deliberately shares its
//! per-document state machine ([`StoredDocument`]) with [`MemoryStore`]
//! (../memory.rs) so both enforce identical lock and versioning rules.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::model::types::{Actor, DocId, VersionNumber};

use super::{DocStore, StoreRefPoints, StoredDocument, now_epoch_secs};

#[cfg(doc)]
use super::MemoryStore;

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// File-backed [`DocStore`] rooted at a directory.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (or initialize) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns an I/O error if the directory layout cannot be created.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root.join("docs"))?;
        let counter = root.join("next-id");
        if !counter.exists() {
            fs::write(&counter, "0")?;
        }
        Ok(Self {
            root: root.to_owned(),
        })
    }

    fn doc_path(&self, doc_id: DocId) -> PathBuf {
        self.root.join("docs").join(format!("{}.json", doc_id.get()))
    }

    fn load(&self, doc_id: DocId) -> Result<StoredDocument, StoreError> {
        let path = self.doc_path(doc_id);
        if !path.exists() {
            return Err(StoreError::NotFound { doc_id });
        }
        let bytes = fs::read_to_string(&path)?;
        serde_json::from_str(&bytes).map_err(|err| StoreError::Corrupt {
            path,
            detail: err.to_string(),
        })
    }

    fn persist(&self, doc_id: DocId, doc: &StoredDocument) -> Result<(), StoreError> {
        let path = self.doc_path(doc_id);
        let json = serde_json::to_string_pretty(doc).map_err(|err| StoreError::Corrupt {
            path: path.clone(),
            detail: err.to_string(),
        })?;
        write_atomic(&path, json.as_bytes())
    }

    fn allocate_id(&self) -> Result<DocId, StoreError> {
        let counter = self.root.join("next-id");
        let raw = fs::read_to_string(&counter)?;
        let last: u32 = raw.trim().parse().map_err(|_| StoreError::Corrupt {
            path: counter.clone(),
            detail: format!("next-id file holds '{}', expected an integer", raw.trim()),
        })?;
        let id = DocId::new(last + 1).map_err(|err| StoreError::Corrupt {
            path: counter.clone(),
            detail: err.to_string(),
        })?;
        write_atomic(&counter, id.get().to_string().as_bytes())?;
        Ok(id)
    }
}

/// Write via temp file + rename so readers never see a partial file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl DocStore for JsonFileStore {
    fn fetch_reference_points(&self, doc_id: DocId) -> Result<StoreRefPoints, StoreError> {
        Ok(self.load(doc_id)?.reference_points())
    }

    fn check_out(&self, doc_id: DocId, actor: &Actor) -> Result<String, StoreError> {
        let mut doc = self.load(doc_id)?;
        let content = doc.check_out(doc_id, actor)?;
        self.persist(doc_id, &doc)?;
        Ok(content)
    }

    fn fetch_working_copy(&self, doc_id: DocId) -> Result<String, StoreError> {
        Ok(self.load(doc_id)?.working_copy)
    }

    fn fetch_version(&self, doc_id: DocId, number: VersionNumber) -> Result<String, StoreError> {
        self.load(doc_id)?.fetch_version(doc_id, number)
    }

    fn save_version(
        &self,
        doc_id: DocId,
        content: &str,
        publishable: bool,
        check_in: bool,
    ) -> Result<VersionNumber, StoreError> {
        let mut doc = self.load(doc_id)?;
        let number = doc.save_version(doc_id, content, publishable, check_in, None)?;
        self.persist(doc_id, &doc)?;
        Ok(number)
    }

    fn unlock(&self, doc_id: DocId, actor: &Actor) -> Result<(), StoreError> {
        let mut doc = self.load(doc_id)?;
        doc.unlock(doc_id, actor)?;
        self.persist(doc_id, &doc)
    }

    fn create_document(&self, content: &str) -> Result<DocId, StoreError> {
        let doc_id = self.allocate_id()?;
        let doc = StoredDocument::new(content, now_epoch_secs());
        self.persist(doc_id, &doc)?;
        Ok(doc_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
