//! Merge Engine: fold one external record into the repository.
//!
//! One invocation produces zero, one, or two new versions for an existing
//! document (a preserved pre-merge working copy and/or a new publishable
//! version, then the merged working copy), or creates a brand-new document
//! when the record maps to none. The sequence for an existing document:
//!
//! 1. **Acquire** the document's lock; a conflict terminates the operation
//!    with `lock_conflict` set and nothing written.
//! 2. **Snapshot** the pre-merge working copy and its diverged flag.
//! 3. **Build** the merged working-copy candidate (curated subtrees folded
//!    into the external content, curation rules applied).
//! 4. **Preserve** the diverged working copy as a non-publishable version
//!    before anything overwrites it.
//! 5. **Update the publishable lineage** when one exists: build a candidate
//!    from the latest publishable version, flag `needs_review` when the
//!    significant subset changed, and save — unless the lineage is already
//!    up to date. A validation rejection here is recorded on the outcome and
//!    never blocks the working-copy branch.
//! 6. **Save** the merged working copy, unless those bytes were already
//!    persisted by an earlier step.
//! 7. **Release** the lock on every path that got past step 1.
//!
//! Re-running the engine with identical external content is a no-op: every
//! save is gated on a normalized-equality check against what is already
//! persisted.

use tracing::{debug, info, warn};

use crate::error::{MergeError, StoreError};
use crate::model::outcome::MergeOutcome;
use crate::model::types::{Actor, DocId, ExternalRecord};
use crate::store::{CheckoutGuard, DocStore};
use crate::xml::{self, Element, SubsetExtractor, preserve};

use super::rules::CurationRule;

// ---------------------------------------------------------------------------
// MergeEngine
// ---------------------------------------------------------------------------

/// Applies external records to the document store.
pub struct MergeEngine {
    actor: Actor,
    preserved_tags: Vec<String>,
    subset: Box<dyn SubsetExtractor>,
    rules: Vec<Box<dyn CurationRule>>,
}

impl MergeEngine {
    /// Build an engine that locks documents as `actor`, preserves the given
    /// curated subtrees, and judges review-worthiness with `subset`.
    #[must_use]
    pub fn new(actor: Actor, preserved_tags: Vec<String>, subset: Box<dyn SubsetExtractor>) -> Self {
        Self {
            actor,
            preserved_tags,
            subset,
            rules: Vec::new(),
        }
    }

    /// Add a curation rule, applied to every merged candidate.
    #[must_use]
    pub fn with_rule(mut self, rule: Box<dyn CurationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Apply one external record: create a new document or merge into the
    /// mapped one.
    ///
    /// Lock conflicts and publishable-branch validation rejections are
    /// reported on the returned outcome, not as errors.
    ///
    /// # Errors
    /// Returns an error for unparseable content or store failures outside
    /// the two categories above. The lock is released on every error path
    /// reached after acquisition.
    pub fn merge(
        &self,
        store: &dyn DocStore,
        record: &ExternalRecord,
    ) -> Result<MergeOutcome, MergeError> {
        let external = Element::parse(&record.content)?;
        match record.doc_id {
            None => self.add_document(store, record, &external),
            Some(doc_id) => self.merge_existing(store, doc_id, record, &external),
        }
    }

    /// New-document path: nothing to preserve, a single initial version.
    /// Promotion to publishable is a later, separate decision. The creation
    /// call leaves the document unlocked.
    fn add_document(
        &self,
        store: &dyn DocStore,
        record: &ExternalRecord,
        external: &Element,
    ) -> Result<MergeOutcome, MergeError> {
        let mut outcome = MergeOutcome {
            is_new_document: true,
            needs_review: self.review_hold(external),
            versions_written: 1,
            ..MergeOutcome::default()
        };
        let doc_id = store.create_document(&record.content)?;
        outcome.doc_id = Some(doc_id);
        info!(
            external_id = %record.external_id,
            %doc_id,
            "created document from external record"
        );
        Ok(outcome)
    }

    fn merge_existing(
        &self,
        store: &dyn DocStore,
        doc_id: DocId,
        record: &ExternalRecord,
        external: &Element,
    ) -> Result<MergeOutcome, MergeError> {
        let mut outcome = MergeOutcome::for_doc(doc_id);

        // Step 1: acquire. A conflict is an outcome, not an error.
        let (guard, working_copy) = match CheckoutGuard::acquire(store, doc_id, &self.actor) {
            Ok(pair) => pair,
            Err(StoreError::LockConflict { holder, .. }) => {
                warn!(
                    %doc_id,
                    external_id = %record.external_id,
                    %holder,
                    "document locked by another actor; skipping record"
                );
                outcome.lock_conflict = true;
                return Ok(outcome);
            }
            Err(err) => return Err(err.into()),
        };

        // Step 2: reference points, captured before any mutation.
        let points = store.fetch_reference_points(doc_id)?;

        outcome.needs_review = self.review_hold(external);

        // Step 3: merged working-copy candidate.
        let new_working_copy = self.build_candidate(&working_copy, &record.content)?;

        // Step 4: a diverged working copy holds someone's unsaved edits;
        // version it before it is overwritten.
        if points.working_copy_changed {
            let number = store.save_version(doc_id, &working_copy, false, false)?;
            outcome.working_copy_preserved = true;
            outcome.versions_written += 1;
            info!(%doc_id, %number, "preserved diverged working copy");
        }

        // The most recently persisted head content; used to skip redundant
        // saves. Step 4 re-persists the same bytes, so it never moves this.
        let mut head = working_copy.clone();

        // Step 5: publishable lineage.
        if let Some(last_pub) = points.latest_publishable {
            let pub_content = store.fetch_version(doc_id, last_pub)?;
            if self.subset_differs(&record.content, &pub_content)? {
                outcome.needs_review = true;
            }

            // When the working copy and the latest publishable version were
            // already identical, the two candidates coincide; reuse the
            // working-copy bytes instead of re-merging.
            let new_pub = if !points.working_copy_changed
                && points.latest_version == Some(last_pub)
            {
                new_working_copy.clone()
            } else {
                self.build_candidate(&pub_content, &record.content)?
            };

            if xml::equal(&new_pub, &pub_content)? {
                debug!(%doc_id, "publishable lineage unchanged; nothing to save");
            } else {
                match store.save_version(doc_id, &new_pub, true, false) {
                    Ok(number) => {
                        outcome.publishable_version_created = true;
                        outcome.versions_written += 1;
                        head = new_pub;
                        info!(%doc_id, %number, "created publishable version");
                    }
                    Err(StoreError::ValidationFailed { detail, .. }) => {
                        // The working-copy branch must still complete.
                        warn!(
                            %doc_id,
                            detail = %detail,
                            "store rejected publishable candidate"
                        );
                        outcome.publishable_rejection = Some(detail);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        } else if self.subset_differs(&record.content, &working_copy)? {
            // No publishable lineage yet: judge review-worthiness against
            // the current document instead.
            outcome.needs_review = true;
        }

        // Step 6: merged working copy, unless those bytes are already the
        // persisted head.
        if xml::equal(&new_working_copy, &head)? {
            debug!(%doc_id, "merged working copy already current; nothing to save");
        } else {
            let number = store.save_version(doc_id, &new_working_copy, false, false)?;
            outcome.versions_written += 1;
            info!(%doc_id, %number, "saved merged working copy");
        }

        // Step 7: release. Error paths above release through the guard's
        // drop; this surfaces unlock failures on the happy path.
        guard.release()?;
        Ok(outcome)
    }

    /// Fold curated subtrees from `source` into the external content, then
    /// apply curation rewrites.
    fn build_candidate(&self, source: &str, external: &str) -> Result<String, MergeError> {
        let merged = preserve(&self.preserved_tags, source, external)?;
        if self.rules.is_empty() {
            return Ok(merged);
        }
        let mut tree = Element::parse(&merged)?;
        let mut rewritten = false;
        for rule in &self.rules {
            if rule.rewrite(&mut tree) {
                debug!(rule = rule.name(), "curation rule rewrote candidate");
                rewritten = true;
            }
        }
        Ok(if rewritten { tree.to_xml() } else { merged })
    }

    fn subset_differs(&self, new: &str, old: &str) -> Result<bool, MergeError> {
        Ok(self.subset.extract(new)? != self.subset.extract(old)?)
    }

    fn review_hold(&self, external: &Element) -> bool {
        self.rules.iter().any(|rule| {
            let hold = rule.review_hold(external);
            if hold {
                debug!(rule = rule.name(), "curation rule requested review hold");
            }
            hold
        })
    }
}

// ---------------------------------------------------------------------------
// Tests — scenario coverage lives in tests/merge_scenarios.rs; these cover
// engine-internal behavior.
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ExternalId;
    use crate::store::MemoryStore;
    use crate::xml::ElementSubset;

    fn engine() -> MergeEngine {
        MergeEngine::new(
            Actor::new("importer").expect("valid"),
            vec!["PDQIndexing".to_owned()],
            Box::new(ElementSubset::new(vec!["OverallStatus".to_owned()])),
        )
    }

    fn record(doc_id: Option<DocId>, content: &str) -> ExternalRecord {
        ExternalRecord {
            external_id: ExternalId::new("NCT00000001").expect("valid"),
            doc_id,
            content: content.to_owned(),
        }
    }

    #[test]
    fn malformed_external_content_is_a_transform_error() {
        let store = MemoryStore::new();
        let err = engine().merge(&store, &record(None, "<Trial>"));
        assert!(matches!(err, Err(MergeError::Xml(_))));
    }

    #[test]
    fn unknown_target_document_propagates_not_found() {
        let store = MemoryStore::new();
        let ghost = DocId::new(404).expect("valid id");
        let err = engine().merge(&store, &record(Some(ghost), "<Trial/>"));
        assert!(matches!(
            err,
            Err(MergeError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[test]
    fn cosmetic_feed_changes_do_not_flag_review() {
        let store = MemoryStore::new();
        let id = store
            .create_document("<Trial><OverallStatus>Active</OverallStatus></Trial>")
            .expect("create");
        let outcome = engine()
            .merge(
                &store,
                &record(
                    Some(id),
                    "<Trial>\n  <OverallStatus>Active</OverallStatus>\n</Trial>",
                ),
            )
            .expect("merge");
        assert!(!outcome.needs_review);
    }

    #[test]
    fn significant_feed_changes_flag_review_without_publishable_lineage() {
        let store = MemoryStore::new();
        let id = store
            .create_document("<Trial><OverallStatus>Active</OverallStatus></Trial>")
            .expect("create");
        let outcome = engine()
            .merge(
                &store,
                &record(
                    Some(id),
                    "<Trial><OverallStatus>Completed</OverallStatus></Trial>",
                ),
            )
            .expect("merge");
        assert!(outcome.needs_review);
    }
}
