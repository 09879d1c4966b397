//! Shared test helpers for trialfold integration tests.
//!
//! Builders for feed and curated protocol documents, plus a standard engine
//! fixture configured the way a production batch run would be.

#![allow(dead_code)]

use trialfold::merge::{MergeEngine, StatusHold};
use trialfold::model::types::{Actor, DocId, ExternalId, ExternalRecord};
use trialfold::store::{DocStore, MemoryStore};
use trialfold::xml::ElementSubset;

/// Curated subtrees the importer must never overwrite.
pub const PRESERVED_TAGS: &[&str] = &["PDQIndexing", "PDQProtocolIDs", "ProtocolProcessingDetails"];

/// Elements whose change routes a record to curator review.
pub const SIGNIFICANT_TAGS: &[&str] = &["OverallStatus", "BriefSummary"];

/// A trial document as the feed delivers it (no curated sections).
pub fn feed_doc(status: &str, summary: &str) -> String {
    format!(
        "<Trial>\
         <OverallStatus>{status}</OverallStatus>\
         <BriefSummary>{summary}</BriefSummary>\
         <Sponsor>Feed Sponsor</Sponsor>\
         </Trial>"
    )
}

/// A trial document as curators leave it: feed content plus a curated
/// indexing section.
pub fn curated_doc(status: &str, summary: &str, indexing: &str) -> String {
    format!(
        "<Trial>\
         <OverallStatus>{status}</OverallStatus>\
         <BriefSummary>{summary}</BriefSummary>\
         <Sponsor>Feed Sponsor</Sponsor>\
         <PDQIndexing>{indexing}</PDQIndexing>\
         </Trial>"
    )
}

/// The standard engine fixture: production preserved tags, significance over
/// status and summary, and a terminal-status review hold.
pub fn engine() -> MergeEngine {
    MergeEngine::new(
        actor("ctimport"),
        PRESERVED_TAGS.iter().map(|&t| t.to_owned()).collect(),
        Box::new(ElementSubset::new(
            SIGNIFICANT_TAGS.iter().map(|&t| t.to_owned()).collect(),
        )),
    )
    .with_rule(Box::new(StatusHold::new(
        "OverallStatus".to_owned(),
        vec!["Withdrawn".to_owned(), "Terminated".to_owned()],
    )))
}

pub fn actor(name: &str) -> Actor {
    Actor::new(name).expect("valid actor")
}

pub fn record(external_id: &str, doc_id: Option<DocId>, content: &str) -> ExternalRecord {
    ExternalRecord {
        external_id: ExternalId::new(external_id).expect("valid external id"),
        doc_id,
        content: content.to_owned(),
    }
}

/// A store seeded with one curated document; returns the store and its id.
pub fn seeded_store(content: &str) -> (MemoryStore, DocId) {
    let store = MemoryStore::new();
    let id = store.create_document(content).expect("create document");
    (store, id)
}
