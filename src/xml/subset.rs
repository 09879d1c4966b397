//! Significant-subset extraction: the opaque collaborator the merge engine
//! uses to decide whether an update needs curator review.
//!
//! The repository's publication pipeline indexes only part of a document.
//! An update that changes any of those fields warrants a human look before
//! the next publication cycle; cosmetic churn does not. The extractor pulls
//! the significant fields into a small canonical document so the engine can
//! compare fingerprints.

use super::XmlError;
use super::normalize::canonicalize;
use super::tree::{Element, Node};

/// Extracts the semantically significant subset of a document.
///
/// Implementations must be pure: the same input always yields the same
/// output, and extraction never depends on ambient state.
pub trait SubsetExtractor {
    /// Return a canonical serialization of the significant fields.
    ///
    /// # Errors
    /// Returns an error if `xml` cannot be parsed.
    fn extract(&self, xml: &str) -> Result<String, XmlError>;
}

// ---------------------------------------------------------------------------
// ElementSubset
// ---------------------------------------------------------------------------

/// Default extractor: collects named elements into a canonical wrapper
/// document.
///
/// For each configured tag the first matching element (document order) is
/// cloned into the subset; missing tags contribute nothing, so two documents
/// that both lack a tag compare equal on it.
#[derive(Clone, Debug)]
pub struct ElementSubset {
    tags: Vec<String>,
}

impl ElementSubset {
    /// Build an extractor over the given element names.
    #[must_use]
    pub const fn new(tags: Vec<String>) -> Self {
        Self { tags }
    }
}

impl SubsetExtractor for ElementSubset {
    fn extract(&self, xml: &str) -> Result<String, XmlError> {
        let root = Element::parse(xml)?;
        let mut subset = Element::new("SignificantSubset");
        for tag in &self.tags {
            if let Some(found) = root.find(tag) {
                subset.children.push(Node::Element(found.clone()));
            }
        }
        canonicalize(&mut subset);
        Ok(subset.to_xml())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
