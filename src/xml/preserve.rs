//! Subtree Preserver: carry curator-maintained sections across an external
//! replacement document.
//!
//! The registry feed supplies a complete replacement for a document, but it
//! knows nothing about the sections curators maintain inside the repository
//! (indexing blocks, processing-status details, special-category markers).
//! [`preserve`] transplants those sections from the prior snapshot into the
//! candidate:
//!
//! - If the prior snapshot has the section, it replaces the candidate's slot
//!   element of the same name (the import transform leaves an empty slot), or
//!   is appended under the candidate root when no slot exists.
//! - If the prior snapshot lacks the section, the candidate's empty slot is
//!   removed so no placeholder residue survives.
//!
//! Pure function: the source snapshot is never modified, and identical inputs
//! produce byte-identical output.

use super::XmlError;
use super::tree::{Element, Node};

/// Fold the named subtrees of `source` into `candidate` and return the merged
/// document.
///
/// Each tag matches at most one subtree (first match in document order).
///
/// # Errors
/// Returns an error if either document cannot be parsed.
pub fn preserve(tags: &[String], source: &str, candidate: &str) -> Result<String, XmlError> {
    let source = Element::parse(source)?;
    let mut merged = Element::parse(candidate)?;

    for tag in tags {
        match source.find(tag) {
            Some(subtree) => {
                let subtree = subtree.clone();
                if !merged.replace_descendant(tag, subtree.clone()) {
                    merged.children.push(Node::Element(subtree));
                }
            }
            None => {
                merged.remove_descendant(tag);
            }
        }
    }

    Ok(merged.to_xml())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|&name| name.to_owned()).collect()
    }

    #[test]
    fn curated_subtree_survives_replacement() {
        let source = "<Trial><Title>old</Title>\
                      <PDQIndexing><Term>leukemia</Term></PDQIndexing></Trial>";
        let candidate = "<Trial><Title>new</Title><PDQIndexing/></Trial>";
        let merged =
            preserve(&tags(&["PDQIndexing"]), source, candidate).expect("merge");
        assert_eq!(
            merged,
            "<Trial><Title>new</Title><PDQIndexing><Term>leukemia</Term></PDQIndexing></Trial>"
        );
    }

    #[test]
    fn missing_subtree_leaves_no_residue() {
        let source = "<Trial><Title>old</Title></Trial>";
        let candidate = "<Trial><Title>new</Title><PDQIndexing/></Trial>";
        let merged =
            preserve(&tags(&["PDQIndexing"]), source, candidate).expect("merge");
        assert_eq!(merged, "<Trial><Title>new</Title></Trial>");
    }

    #[test]
    fn subtree_without_slot_is_appended() {
        let source = "<Trial><ProcessingDetails state=\"review\"/></Trial>";
        let candidate = "<Trial><Title>new</Title></Trial>";
        let merged =
            preserve(&tags(&["ProcessingDetails"]), source, candidate).expect("merge");
        assert_eq!(
            merged,
            "<Trial><Title>new</Title><ProcessingDetails state=\"review\"/></Trial>"
        );
    }

    #[test]
    fn source_is_untouched_and_output_is_stable() {
        let source = "<Trial><A>1</A><B>2</B></Trial>";
        let candidate = "<Trial><A/><B/></Trial>";
        let names = tags(&["A", "B"]);
        let first = preserve(&names, source, candidate).expect("merge");
        let second = preserve(&names, source, candidate).expect("merge");
        assert_eq!(first, second);
        assert_eq!(first, "<Trial><A>1</A><B>2</B></Trial>");
    }

    #[test]
    fn several_tags_are_independent() {
        let source = "<Trial><A>kept</A></Trial>";
        let candidate = "<Trial><New/><A/><B/></Trial>";
        let merged = preserve(&tags(&["A", "B"]), source, candidate).expect("merge");
        assert_eq!(merged, "<Trial><New/><A>kept</A></Trial>");
    }
}
