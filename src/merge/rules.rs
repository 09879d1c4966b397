//! Business rules evaluated against document content during a merge.
//!
//! The Subtree Preserver carries curated sections across mechanically; these
//! rules are the deliberate exceptions — a caller-supplied policy may add,
//! remove, or rewrite a flagged block, or route the record to curator review,
//! based on what the document says. The engine applies every configured rule
//! to each merged candidate before saving.

use crate::xml::Element;

// ---------------------------------------------------------------------------
// CurationRule
// ---------------------------------------------------------------------------

/// A content-driven policy hook applied during merge.
///
/// Implementations must be pure with respect to the document: the same tree
/// always produces the same decision.
pub trait CurationRule {
    /// Stable identifier used in log events.
    fn name(&self) -> &'static str;

    /// Mutate a merged candidate in place. Return `true` if the document
    /// changed. Default: no rewrite.
    fn rewrite(&self, doc: &mut Element) -> bool {
        let _ = doc;
        false
    }

    /// Whether this record should be routed to curator review, judged from
    /// the external content. Default: no hold.
    fn review_hold(&self, doc: &Element) -> bool {
        let _ = doc;
        false
    }
}

// ---------------------------------------------------------------------------
// StatusHold
// ---------------------------------------------------------------------------

/// Flags records whose overall status has reached a terminal value
/// (withdrawn, terminated) for curator review before the next publication
/// cycle.
#[derive(Clone, Debug)]
pub struct StatusHold {
    status_tag: String,
    terminal: Vec<String>,
}

impl StatusHold {
    /// Build a hold over `status_tag`, triggering on any of the given
    /// terminal values (compared case-insensitively, whitespace-trimmed).
    #[must_use]
    pub const fn new(status_tag: String, terminal: Vec<String>) -> Self {
        Self {
            status_tag,
            terminal,
        }
    }
}

impl CurationRule for StatusHold {
    fn name(&self) -> &'static str {
        "status-hold"
    }

    fn review_hold(&self, doc: &Element) -> bool {
        doc.find_text(&self.status_tag).is_some_and(|text| {
            let status = text.trim();
            self.terminal
                .iter()
                .any(|terminal| terminal.eq_ignore_ascii_case(status))
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn hold() -> StatusHold {
        StatusHold::new(
            "OverallStatus".to_owned(),
            vec!["Withdrawn".to_owned(), "Terminated".to_owned()],
        )
    }

    #[test]
    fn terminal_status_triggers_hold() {
        let doc =
            Element::parse("<Trial><OverallStatus> TERMINATED </OverallStatus></Trial>")
                .expect("parse");
        assert!(hold().review_hold(&doc));
    }

    #[test]
    fn active_status_passes() {
        let doc = Element::parse("<Trial><OverallStatus>Recruiting</OverallStatus></Trial>")
            .expect("parse");
        assert!(!hold().review_hold(&doc));
    }

    #[test]
    fn missing_status_passes() {
        let doc = Element::parse("<Trial><Title>x</Title></Trial>").expect("parse");
        assert!(!hold().review_hold(&doc));
    }
}
