//! Change Normalizer: canonical XML form for equality comparison.
//!
//! Two snapshots of a document are "the same" when they differ only in
//! insignificant ways: whitespace runs, attribute order, entity/encoding
//! form, self-closing versus empty-pair tags. [`normalize`] maps both onto
//! one canonical serialization so equality is a byte comparison.
//!
//! The transform is idempotent and never touches semantic content: text is
//! whitespace-collapsed, attributes are sorted byte-wise by name, and
//! serialization comes from [`Element::to_xml`], which is already
//! deterministic.

use sha2::{Digest as _, Sha256};

use super::XmlError;
use super::tree::{Element, Node};

/// Canonicalize a document for comparison.
///
/// # Errors
/// Returns an error if `xml` cannot be parsed.
pub fn normalize(xml: &str) -> Result<String, XmlError> {
    let mut root = Element::parse(xml)?;
    canonicalize(&mut root);
    Ok(root.to_xml())
}

/// Whether two documents are equal up to insignificant differences.
///
/// # Errors
/// Returns an error if either document cannot be parsed.
pub fn equal(a: &str, b: &str) -> Result<bool, XmlError> {
    Ok(normalize(a)? == normalize(b)?)
}

/// Lowercase-hex SHA-256 of the canonical form — a cheap fingerprint for
/// logging and change detection.
///
/// # Errors
/// Returns an error if `xml` cannot be parsed.
pub fn digest(xml: &str) -> Result<String, XmlError> {
    let canonical = normalize(xml)?;
    let hash = Sha256::digest(canonical.as_bytes());
    Ok(hash.iter().fold(String::with_capacity(64), |mut out, byte| {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
        out
    }))
}

/// Canonicalize a parsed tree in place: sort attributes, merge adjacent text
/// nodes, collapse whitespace, drop whitespace-only text.
pub(crate) fn canonicalize(element: &mut Element) {
    element.attributes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut children: Vec<Node> = Vec::with_capacity(element.children.len());
    for child in element.children.drain(..) {
        match child {
            Node::Text(text) => {
                // Merge with a preceding text node so CDATA boundaries don't
                // split a whitespace run.
                if let Some(Node::Text(prev)) = children.last_mut() {
                    prev.push_str(&text);
                } else {
                    children.push(Node::Text(text));
                }
            }
            Node::Element(mut inner) => {
                canonicalize(&mut inner);
                children.push(Node::Element(inner));
            }
        }
    }

    element.children = children
        .into_iter()
        .filter_map(|child| match child {
            Node::Text(text) => {
                let collapsed = collapse_whitespace(&text);
                if collapsed.is_empty() {
                    None
                } else {
                    Some(Node::Text(collapsed))
                }
            }
            element @ Node::Element(_) => Some(element),
        })
        .collect();
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn whitespace_and_attribute_order_are_insignificant() {
        let a = "<T b=\"2\" a=\"1\">\n  <X>hello   world</X>\n</T>";
        let b = r#"<T a="1" b="2"><X>hello world</X></T>"#;
        assert!(equal(a, b).expect("parse"));
        assert_eq!(normalize(a).expect("parse"), b);
    }

    #[test]
    fn empty_pair_and_self_closing_are_equal() {
        assert!(equal("<T><A></A></T>", "<T><A/></T>").expect("parse"));
    }

    #[test]
    fn semantic_text_differences_survive() {
        assert!(!equal("<T>alpha</T>", "<T>beta</T>").expect("parse"));
        assert!(!equal("<T a=\"1\"/>", "<T a=\"2\"/>").expect("parse"));
    }

    #[test]
    fn normalize_is_idempotent() {
        let xml = "<T  b=\"x &amp; y\"  a=\"1\" >  text  <U/>\n</T>";
        let once = normalize(xml).expect("parse");
        let twice = normalize(&once).expect("parse");
        assert_eq!(once, twice);
    }

    #[test]
    fn digest_tracks_normalized_equality() {
        let a = digest("<T a=\"1\" b=\"2\"/>").expect("parse");
        let b = digest("<T b=\"2\" a=\"1\"/>").expect("parse");
        let c = digest("<T a=\"1\" b=\"3\"/>").expect("parse");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    fn arb_tag() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9]{0,7}"
    }

    fn arb_text() -> impl Strategy<Value = String> {
        "[ a-z<&\n]{0,20}"
    }

    proptest! {
        #[test]
        fn normalize_idempotent_for_generated_docs(
            root in arb_tag(),
            child in arb_tag(),
            text in arb_text(),
            attr in "[a-z]{1,5}",
            value in "[ -~]{0,10}",
        ) {
            let escaped = quick_xml::escape::escape(text.as_str());
            let escaped_value = quick_xml::escape::escape(value.as_str());
            let xml = format!(
                "<{root} {attr}=\"{escaped_value}\">{escaped}<{child}/></{root}>"
            );
            let once = normalize(&xml).expect("generated doc parses");
            let twice = normalize(&once).expect("normalized doc parses");
            prop_assert_eq!(once, twice);
        }
    }
}
