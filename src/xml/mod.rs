//! XML handling for the merge core.
//!
//! Everything operates on [`tree::Element`], an owned parsed tree built with
//! `quick-xml`. There is deliberately no string-splicing anywhere in this
//! module: subtree extraction and substitution are structural operations on
//! the tree, and serialization is deterministic.

pub mod normalize;
pub mod preserve;
pub mod subset;
pub mod tree;

use std::fmt;

pub use normalize::{digest, equal, normalize};
pub use preserve::preserve;
pub use subset::{ElementSubset, SubsetExtractor};
pub use tree::{Element, Node};

// ---------------------------------------------------------------------------
// XmlError
// ---------------------------------------------------------------------------

/// A document could not be parsed into (or rebuilt from) an element tree.
#[derive(Debug)]
pub enum XmlError {
    /// The underlying parser rejected the input.
    Parse(quick_xml::Error),

    /// An attribute was malformed.
    Attr(quick_xml::events::attributes::AttrError),

    /// Raw bytes (CDATA) were not valid UTF-8.
    Encoding(std::str::Utf8Error),

    /// The input contained no root element.
    NoRootElement,

    /// The input contained more than one top-level element.
    MultipleRoots,

    /// A closing tag appeared with no matching open element.
    Unbalanced,
}

impl fmt::Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "malformed XML: {err}"),
            Self::Attr(err) => write!(f, "malformed XML attribute: {err}"),
            Self::Encoding(err) => write!(f, "XML content is not valid UTF-8: {err}"),
            Self::NoRootElement => f.write_str("document has no root element"),
            Self::MultipleRoots => f.write_str("document has more than one root element"),
            Self::Unbalanced => f.write_str("document has unbalanced tags"),
        }
    }
}

impl std::error::Error for XmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Attr(err) => Some(err),
            Self::Encoding(err) => Some(err),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for XmlError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Attr(err)
    }
}

impl From<std::str::Utf8Error> for XmlError {
    fn from(err: std::str::Utf8Error) -> Self {
        Self::Encoding(err)
    }
}
