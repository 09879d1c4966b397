//! Owned XML element tree: parse with `quick-xml`, structural find/replace,
//! deterministic serialization.
//!
//! The tree keeps only what the merge core needs: element names, attributes
//! in source order, and child nodes (elements and text). Comments, processing
//! instructions, and the XML declaration are dropped on parse — none of them
//! carry document content in this repository, and dropping them keeps
//! equality comparisons stable.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use super::XmlError;

// ---------------------------------------------------------------------------
// Node / Element
// ---------------------------------------------------------------------------

/// One node in the tree: a child element or a run of character data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element: name, attributes (source order), children (document
/// order).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    /// Tag name, as written in the source.
    pub name: String,
    /// Attribute name/value pairs in source order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// An empty element with the given tag name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a document and return its root element.
    ///
    /// # Errors
    /// Returns an error for malformed XML, missing/multiple roots, or
    /// non-UTF-8 CDATA content.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::Unbalanced)?;
                    attach(&mut stack, &mut root, Node::Element(element))?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?.into_owned();
                    if let Some(top) = stack.last_mut() {
                        top.children.push(Node::Text(text));
                    } else if !text.trim().is_empty() {
                        return Err(XmlError::NoRootElement);
                    }
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    let text = std::str::from_utf8(&bytes)?.to_owned();
                    if let Some(top) = stack.last_mut() {
                        top.children.push(Node::Text(text));
                    }
                }
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Unbalanced);
        }
        root.ok_or(XmlError::NoRootElement)
    }

    /// Serialize the tree. Deterministic: the same tree always produces the
    /// same bytes. No XML declaration, no indentation.
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(element) => element.write(out),
                Node::Text(text) => out.push_str(&escape(text.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Find the first element named `name` in document order, including
    /// this element itself.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        if self.name == name {
            return Some(self);
        }
        for child in &self.children {
            if let Node::Element(element) = child
                && let Some(found) = element.find(name)
            {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated character data of the first element named `name`,
    /// if present.
    #[must_use]
    pub fn find_text(&self, name: &str) -> Option<String> {
        self.find(name).map(Self::text)
    }

    /// All character data under this element, concatenated in document order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    /// Replace the first descendant named `name` (document order, not
    /// counting this element) with `replacement`. Returns whether a
    /// replacement happened.
    pub fn replace_descendant(&mut self, name: &str, replacement: Self) -> bool {
        let mut slot = Some(replacement);
        self.replace_descendant_inner(name, &mut slot)
    }

    fn replace_descendant_inner(&mut self, name: &str, slot: &mut Option<Self>) -> bool {
        for child in &mut self.children {
            if let Node::Element(element) = child {
                if element.name == name {
                    if let Some(replacement) = slot.take() {
                        *element = replacement;
                    }
                    return true;
                }
                if element.replace_descendant_inner(name, slot) {
                    return true;
                }
            }
        }
        false
    }

    /// Remove the first descendant named `name` (document order, not
    /// counting this element). Returns whether a node was removed.
    pub fn remove_descendant(&mut self, name: &str) -> bool {
        for index in 0..self.children.len() {
            if let Node::Element(element) = &mut self.children[index] {
                if element.name == name {
                    self.children.remove(index);
                    return true;
                }
                if element.remove_descendant(name) {
                    return true;
                }
            }
        }
        false
    }
}

/// Build an [`Element`] shell (no children yet) from a start tag.
fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_owned();
        let value = attr.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

/// Attach a completed node to the enclosing element, or install it as the
/// document root when the stack is empty.
fn attach(stack: &mut [Element], root: &mut Option<Element>, node: Node) -> Result<(), XmlError> {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
        return Ok(());
    }
    match node {
        Node::Element(element) => {
            if root.is_some() {
                return Err(XmlError::MultipleRoots);
            }
            *root = Some(element);
            Ok(())
        }
        Node::Text(_) => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
