//! # XML Tree Module / XML 树模块
//!
//! A small, explicit XML tree used to read and rewrite build descriptors.
//! Every node owns its children; there are no parent back-references, so
//! queries and edits are plain recursive functions over `&Element` and
//! `&mut Element`.
//!
//! 用于读取和重写构建描述文件的小型显式 XML 树。
//! 每个节点拥有其子节点，没有父节点反向引用。

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use std::fmt::Write as _;
use thiserror::Error;

/// Errors raised while parsing a document.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("document ended while <{0}> was still open")]
    UnexpectedEof(String),
    #[error("document has more than one root element")]
    MultipleRoots,
    #[error("document has no root element")]
    NoRoot,
}

/// A single node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Unescaped character data.
    Text(String),
    CData(String),
    /// Raw comment body, without the `<!--`/`-->` delimiters.
    Comment(String),
    ProcessingInstruction(String),
    /// Raw declaration body, e.g. `xml version="1.0" encoding="UTF-8"`.
    Declaration(String),
    DocType(String),
}

/// An element with its attributes (unescaped values) and ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A parsed document: the prolog, exactly one root element, and any trailing
/// comments or processing instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    root: usize,
    /// The input started with a UTF-8 byte order mark.
    bom: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builds `<name>text</name>`.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(Node::Text(text.into()));
        element
    }

    /// Builder-style child append, without any layout handling.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// The element name without a namespace prefix.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is(&self, name: &str) -> bool {
        self.local_name() == name
    }

    /// Iterates over the direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First direct child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.is(name))
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|element| element.is(name))
    }

    /// Concatenated text and CDATA content, trimmed.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                Node::Text(t) | Node::CData(t) => text.push_str(t),
                _ => {}
            }
        }
        text.trim().to_string()
    }

    /// Trimmed text of the named child, if the child exists.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(Element::text)
    }

    /// Replaces every child with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    /// Returns the named child, appending an empty one first if it is missing.
    pub fn ensure_child(&mut self, name: &str) -> &mut Element {
        let index = match self.position_of(name) {
            Some(index) => index,
            None => self.append_child(Element::new(name)),
        };
        match &mut self.children[index] {
            Node::Element(element) => element,
            _ => unreachable!("index points at an element"),
        }
    }

    /// Appends a child element and returns its index in `children`.
    ///
    /// When the element is already laid out with whitespace between its
    /// children, the new child is indented like its first sibling and placed
    /// before the whitespace that precedes the closing tag.
    pub fn append_child(&mut self, child: Element) -> usize {
        let indent = self.child_indent();
        let trailing = match self.children.last() {
            Some(Node::Text(t)) if t.trim().is_empty() => Some(self.children.len() - 1),
            _ => None,
        };

        match (indent, trailing) {
            (Some(indent), Some(trailing)) => {
                self.children.insert(trailing, Node::Text(indent));
                self.children.insert(trailing + 1, Node::Element(child));
                trailing + 1
            }
            _ => {
                self.children.push(Node::Element(child));
                self.children.len() - 1
            }
        }
    }

    fn position_of(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(element) if element.is(name)))
    }

    /// The whitespace that precedes the first child element, if any.
    fn child_indent(&self) -> Option<String> {
        let first = self
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(_)))?;
        match first.checked_sub(1).map(|i| &self.children[i]) {
            Some(Node::Text(t)) if t.trim().is_empty() && t.contains('\n') => Some(t.clone()),
            _ => None,
        }
    }
}

impl Document {
    /// Parses a complete document. A leading byte order mark is kept for
    /// serialization.
    pub fn parse(input: &str) -> Result<Self, XmlError> {
        let (bom, input) = match input.strip_prefix('\u{feff}') {
            Some(rest) => (true, rest),
            None => (false, input),
        };
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(false);

        let mut nodes = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader.read_event().map_err(|e| XmlError::Syntax {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;

            let node = match event {
                Event::Start(start) => {
                    stack.push(open_element(&start, &reader)?);
                    continue;
                }
                Event::Empty(start) => Node::Element(open_element(&start, &reader)?),
                Event::End(_) => match stack.pop() {
                    Some(element) => Node::Element(element),
                    None => {
                        return Err(XmlError::Syntax {
                            position: reader.buffer_position() as u64,
                            message: "closing tag without an open element".to_string(),
                        });
                    }
                },
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| XmlError::Syntax {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })?;
                    Node::Text(text.into_owned())
                }
                Event::CData(data) => Node::CData(String::from_utf8_lossy(&data).into_owned()),
                Event::Comment(comment) => {
                    Node::Comment(String::from_utf8_lossy(&comment).into_owned())
                }
                Event::Decl(decl) => Node::Declaration(String::from_utf8_lossy(&decl).into_owned()),
                Event::PI(pi) => {
                    Node::ProcessingInstruction(String::from_utf8_lossy(&pi).into_owned())
                }
                Event::DocType(doctype) => {
                    Node::DocType(String::from_utf8_lossy(&doctype).into_owned())
                }
                Event::Eof => break,
            };

            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
                continue;
            }

            if matches!(node, Node::Element(_)) {
                if root.is_some() {
                    return Err(XmlError::MultipleRoots);
                }
                root = Some(nodes.len());
            }
            nodes.push(node);
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::UnexpectedEof(open.name));
        }
        let root = root.ok_or(XmlError::NoRoot)?;
        Ok(Self { nodes, root, bom })
    }

    pub fn root(&self) -> &Element {
        match &self.nodes[self.root] {
            Node::Element(element) => element,
            _ => unreachable!("root index always points at an element"),
        }
    }

    pub fn root_mut(&mut self) -> &mut Element {
        match &mut self.nodes[self.root] {
            Node::Element(element) => element,
            _ => unreachable!("root index always points at an element"),
        }
    }

    /// Serializes the tree back into a well-formed document.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        if self.bom {
            out.push('\u{feff}');
        }
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }
}

fn open_element(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Element, XmlError> {
    let syntax = |message: String| XmlError::Syntax {
        position: reader.buffer_position() as u64,
        message,
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| syntax(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| syntax(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Element(element) => write_element(out, element),
        Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        Node::CData(data) => {
            let _ = write!(out, "<![CDATA[{data}]]>");
        }
        Node::Comment(comment) => {
            let _ = write!(out, "<!--{comment}-->");
        }
        Node::ProcessingInstruction(pi) => {
            let _ = write!(out, "<?{pi}?>");
        }
        Node::Declaration(decl) => {
            let _ = write!(out, "<?{decl}?>");
        }
        Node::DocType(doctype) => {
            let _ = write!(out, "<!DOCTYPE {doctype}>");
        }
    }
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        let _ = write!(out, " {key}=\"{}\"", escape(value.as_str()));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    let _ = write!(out, "</{}>", element.name);
}

fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
