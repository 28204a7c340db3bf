// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! A small HTML fragment tree.
//!
//! The renderer builds [`Node`] values and serializes them with
//! [`std::fmt::Display`]. Attribute values and [`Node::Text`] are escaped on
//! output; [`Node::Raw`] is written verbatim and is only used for message
//! text that has already been turned into markup.
//!
//! # Example
//!
//! ```
//! use slack2html::html::{Element, Node};
//!
//! let node: Node = Element::new("a")
//!     .attr("href", "#top")
//!     .child(Node::text("<back>"))
//!     .into();
//!
//! assert_eq!(node.to_string(), r##"<a href="#top">&lt;back&gt;</a>"##);
//! ```

use std::fmt;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input", "link", "meta", "source"];

/// A node in an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An element with attributes and children.
    Element(Element),
    /// Plain text, escaped on output.
    Text(String),
    /// Pre-built markup, written as-is.
    Raw(String),
    /// A sequence of sibling nodes without a wrapping element.
    Fragment(Vec<Self>),
}

impl Node {
    /// Creates an escaped text node.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Creates a verbatim markup node.
    pub fn raw(s: impl Into<String>) -> Self {
        Self::Raw(s.into())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element with no attributes or children.
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute. Attributes are written in the order they are added.
    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    /// Shorthand for `attr("class", ..)`.
    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Appends several child nodes.
    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(nodes);
        self
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(element) => fmt::Display::fmt(element, f),
            Self::Text(text) => f.write_str(&escape_text(text)),
            Self::Raw(markup) => f.write_str(markup),
            Self::Fragment(nodes) => nodes.iter().try_for_each(|n| fmt::Display::fmt(n, f)),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(f, " {name}=\"{}\"", escape_attr(value))?;
        }
        f.write_str(">")?;
        if VOID_ELEMENTS.contains(&self.tag) {
            return Ok(());
        }
        for child in &self.children {
            fmt::Display::fmt(child, f)?;
        }
        write!(f, "</{}>", self.tag)
    }
}

/// Escapes a string for use as element content.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes a string for use inside a double-quoted attribute value.
#[must_use]
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
