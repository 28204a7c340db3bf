// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Page skeletons and writing channel documents.
//!
//! A skeleton is an HTML page with one designated container element. The
//! rendered messages are appended to the end of that container; the rest of
//! the page is copied through untouched.

use crate::html::Node;
use regex::Regex;
use snafu::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// The skeleton used when no template is configured.
pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/channel-template.html");

/// Class that marks the message container in a skeleton.
pub const CONTAINER_CLASS: &str = "messages";

static OPEN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<([a-zA-Z][a-zA-Z0-9-]*)\b[^>]*\sclass\s*=\s*["']([^"']*)["'][^>]*>"#)
        .expect("open tag pattern is valid")
});

/// Comments and raw-text elements, whose contents are not markup.
static OPAQUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("opaque region pattern is valid")
});

/// Error type for assembling and writing documents.
#[derive(Debug, Snafu)]
pub enum AssembleError {
    /// The template file could not be read.
    #[snafu(display("failed to read template {}: {source}", path.display()))]
    ReadTemplate {
        /// The template file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No element in the skeleton carries the container class.
    #[snafu(display("template has no element with class {class:?}"))]
    MissingContainer {
        /// The class that was looked for.
        class: String,
    },

    /// The container element is never closed.
    #[snafu(display("template container <{tag}> is not closed"))]
    UnclosedContainer {
        /// Tag name of the container.
        tag: String,
    },

    /// The output directory could not be created.
    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        /// The directory.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The document could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteDocument {
        /// The output file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A page with a known insertion point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    html: String,
    insert_at: usize,
}

impl Skeleton {
    /// Locates the container in `html`.
    ///
    /// The container is the first element whose class list includes
    /// `class`. Content is inserted just before its closing tag.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such element or it is not closed.
    pub fn parse(html: impl Into<String>, class: &str) -> Result<Self, AssembleError> {
        let html = html.into();
        let opaque = opaque_regions(&html);
        let (tag, body_start) = OPEN_TAG_RE
            .captures_iter(&html)
            .filter(|caps| caps.get(0).is_some_and(|m| !is_opaque(&opaque, m.start())))
            .find(|caps| caps[2].split_whitespace().any(|c| c == class))
            .and_then(|caps| Some((caps[1].to_ascii_lowercase(), caps.get(0)?.end())))
            .context(MissingContainerSnafu { class })?;

        let insert_at = find_closing_tag(&html[body_start..], &tag)
            .map(|offset| body_start + offset)
            .context(UnclosedContainerSnafu { tag })?;

        Ok(Self { html, insert_at })
    }

    /// Loads the skeleton from `template`, or the built-in one if `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be read or has no container.
    pub fn load(template: Option<&Path>) -> Result<Self, AssembleError> {
        match template {
            Some(path) => {
                let html = std::fs::read_to_string(path).context(ReadTemplateSnafu { path })?;
                Self::parse(html, CONTAINER_CLASS)
            }
            None => Self::parse(DEFAULT_TEMPLATE, CONTAINER_CLASS),
        }
    }

    /// Returns the full page with `content` appended to the container.
    #[must_use]
    pub fn assemble(&self, content: &Node) -> String {
        let (head, tail) = self.html.split_at(self.insert_at);
        format!("{head}{content}{tail}")
    }
}

fn opaque_regions(html: &str) -> Vec<Range<usize>> {
    OPAQUE_RE.find_iter(html).map(|m| m.range()).collect()
}

fn is_opaque(regions: &[Range<usize>], pos: usize) -> bool {
    regions.iter().any(|r| r.contains(&pos))
}

/// Finds the byte offset of the `</tag>` that closes an element whose
/// content starts at the beginning of `html`.
///
/// Tags inside comments, scripts and style sheets are ignored.
fn find_closing_tag(html: &str, tag: &str) -> Option<usize> {
    let pattern = format!(r"(?i)<(/?){}\b[^>]*>", regex::escape(tag));
    let re = Regex::new(&pattern).ok()?;
    let opaque = opaque_regions(html);
    let mut depth = 0usize;
    for caps in re.captures_iter(html) {
        let m = caps.get(0)?;
        if is_opaque(&opaque, m.start()) {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
        } else if depth == 0 {
            return Some(m.start());
        } else {
            depth -= 1;
        }
    }
    None
}

/// Path of a channel's document inside `output_dir`.
#[must_use]
pub fn document_path(output_dir: &Path, channel: &str) -> PathBuf {
    output_dir.join(format!("{channel}.html"))
}

/// Writes a document, replacing any existing file.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the file
/// cannot be written.
pub fn write_document(path: &Path, contents: &str) -> Result<(), AssembleError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
    }
    std::fs::write(path, contents).context(WriteDocumentSnafu { path })
}
