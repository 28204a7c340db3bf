// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert Slack export archives to static HTML.
//!
//! This crate turns the per-channel message files of a Slack export into
//! one browsable HTML page per channel, with threads inlined under their
//! parent messages and attachments downloaded next to the pages.
//!
//! # Overview
//!
//! For each channel the crate:
//!
//! 1. Parses the message files into typed records
//! 2. Resolves author profiles and rewrites mentions, emoji and links
//! 3. Orders messages for display, placing replies after their parent
//! 4. Renders every message and writes the page
//!
//! # Example
//!
//! ```
//! use slack2html::hydrate::ProfileTable;
//! use slack2html::parser::parse_messages;
//! use slack2html::pipeline::{prepare_messages, render_channel};
//!
//! let mut messages = parse_messages(r#"[
//!     {"ts": "2", "thread_ts": "1", "parent_user_id": "U1", "text": "answer"},
//!     {"ts": "1", "thread_ts": "1", "replies": [{"ts": "2"}], "text": "question"}
//! ]"#).unwrap();
//!
//! let mut profiles = ProfileTable::new();
//! prepare_messages(&mut messages, &mut profiles);
//! let html = render_channel(messages).to_string();
//!
//! assert!(html.find("question").unwrap() < html.find("answer").unwrap());
//! ```
//!
//! # Modules
//!
//! - [`parser`]: JSON parsing and record types for Slack exports
//! - [`hydrate`]: author profile resolution
//! - [`text`]: mention, emoji and link rewriting
//! - [`thread`]: display ordering of threaded messages
//! - [`html`]: the HTML fragment tree
//! - [`renderer`]: per-message HTML rendering
//! - [`document`]: page skeletons and document output
//! - [`download`]: attachment paths and fetching
//! - [`archive`]: reading exports from disk
//! - [`pipeline`]: channel and archive conversion

#![deny(missing_docs)]

pub mod archive;
pub mod document;
pub mod download;
pub mod html;
pub mod hydrate;
pub mod parser;
pub mod pipeline;
pub mod renderer;
pub mod text;
pub mod thread;
