// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rewriting Slack message markup into HTML.
//!
//! Message text goes through three passes, always in this order:
//!
//! 1. [`resolve_mentions`]: `<@U123>` becomes `<span class="mention">@name</span>`
//! 2. [`expand_emoji`]: `:smile:` becomes its glyph
//! 3. [`normalize_links`]: newlines become `<br>` and `<https://…>` becomes an anchor
//!
//! Passes 2 and 3 are idempotent. Pass 1 is not: its output contains markup
//! that must not be fed back through it.
//!
//! # Example
//!
//! ```
//! use slack2html::hydrate::ProfileTable;
//! use slack2html::parser::Profile;
//! use slack2html::text::normalize;
//!
//! let mut table = ProfileTable::new();
//! table.insert("U1", Profile { display_name: "ann".into(), ..Default::default() });
//!
//! let html = normalize("hi <@U1> :wave:\nsee <https://example.com/a>", &table);
//! assert_eq!(
//!     html,
//!     "hi <span class=\"mention\">@ann</span> 👋<br>see \
//!      <a href=\"https://example.com/a\">https://example.com/a</a>"
//! );
//! ```

use crate::html::escape_text;
use crate::hydrate::ProfileTable;
use crate::parser::Message;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<@([A-Z0-9]+)(?:\|[^<>]*)?>").expect("mention pattern is valid")
});

static EMOJI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":([a-z0-9_+\-]+):").expect("emoji pattern is valid"));

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(https?://[^<>|\s]+)(?:\|[^<>]*)?>").expect("link pattern is valid")
});

/// Applies all three passes to `text`.
#[must_use]
pub fn normalize(text: &str, profiles: &ProfileTable) -> String {
    let text = resolve_mentions(text, profiles);
    let text = expand_emoji(&text);
    normalize_links(&text)
}

/// Normalizes the text of every message in place.
pub fn normalize_messages(messages: &mut [Message], profiles: &ProfileTable) {
    for message in messages.iter_mut().filter(|m| !m.text.is_empty()) {
        message.text = normalize(&message.text, profiles);
    }
}

/// Replaces user references with mention elements.
///
/// References to users missing from `profiles`, or whose profile has no
/// usable name, are left exactly as written.
#[must_use]
pub fn resolve_mentions(text: &str, profiles: &ProfileTable) -> String {
    MENTION_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let id = &caps[1];
            match profiles.get(id).and_then(|p| p.name()) {
                Some(name) => format!(r#"<span class="mention">@{}</span>"#, escape_text(name)),
                None => {
                    debug!(user = id, "unresolved mention");
                    caps[0].to_owned()
                }
            }
        })
        .into_owned()
}

/// Replaces `:shortcode:` tokens with emoji glyphs.
///
/// Unknown shortcodes are left as written.
#[must_use]
pub fn expand_emoji(text: &str) -> String {
    EMOJI_RE
        .replace_all(text, |caps: &Captures<'_>| {
            emojis::get_by_shortcode(&caps[1]).map_or_else(
                || {
                    debug!(shortcode = &caps[1], "unknown emoji");
                    caps[0].to_owned()
                },
                |emoji| emoji.as_str().to_owned(),
            )
        })
        .into_owned()
}

/// Turns newlines into `<br>` and bracketed URLs into anchors.
///
/// A labelled link (`<https://…|label>`) is shown as its URL. Slack has
/// already entity-encoded `&`, `<` and `>` in message text, so URLs are
/// copied through without further escaping.
#[must_use]
pub fn normalize_links(text: &str) -> String {
    let text = text.replace("\r\n", "<br>").replace('\n', "<br>");
    LINK_RE
        .replace_all(&text, |caps: &Captures<'_>| {
            let url = &caps[1];
            format!(r#"<a href="{}">{url}</a>"#, url.replace('"', "&quot;"))
        })
        .into_owned()
}
