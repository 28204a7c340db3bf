// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! HTML rendering for normalized Slack messages.
//!
//! Each message becomes one `div.item` holding the author's avatar and
//! name, a permalink anchor and the message body. The body is the message
//! text followed by one element per attachment, chosen by
//! [`AttachmentKind`].
//!
//! # Output Format
//!
//! ```text
//! <div class="item parent" id="2017-12-01 00:32:30">
//!   <img class="avatar" src="…">
//!   <div class="message">
//!     <div class="username">ann</div>
//!     <a class="time" href="#2017-12-01 00:32:30">2017-12-01 00:32:30</a>
//!     <div class="msg"><span>text</span><br><img class="imgFile" src="…"></div>
//!   </div>
//! </div>
//! ```
//!
//! # Example
//!
//! ```
//! use slack2html::parser::parse_messages;
//! use slack2html::renderer::render_message;
//!
//! let messages = parse_messages(r#"[{"ts": "0", "text": "hello"}]"#).unwrap();
//! let html = render_message(&messages[0]).to_string();
//!
//! assert!(html.contains(r#"id="1970-01-01 00:00:00""#));
//! assert!(html.contains("<span>hello</span>"));
//! ```

use crate::html::{Element, Node};
use crate::parser::{Attachment, Message, Ts};
use chrono::DateTime;
use tracing::debug;

const VIDEO_TYPES: &[&str] = &["mp4", "mov", "mkv", "webm", "avi"];
const IMAGE_TYPES: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// How an attachment is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    /// Played inline with a `<video>` element.
    Video,
    /// Shown inline with an `<img>` element.
    Image,
    /// Any other declared file type; shown as a download link.
    Generic,
    /// No file type at all; not rendered.
    Untyped,
}

impl AttachmentKind {
    /// Classifies an attachment by its `filetype`, ignoring case.
    #[must_use]
    pub fn of(attachment: &Attachment) -> Self {
        let Some(filetype) = attachment.filetype.as_deref() else {
            return Self::Untyped;
        };
        let matches = |types: &[&str]| types.iter().any(|t| t.eq_ignore_ascii_case(filetype));
        if matches(VIDEO_TYPES) {
            Self::Video
        } else if matches(IMAGE_TYPES) {
            Self::Image
        } else {
            Self::Generic
        }
    }
}

/// Formats a timestamp as the anchor id used for permalinks.
///
/// The id is the UTC time to the second. Timestamps outside chrono's range
/// fall back to the raw text.
#[must_use]
pub fn anchor_id(ts: &Ts) -> String {
    #[allow(clippy::cast_possible_truncation)]
    let seconds = ts.seconds().floor() as i64;
    DateTime::from_timestamp(seconds, 0).map_or_else(
        || ts.as_str().to_owned(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// Renders a sequence of messages as sibling `div.item` elements.
#[must_use]
pub fn render_messages(messages: &[Message]) -> Node {
    Node::Fragment(messages.iter().map(render_message).collect())
}

/// Renders one message.
#[must_use]
pub fn render_message(message: &Message) -> Node {
    let anchor = anchor_id(&message.ts);
    let profile = message.user_profile.as_ref();

    let mut item = Element::new("div")
        .class(role_class(message))
        .attr("id", anchor.clone());

    if let Some(avatar) = profile.and_then(|p| p.avatar_url.as_deref()) {
        item = item.child(Element::new("img").class("avatar").attr("src", avatar));
    }

    let name = profile.and_then(|p| p.name()).unwrap_or_default();
    let body = Element::new("div")
        .class("message")
        .child(Element::new("div").class("username").child(Node::text(name)))
        .child(
            Element::new("a")
                .class("time")
                .attr("href", format!("#{anchor}"))
                .child(Node::text(anchor)),
        )
        .child(
            Element::new("div")
                .class("msg")
                .children(render_content(message)),
        );

    item.child(body).into()
}

/// Thread parents and replies get an extra class for styling.
fn role_class(message: &Message) -> &'static str {
    if message.replies.is_some() {
        "item parent"
    } else if message.parent_user_id.is_some() {
        "item response"
    } else {
        "item"
    }
}

fn render_content(message: &Message) -> Vec<Node> {
    let mut nodes = Vec::new();
    let has_text = !message.text.is_empty();

    if has_text {
        nodes.push(render_text(&message.text));
    }

    if !message.files.is_empty() {
        if has_text {
            nodes.push(Element::new("br").into());
        }
        nodes.extend(message.files.iter().filter_map(|file| {
            let node = render_attachment(file);
            if node.is_none() {
                debug!(ts = %message.ts, file = %file.id, "skipping attachment without file type");
            }
            node
        }));
    }

    nodes
}

/// Message text is already markup, see [`crate::text`].
fn render_text(text: &str) -> Node {
    Element::new("span").child(Node::raw(text)).into()
}

fn render_attachment(file: &Attachment) -> Option<Node> {
    let src = file
        .local_file
        .as_deref()
        .or(file.source_url.as_deref())
        .unwrap_or_default();

    let element = match AttachmentKind::of(file) {
        AttachmentKind::Video => render_video(src),
        AttachmentKind::Image => render_image(src),
        AttachmentKind::Generic => render_file(src, &file.title),
        AttachmentKind::Untyped => return None,
    };
    Some(element.into())
}

fn render_video(src: &str) -> Element {
    Element::new("video")
        .class("videoFile")
        .attr("controls", "true")
        .attr("src", src)
}

fn render_image(src: &str) -> Element {
    Element::new("img").class("imgFile").attr("src", src)
}

fn render_file(src: &str, title: &str) -> Element {
    Element::new("a")
        .attr("href", src)
        .attr("target", "_blank")
        .child(Element::new("img").class("file").attr("title", src))
        .child(Element::new("span").child(Node::text(title)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Profile, parse_messages};

    fn message(json: &str) -> Message {
        parse_messages(&format!("[{json}]")).unwrap().remove(0)
    }

    fn attachment(filetype: Option<&str>, local: &str) -> Attachment {
        Attachment {
            id: "F1".into(),
            name: "file".into(),
            title: "A file".into(),
            filetype: filetype.map(Into::into),
            local_file: Some(local.into()),
            ..Default::default()
        }
    }

    #[test]
    fn classifies_attachment_kinds() {
        assert_eq!(AttachmentKind::of(&attachment(Some("mp4"), "")), AttachmentKind::Video);
        assert_eq!(AttachmentKind::of(&attachment(Some("MOV"), "")), AttachmentKind::Video);
        assert_eq!(AttachmentKind::of(&attachment(Some("PNG"), "")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::of(&attachment(Some("webp"), "")), AttachmentKind::Image);
        assert_eq!(AttachmentKind::of(&attachment(Some("pdf"), "")), AttachmentKind::Generic);
        assert_eq!(AttachmentKind::of(&attachment(Some(""), "")), AttachmentKind::Generic);
        assert_eq!(AttachmentKind::of(&attachment(None, "")), AttachmentKind::Untyped);
    }

    #[test]
    fn formats_anchor_ids() {
        let ts: Ts = "1512085950.000216".parse().unwrap();
        assert_eq!(anchor_id(&ts), "2017-11-30 23:52:30");
    }

    #[test]
    fn anchor_falls_back_to_raw_timestamp() {
        let ts: Ts = "1e300".parse().unwrap();
        assert_eq!(anchor_id(&ts), "1e300");
    }

    #[test]
    fn renders_identity_and_permalink() {
        let mut msg = message(r#"{"ts": "0", "user": "U1", "text": "hi"}"#);
        msg.user_profile = Some(Profile {
            display_name: "ann".into(),
            real_name: None,
            avatar_url: Some("https://a.example.com/ann.png".into()),
        });

        let html = render_message(&msg).to_string();

        assert!(html.starts_with(r#"<div class="item" id="1970-01-01 00:00:00">"#));
        assert!(html.contains(r#"<img class="avatar" src="https://a.example.com/ann.png">"#));
        assert!(html.contains(r#"<div class="username">ann</div>"#));
        assert!(html.contains(
            r##"<a class="time" href="#1970-01-01 00:00:00">1970-01-01 00:00:00</a>"##
        ));
        assert!(html.contains(r#"<div class="msg"><span>hi</span></div>"#));
    }

    #[test]
    fn renders_without_identity() {
        let msg = message(r#"{"ts": "0", "text": "anon"}"#);

        let html = render_message(&msg).to_string();

        assert!(!html.contains("avatar"));
        assert!(html.contains(r#"<div class="username"></div>"#));
        assert!(html.contains("<span>anon</span>"));
    }

    #[test]
    fn adds_role_classes() {
        let parent = message(r#"{"ts": "1", "text": "p", "replies": [{"ts": "2"}]}"#);
        let reply = message(r#"{"ts": "2", "thread_ts": "1", "parent_user_id": "U1", "text": "r"}"#);
        let plain = message(r#"{"ts": "3", "text": "x"}"#);

        assert!(render_message(&parent).to_string().starts_with(r#"<div class="item parent""#));
        assert!(render_message(&reply).to_string().starts_with(r#"<div class="item response""#));
        assert!(render_message(&plain).to_string().starts_with(r#"<div class="item" "#));
    }

    #[test]
    fn renders_each_attachment_kind() {
        let mut msg = message(r#"{"ts": "0", "text": ""}"#);
        msg.files = vec![
            attachment(Some("mp4"), "general/F1_1_clip.mp4"),
            attachment(Some("PNG"), "general/F2_1_cat.png"),
            attachment(Some("pdf"), "general/F3_1_doc.pdf"),
        ];

        let html = render_message(&msg).to_string();

        assert!(html.contains(
            r#"<video class="videoFile" controls="true" src="general/F1_1_clip.mp4"></video>"#
        ));
        assert!(html.contains(r#"<img class="imgFile" src="general/F2_1_cat.png">"#));
        assert!(html.contains(
            r#"<a href="general/F3_1_doc.pdf" target="_blank"><img class="file" title="general/F3_1_doc.pdf"><span>A file</span></a>"#
        ));
        assert!(!html.contains("<br>"), "no separator without text");
    }

    #[test]
    fn separates_text_from_attachments() {
        let mut msg = message(r#"{"ts": "0", "text": "look"}"#);
        msg.files = vec![attachment(Some("gif"), "c/x.gif")];

        let html = render_message(&msg).to_string();

        assert!(html.contains(r#"<span>look</span><br><img class="imgFile" src="c/x.gif">"#));
    }

    #[test]
    fn skips_untyped_attachment_only() {
        let mut msg = message(r#"{"ts": "0", "text": "files"}"#);
        msg.files = vec![
            attachment(None, "c/untyped"),
            attachment(Some("jpg"), "c/photo.jpg"),
        ];

        let html = render_message(&msg).to_string();

        assert!(!html.contains("c/untyped"));
        assert!(html.contains("<span>files</span>"));
        assert!(html.contains(r#"src="c/photo.jpg""#));
    }

    #[test]
    fn falls_back_to_source_url() {
        let mut msg = message(r#"{"ts": "0", "text": ""}"#);
        msg.files = vec![Attachment {
            filetype: Some("png".into()),
            source_url: Some("https://files.example.com/x.png".into()),
            ..Default::default()
        }];

        let html = render_message(&msg).to_string();

        assert!(html.contains(r#"src="https://files.example.com/x.png""#));
    }

    #[test]
    fn escapes_user_supplied_fields() {
        let mut msg = message(r#"{"ts": "0", "text": ""}"#);
        msg.user_profile = Some(Profile {
            display_name: "<script>".into(),
            ..Default::default()
        });
        msg.files = vec![Attachment {
            title: "a <b> & c".into(),
            ..attachment(Some("zip"), "c/a.zip")
        }];

        let html = render_message(&msg).to_string();

        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<span>a &lt;b&gt; &amp; c</span>"));
    }

    #[test]
    fn renders_sequence_in_order() {
        let messages = parse_messages(
            r#"[{"ts": "0", "text": "one"}, {"ts": "60", "text": "two"}]"#,
        )
        .unwrap();

        let html = render_messages(&messages).to_string();

        let one = html.find("one").unwrap();
        let two = html.find("two").unwrap();
        assert!(one < two);
        assert_eq!(html.matches(r#"<div class="item""#).count(), 2);
    }
}
