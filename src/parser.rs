// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! JSON parsing for Slack export archives.
//!
//! This module handles deserialization of the per-channel message files and
//! the `users.json` directory found in a Slack export. Only the fields the
//! converter needs are modelled; everything else in the records is ignored.
//!
//! # Format Overview
//!
//! A Slack export contains:
//! - A `users.json` file listing every workspace member and their profile
//! - One directory per channel holding one JSON file per day
//! - Each day file is an array of message records, some of which carry
//!   thread metadata (`thread_ts`, `replies`) and file attachments
//!
//! # Example
//!
//! ```
//! use slack2html::parser::parse_messages;
//!
//! let json = r#"[{
//!     "ts": "1512085950.000216",
//!     "user": "U1",
//!     "text": "Hello"
//! }]"#;
//!
//! let messages = parse_messages(json).unwrap();
//! assert_eq!(messages.len(), 1);
//! assert_eq!(messages[0].text, "Hello");
//! ```

use serde::{Deserialize, de};
use snafu::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// A timestamp string that is not a finite number of seconds.
#[derive(Debug, Snafu)]
#[snafu(display("invalid timestamp {raw:?}"))]
pub struct InvalidTimestamp {
    raw: String,
}

/// A Slack message timestamp.
///
/// Slack uses the timestamp both as the message's position in time and as
/// its identifier (threads refer to their replies by `ts`). The raw text is
/// kept for identity comparisons, the parsed seconds for ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Ts {
    raw: String,
    seconds: f64,
}

impl Ts {
    /// The timestamp exactly as it appeared in the export.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Seconds since the Unix epoch, including the sub-second part.
    #[must_use]
    pub const fn seconds(&self) -> f64 {
        self.seconds
    }
}

impl FromStr for Ts {
    type Err = InvalidTimestamp;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let seconds = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite())
            .context(InvalidTimestampSnafu { raw })?;
        Ok(Self {
            raw: raw.to_owned(),
            seconds,
        })
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Ts {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Older exports write some timestamps as bare numbers.
        let raw = match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "expected a timestamp, found {other}"
                )));
            }
        };
        raw.parse().map_err(de::Error::custom)
    }
}

/// A single message record from a channel export.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Message {
    /// Message timestamp; doubles as the message identifier.
    pub ts: Ts,

    /// Id of the author, if the message has one (bot messages may not).
    #[serde(default)]
    pub user: Option<String>,

    /// Message text in Slack markup. Rewritten in place by [`crate::text`].
    #[serde(default)]
    pub text: String,

    /// Timestamp of the thread this message belongs to.
    #[serde(default)]
    pub thread_ts: Option<Ts>,

    /// Replies owned by this message, in thread order. Only thread parents
    /// carry this list.
    #[serde(default)]
    pub replies: Option<Vec<ReplyRef>>,

    /// Author of the thread parent, present on replies.
    #[serde(default)]
    pub parent_user_id: Option<String>,

    /// Files attached to the message.
    #[serde(default)]
    pub files: Vec<Attachment>,

    /// The author's profile, either embedded by the export or filled in by
    /// [`crate::hydrate`].
    #[serde(default)]
    pub user_profile: Option<Profile>,
}

/// A parent's reference to one of its replies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplyRef {
    /// Timestamp of the reply message.
    pub ts: Ts,

    /// Author of the reply.
    #[serde(default)]
    pub user: Option<String>,
}

/// A user's display identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Profile {
    /// The name the user chose to display. Often empty.
    #[serde(default)]
    pub display_name: String,

    /// The user's full name.
    #[serde(default)]
    pub real_name: Option<String>,

    /// URL of the 72px avatar image.
    #[serde(default, rename = "image_72")]
    pub avatar_url: Option<String>,
}

impl Profile {
    /// Returns the name to show for this user: the display name, or the
    /// real name when no display name was set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if !self.display_name.is_empty() {
            return Some(&self.display_name);
        }
        self.real_name.as_deref().filter(|n| !n.is_empty())
    }
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Attachment {
    /// Slack file id.
    #[serde(default)]
    pub id: String,

    /// Original file name.
    #[serde(default)]
    pub name: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: String,

    /// File type as reported by Slack (e.g. `png`, `mp4`, `pdf`).
    #[serde(default)]
    pub filetype: Option<String>,

    /// Unix time the file was uploaded.
    #[serde(default)]
    pub created: Option<i64>,

    /// `tombstone` for deleted files.
    #[serde(default)]
    pub mode: Option<String>,

    /// Where the file can be downloaded from.
    #[serde(default, rename = "url_private_download")]
    pub source_url: Option<String>,

    /// Path of the downloaded copy, relative to the output directory.
    #[serde(default)]
    pub local_file: Option<String>,
}

impl Attachment {
    /// Returns `true` if this is the placeholder left behind by a deleted file.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.mode.as_deref() == Some("tombstone")
    }
}

/// An entry in the workspace user directory (`users.json`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserEntry {
    /// User id, as referenced by messages and mentions.
    pub id: String,

    /// The user's profile.
    #[serde(default)]
    pub profile: Profile,
}

/// Parses one channel message file into its message records.
///
/// # Errors
///
/// Returns an error if the JSON is malformed, is not an array of messages,
/// or contains a timestamp that is not a number.
pub fn parse_messages(json_str: &str) -> Result<Vec<Message>, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Parses the workspace user directory.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or an entry has no `id`.
///
/// # Example
///
/// ```
/// use slack2html::parser::parse_user_directory;
///
/// let json = r#"[{"id": "U1", "profile": {"display_name": "ann"}}]"#;
/// let users = parse_user_directory(json).unwrap();
/// assert_eq!(users[0].profile.display_name, "ann");
/// ```
pub fn parse_user_directory(json_str: &str) -> Result<Vec<UserEntry>, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_message() {
        let messages = parse_messages(r#"[{"ts": "100.5", "text": "hi"}]"#).unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].ts.as_str(), "100.5");
        assert!((messages[0].ts.seconds() - 100.5).abs() < f64::EPSILON);
        assert!(messages[0].user.is_none());
        assert!(messages[0].files.is_empty());
        assert!(messages[0].replies.is_none());
    }

    #[test]
    fn parses_numeric_timestamp() {
        let messages = parse_messages(r#"[{"ts": 42, "text": ""}]"#).unwrap();

        assert_eq!(messages[0].ts.as_str(), "42");
    }

    #[test]
    fn parses_thread_metadata() {
        let json = r#"[{
            "ts": "1.000100",
            "thread_ts": "1.000100",
            "user": "U1",
            "text": "parent",
            "replies": [{"user": "U2", "ts": "2.000200"}, {"user": "U1", "ts": "3.000300"}]
        }, {
            "ts": "2.000200",
            "thread_ts": "1.000100",
            "parent_user_id": "U1",
            "user": "U2",
            "text": "reply"
        }]"#;
        let messages = parse_messages(json).unwrap();

        let replies = messages[0].replies.as_ref().unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[1].ts.as_str(), "3.000300");
        assert_eq!(messages[1].parent_user_id.as_deref(), Some("U1"));
        assert_eq!(
            messages[1].thread_ts.as_ref().map(Ts::as_str),
            Some("1.000100")
        );
    }

    #[test]
    fn parses_attachments() {
        let json = r#"[{
            "ts": "5",
            "text": "",
            "files": [{
                "id": "F1",
                "created": 1512085950,
                "name": "cat.png",
                "title": "A cat",
                "filetype": "png",
                "url_private_download": "https://files.example.com/cat.png"
            }, {
                "id": "F2",
                "mode": "tombstone"
            }]
        }]"#;
        let messages = parse_messages(json).unwrap();
        let files = &messages[0].files;

        assert_eq!(files[0].filetype.as_deref(), Some("png"));
        assert_eq!(files[0].created, Some(1_512_085_950));
        assert_eq!(
            files[0].source_url.as_deref(),
            Some("https://files.example.com/cat.png")
        );
        assert!(!files[0].is_tombstone());
        assert!(files[1].is_tombstone());
        assert!(files[1].filetype.is_none());
    }

    #[test]
    fn parses_embedded_profile() {
        let json = r#"[{
            "ts": "5",
            "user": "U1",
            "text": "",
            "user_profile": {
                "display_name": "ann",
                "real_name": "Ann Example",
                "image_72": "https://avatars.example.com/ann.png",
                "team": "T1"
            }
        }]"#;
        let messages = parse_messages(json).unwrap();
        let profile = messages[0].user_profile.as_ref().unwrap();

        assert_eq!(profile.display_name, "ann");
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://avatars.example.com/ann.png")
        );
    }

    #[test]
    fn profile_name_falls_back_to_real_name() {
        let profile = Profile {
            display_name: String::new(),
            real_name: Some("Ann Example".into()),
            avatar_url: None,
        };
        assert_eq!(profile.name(), Some("Ann Example"));

        let empty = Profile::default();
        assert_eq!(empty.name(), None);
    }

    #[test]
    fn parses_user_directory() {
        let json = r#"[
            {"id": "U1", "name": "ann", "profile": {"display_name": "ann"}},
            {"id": "U2", "deleted": true}
        ]"#;
        let users = parse_user_directory(json).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "U1");
        assert_eq!(users[1].profile, Profile::default());
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        assert!(parse_messages(r#"[{"ts": "yesterday", "text": ""}]"#).is_err());
        assert!("NaN".parse::<Ts>().is_err());
    }

    #[test]
    fn returns_error_for_invalid_json() {
        assert!(parse_messages("not valid json").is_err());
        assert!(parse_user_directory(r#"{"id": "U1"}"#).is_err());
    }
}
