// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Putting threaded messages into display order.
//!
//! A Slack export stores thread replies as ordinary messages that point at
//! their parent through `thread_ts`, while the parent lists its replies by
//! timestamp. [`reconstruct`] flattens this into one sequence: top-level
//! messages in time order, each thread parent followed directly by its
//! replies in the order the parent lists them.

use crate::parser::Message;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Returns `true` if the message is a thread reply rather than a top-level
/// message or thread parent.
#[must_use]
pub const fn is_reply(message: &Message) -> bool {
    message.thread_ts.is_some() && message.replies.is_none()
}

/// Reorders a channel's messages for display.
///
/// Every input message appears exactly once in the output. Non-replies are
/// sorted by `ts`, keeping their input order on ties. Each parent's replies
/// are placed right after it, matched by `ts` in listed order; each reply is
/// claimed at most once. A listed reply with no matching record is skipped.
/// A reply that no parent claims is positioned by its own `ts` as if it were
/// top-level.
#[must_use]
pub fn reconstruct(messages: Vec<Message>) -> Vec<Message> {
    let mut pool: HashMap<&str, VecDeque<usize>> = HashMap::new();
    let mut top_level = Vec::new();
    for (idx, message) in messages.iter().enumerate() {
        if is_reply(message) {
            pool.entry(message.ts.as_str()).or_default().push_back(idx);
        } else {
            top_level.push(idx);
        }
    }

    let by_time = |a: &usize, b: &usize| {
        messages[*a]
            .ts
            .seconds()
            .total_cmp(&messages[*b].ts.seconds())
            .then(a.cmp(b))
    };
    top_level.sort_by(by_time);

    let mut threads: HashMap<usize, Vec<usize>> = HashMap::new();
    for &parent in &top_level {
        let Some(refs) = &messages[parent].replies else {
            continue;
        };
        let claimed = threads.entry(parent).or_default();
        for reply in refs {
            match pool.get_mut(reply.ts.as_str()).and_then(VecDeque::pop_front) {
                Some(idx) => claimed.push(idx),
                None => debug!(
                    parent = %messages[parent].ts,
                    reply = %reply.ts,
                    "reply record missing"
                ),
            }
        }
    }

    let orphans: Vec<usize> = pool.into_values().flatten().collect();
    if !orphans.is_empty() {
        debug!(count = orphans.len(), "placing unclaimed replies by time");
        top_level.extend(orphans);
        top_level.sort_by(by_time);
    }

    let mut order = Vec::with_capacity(messages.len());
    for idx in top_level {
        order.push(idx);
        if let Some(replies) = threads.remove(&idx) {
            order.extend(replies);
        }
    }

    let mut slots: Vec<Option<Message>> = messages.into_iter().map(Some).collect();
    order.into_iter().filter_map(|idx| slots[idx].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_messages;

    fn ts_order(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.ts.as_str()).collect()
    }

    #[test]
    fn places_reply_after_parent() {
        let messages = parse_messages(
            r#"[
                {"ts": "2", "thread_ts": "1", "parent_user_id": "U1", "text": "reply"},
                {"ts": "1", "thread_ts": "1", "replies": [{"ts": "2"}], "text": "parent"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["1", "2"]);
    }

    #[test]
    fn sorts_top_level_by_time() {
        let messages = parse_messages(
            r#"[
                {"ts": "30", "text": "c"},
                {"ts": "10", "text": "a"},
                {"ts": "20.5", "text": "b"},
                {"ts": "20.25", "text": "b0"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["10", "20.25", "20.5", "30"]);
    }

    #[test]
    fn ties_keep_input_order() {
        let messages = parse_messages(
            r#"[
                {"ts": "5", "text": "first"},
                {"ts": "1", "text": "early"},
                {"ts": "5", "text": "second"},
                {"ts": "5.0", "text": "third"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);
        let texts: Vec<&str> = out.iter().map(|m| m.text.as_str()).collect();

        assert_eq!(texts, ["early", "first", "second", "third"]);
    }

    #[test]
    fn replies_follow_listed_order() {
        let messages = parse_messages(
            r#"[
                {"ts": "1", "thread_ts": "1", "replies": [{"ts": "4"}, {"ts": "3"}], "text": "p"},
                {"ts": "2", "text": "other"},
                {"ts": "3", "thread_ts": "1", "text": "r3"},
                {"ts": "4", "thread_ts": "1", "text": "r4"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["1", "4", "3", "2"]);
    }

    #[test]
    fn skips_missing_reply_records() {
        let messages = parse_messages(
            r#"[
                {"ts": "1", "thread_ts": "1", "replies": [{"ts": "2"}, {"ts": "3"}], "text": "p"},
                {"ts": "3", "thread_ts": "1", "text": "r3"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["1", "3"]);
    }

    #[test]
    fn keeps_unclaimed_replies() {
        let messages = parse_messages(
            r#"[
                {"ts": "1", "text": "a"},
                {"ts": "5", "thread_ts": "0.5", "text": "orphan"},
                {"ts": "9", "text": "b"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["1", "5", "9"]);
    }

    #[test]
    fn reply_listed_twice_is_emitted_once() {
        let messages = parse_messages(
            r#"[
                {"ts": "1", "thread_ts": "1", "replies": [{"ts": "3"}], "text": "p1"},
                {"ts": "2", "thread_ts": "2", "replies": [{"ts": "3"}], "text": "p2"},
                {"ts": "3", "thread_ts": "1", "text": "r"}
            ]"#,
        )
        .unwrap();

        let out = reconstruct(messages);

        assert_eq!(ts_order(&out), ["1", "3", "2"]);
    }

    #[test]
    fn preserves_every_message() {
        let messages = parse_messages(
            r#"[
                {"ts": "7", "thread_ts": "6", "text": "r7"},
                {"ts": "6", "thread_ts": "6", "replies": [{"ts": "7"}, {"ts": "8"}], "text": "p"},
                {"ts": "3", "text": "x"},
                {"ts": "8", "thread_ts": "6", "text": "r8"},
                {"ts": "9", "thread_ts": "4", "text": "orphan"},
                {"ts": "3", "text": "y"},
                {"ts": "1", "thread_ts": "1", "replies": [{"ts": "100"}], "text": "lonely"}
            ]"#,
        )
        .unwrap();
        let mut expected: Vec<String> = messages.iter().map(|m| m.text.clone()).collect();

        let out = reconstruct(messages);
        let mut actual: Vec<String> = out.iter().map(|m| m.text.clone()).collect();

        assert_eq!(
            actual,
            ["lonely", "x", "y", "p", "r7", "r8", "orphan"]
        );
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }

    #[test]
    fn empty_input() {
        assert!(reconstruct(Vec::new()).is_empty());
    }
}
