// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Resolving author profiles for messages.
//!
//! Slack embeds a `user_profile` snapshot in some messages but not all of
//! them. Hydration collects every snapshot into a [`ProfileTable`] and then
//! fills the gaps, so a message gets a profile whenever its author is known
//! anywhere in the channel or the workspace directory.

use crate::parser::{Message, Profile, UserEntry};
use std::collections::HashMap;
use tracing::debug;

/// Profiles keyed by user id.
///
/// The table is seeded from the user directory and grows as channels are
/// hydrated. It is passed by `&mut` to [`hydrate`], so only one channel can
/// write to it at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileTable {
    profiles: HashMap<String, Profile>,
}

impl ProfileTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from the entries of a user directory.
    #[must_use]
    pub fn from_directory(users: Vec<UserEntry>) -> Self {
        users.into_iter().map(|u| (u.id, u.profile)).collect()
    }

    /// Looks up the profile for a user id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.get(id)
    }

    /// Records a profile, replacing any earlier one for the same id.
    pub fn insert(&mut self, id: impl Into<String>, profile: Profile) {
        self.profiles.insert(id.into(), profile);
    }

    /// Number of known users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` if no users are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl FromIterator<(String, Profile)> for ProfileTable {
    fn from_iter<I: IntoIterator<Item = (String, Profile)>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}

/// Resolves a profile for every message that can have one.
///
/// Runs two passes. The first copies each embedded `user_profile` into the
/// table under its author id; embedded snapshots win over directory entries.
/// The second gives every message without a profile the table's entry for
/// its author. Messages whose author is unknown keep `user_profile: None`.
pub fn hydrate(messages: &mut [Message], table: &mut ProfileTable) {
    for message in messages.iter() {
        if let (Some(user), Some(profile)) = (&message.user, &message.user_profile) {
            table.insert(user.clone(), profile.clone());
        }
    }

    for message in messages.iter_mut() {
        if message.user_profile.is_some() {
            continue;
        }
        let Some(user) = message.user.as_deref() else {
            debug!(ts = %message.ts, "message has no author");
            continue;
        };
        match table.get(user) {
            Some(profile) => message.user_profile = Some(profile.clone()),
            None => debug!(ts = %message.ts, user, "no profile for author"),
        }
    }
}
