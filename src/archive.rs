// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Reading an export from disk.
//!
//! An archive is a directory holding `users.json` and one subdirectory per
//! channel. A channel directory holds one JSON message file per day.

use crate::hydrate::ProfileTable;
use crate::parser::{self, Message};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Name of the user directory file at the root of an archive.
pub const USER_DIRECTORY_FILE: &str = "users.json";

/// Error type for loading export files.
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// A directory could not be listed.
    #[snafu(display("failed to list {}: {source}", path.display()))]
    ListDir {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying error.
        source: walkdir::Error,
    },

    /// A file could not be read.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A message file is not a valid list of messages.
    #[snafu(display("failed to parse messages in {}: {source}", path.display()))]
    ParseMessages {
        /// The message file.
        path: PathBuf,
        /// The underlying parse error.
        source: parser::ParseError,
    },

    /// The user directory is not a valid list of users.
    #[snafu(display("failed to parse user directory {}: {source}", path.display()))]
    ParseUsers {
        /// The user directory file.
        path: PathBuf,
        /// The underlying parse error.
        source: parser::ParseError,
    },
}

/// A channel directory and the name its document is written under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSource {
    /// Channel name, taken from the directory name.
    pub name: String,
    /// Directory holding the channel's message files.
    pub dir: PathBuf,
}

impl ChannelSource {
    /// Describes the channel stored in `dir`.
    ///
    /// Returns `None` if `dir` has no final path component.
    #[must_use]
    pub fn from_dir(dir: &Path) -> Option<Self> {
        let name = dir.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            name,
            dir: dir.to_path_buf(),
        })
    }
}

/// Reads a user directory file into a profile table.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_user_directory(path: &Path) -> Result<ProfileTable, LoadError> {
    let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
    let users = parser::parse_user_directory(&json).context(ParseUsersSnafu { path })?;
    debug!(path = %path.display(), users = users.len(), "loaded user directory");
    Ok(ProfileTable::from_directory(users))
}

/// Lists the channel directories of an archive, sorted by name.
///
/// # Errors
///
/// Returns an error if the archive directory cannot be listed.
pub fn list_channels(archive_dir: &Path) -> Result<Vec<ChannelSource>, LoadError> {
    let mut channels = Vec::new();
    for entry in immediate_children(archive_dir) {
        let entry = entry.context(ListDirSnafu { path: archive_dir })?;
        if entry.file_type().is_dir()
            && let Some(channel) = ChannelSource::from_dir(entry.path())
        {
            channels.push(channel);
        }
    }
    Ok(channels)
}

/// Reads every message file of a channel, in file name order.
///
/// # Errors
///
/// Returns an error if the directory cannot be listed or any message file
/// cannot be read or parsed.
pub fn load_channel(dir: &Path) -> Result<Vec<Message>, LoadError> {
    let mut messages = Vec::new();
    for entry in immediate_children(dir) {
        let entry = entry.context(ListDirSnafu { path: dir })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }

        let json = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        let batch = parser::parse_messages(&json).context(ParseMessagesSnafu { path })?;
        debug!(path = %path.display(), messages = batch.len(), "read message file");
        messages.extend(batch);
    }
    Ok(messages)
}

fn immediate_children(dir: &Path) -> walkdir::IntoIter {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
}
