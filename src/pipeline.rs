// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! End-to-end conversion of channels and archives.
//!
//! A channel goes through these steps, in order:
//!
//! 1. load every message file ([`crate::archive`])
//! 2. drop deleted attachments ([`crate::download::prune_tombstones`])
//! 3. resolve author profiles ([`crate::hydrate`])
//! 4. rewrite message text ([`crate::text`])
//! 5. assign local paths and fetch missing attachments ([`crate::download`])
//! 6. put threads in display order ([`crate::thread`])
//! 7. render and write the document ([`crate::renderer`], [`crate::document`])
//!
//! The profile table is threaded through every channel of an archive by
//! `&mut`, so channels are converted one after another.

use crate::archive::{self, ChannelSource, LoadError};
use crate::document::{self, AssembleError, Skeleton};
use crate::download::{self, Downloader};
use crate::hydrate::{self, ProfileTable};
use crate::html::Node;
use crate::parser::Message;
use crate::{renderer, text, thread};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Default directory documents are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "output_html";

/// Error type for converting channels and archives.
#[derive(Debug, Snafu)]
pub enum Error {
    /// The page template could not be loaded.
    #[snafu(display("failed to load template: {source}"))]
    Template {
        /// The underlying error.
        source: AssembleError,
    },

    /// The user directory could not be loaded.
    #[snafu(display("failed to load user directory: {source}"))]
    LoadUsers {
        /// The underlying error.
        source: LoadError,
    },

    /// The archive's channel directories could not be listed.
    #[snafu(display("failed to list channels of archive {}: {source}", archive.display()))]
    ListChannels {
        /// The archive directory.
        archive: PathBuf,
        /// The underlying error.
        source: LoadError,
    },

    /// A channel directory path has no name to derive the document from.
    #[snafu(display("cannot determine channel name from {}", path.display()))]
    ChannelName {
        /// The offending path.
        path: PathBuf,
    },

    /// A channel's message files could not be loaded.
    #[snafu(display("failed to load channel {channel}: {source}"))]
    LoadChannel {
        /// The channel name.
        channel: String,
        /// The underlying error.
        source: LoadError,
    },

    /// A channel's document could not be written.
    #[snafu(display("failed to write channel {channel}: {source}"))]
    WriteChannel {
        /// The channel name.
        channel: String,
        /// The underlying error.
        source: AssembleError,
    },

    /// Some channels of an archive failed; each was logged as it happened.
    #[snafu(display("{failed} of {total} channels in {} failed", archive.display()))]
    ChannelsFailed {
        /// The archive directory.
        archive: PathBuf,
        /// Number of failed channels.
        failed: usize,
        /// Number of channels in the archive.
        total: usize,
    },
}

/// Conversion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Directory the documents and attachments are written to.
    pub output_dir: PathBuf,

    /// Page skeleton to use instead of the built-in one.
    pub template: Option<PathBuf>,

    /// Whether to fetch attachments that are not yet in `output_dir`.
    ///
    /// When disabled, attachments still get their local paths and the
    /// documents link to files that may not exist.
    pub download: bool,

    /// Report what would be written without fetching or writing anything.
    pub dry_run: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            template: None,
            download: true,
            dry_run: false,
        }
    }
}

/// What happened to one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    /// Channel name.
    pub channel: String,
    /// Number of messages rendered.
    pub messages: usize,
    /// Number of attachments that had to be fetched.
    pub downloads: usize,
    /// Number of those fetches that failed.
    pub failed_downloads: usize,
    /// Path of the document.
    pub output: PathBuf,
}

/// Converts channels using one set of [`Options`].
pub struct Converter {
    options: Options,
    skeleton: Skeleton,
    downloader: Box<dyn Downloader>,
}

impl Converter {
    /// Creates a converter, loading the page skeleton up front.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured template cannot be loaded.
    pub fn new(options: Options, downloader: Box<dyn Downloader>) -> Result<Self, Error> {
        let skeleton = Skeleton::load(options.template.as_deref()).context(TemplateSnafu)?;
        Ok(Self {
            options,
            skeleton,
            downloader,
        })
    }

    /// Converts every channel of an archive.
    ///
    /// The user directory defaults to `users.json` in the archive. A
    /// channel that fails is logged and skipped; the others still convert.
    ///
    /// # Errors
    ///
    /// Returns an error if the user directory or the channel list cannot be
    /// read, or if any channel failed.
    pub fn convert_archive(
        &self,
        archive_dir: &Path,
        users: Option<&Path>,
    ) -> Result<Vec<ChannelReport>, Error> {
        let users_path = users.map_or_else(
            || archive_dir.join(archive::USER_DIRECTORY_FILE),
            Path::to_path_buf,
        );
        let mut profiles = archive::load_user_directory(&users_path).context(LoadUsersSnafu)?;

        let channels = archive::list_channels(archive_dir).context(ListChannelsSnafu {
            archive: archive_dir,
        })?;
        info!(
            archive = %archive_dir.display(),
            channels = channels.len(),
            users = profiles.len(),
            "converting archive"
        );

        let mut reports = Vec::with_capacity(channels.len());
        let mut failed = 0usize;
        for channel in &channels {
            match self.convert_channel(channel, &mut profiles) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(channel = %channel.name, "{e}");
                    failed += 1;
                }
            }
        }

        ensure!(
            failed == 0,
            ChannelsFailedSnafu {
                archive: archive_dir,
                failed,
                total: channels.len(),
            }
        );
        Ok(reports)
    }

    /// Converts the single channel stored in `channel_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the user directory was given but cannot be read,
    /// or if the channel cannot be converted.
    pub fn convert_channel_dir(
        &self,
        channel_dir: &Path,
        users: Option<&Path>,
    ) -> Result<ChannelReport, Error> {
        let channel = ChannelSource::from_dir(channel_dir).context(ChannelNameSnafu {
            path: channel_dir,
        })?;
        let mut profiles = match users {
            Some(path) => archive::load_user_directory(path).context(LoadUsersSnafu)?,
            None => ProfileTable::new(),
        };
        self.convert_channel(&channel, &mut profiles)
    }

    /// Converts one channel, adding any profiles it embeds to `profiles`.
    ///
    /// # Errors
    ///
    /// Returns an error if a message file cannot be read or the document
    /// cannot be written. Nothing is fetched or written when loading fails.
    pub fn convert_channel(
        &self,
        channel: &ChannelSource,
        profiles: &mut ProfileTable,
    ) -> Result<ChannelReport, Error> {
        let name = channel.name.as_str();
        info!(channel = name, "processing channel");

        let mut messages = archive::load_channel(&channel.dir)
            .context(LoadChannelSnafu { channel: name })?;
        prepare_messages(&mut messages, profiles);

        let requests = download::plan_downloads(&mut messages, name, &self.options.output_dir);
        let failed_downloads = if self.options.dry_run {
            info!(channel = name, "would download {} file(s)", requests.len());
            0
        } else if self.options.download {
            download::fetch_all(self.downloader.as_ref(), &requests)
        } else {
            debug!(channel = name, skipped = requests.len(), "downloads disabled");
            0
        };

        let count = messages.len();
        let page = self.skeleton.assemble(&render_channel(messages));
        let output = document::document_path(&self.options.output_dir, name);

        if self.options.dry_run {
            info!(channel = name, "would write {}", output.display());
        } else {
            document::write_document(&output, &page).context(WriteChannelSnafu { channel: name })?;
            info!(channel = name, messages = count, "wrote {}", output.display());
        }

        Ok(ChannelReport {
            channel: name.to_owned(),
            messages: count,
            downloads: requests.len(),
            failed_downloads,
            output,
        })
    }
}

/// Prunes deleted attachments, resolves profiles and rewrites text.
pub fn prepare_messages(messages: &mut [Message], profiles: &mut ProfileTable) {
    download::prune_tombstones(messages);
    hydrate::hydrate(messages, profiles);
    text::normalize_messages(messages, profiles);
}

/// Orders prepared messages for display and renders them.
#[must_use]
pub fn render_channel(messages: Vec<Message>) -> Node {
    renderer::render_messages(&thread::reconstruct(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_messages;

    #[test]
    fn prepares_then_renders() {
        let mut messages = parse_messages(
            r#"[
                {"ts": "2", "thread_ts": "1", "parent_user_id": "U1", "user": "U2", "text": "thanks <@U1>"},
                {"ts": "1", "thread_ts": "1", "user": "U1", "text": "hello :wave:",
                 "replies": [{"ts": "2"}],
                 "user_profile": {"display_name": "ann"},
                 "files": [{"id": "F0", "mode": "tombstone"}]}
            ]"#,
        )
        .unwrap();
        let mut profiles = ProfileTable::new();

        prepare_messages(&mut messages, &mut profiles);
        let html = render_channel(messages).to_string();

        assert!(html.contains("hello 👋"));
        assert!(html.contains(r#"thanks <span class="mention">@ann</span>"#));
        assert!(!html.contains("F0"));
        assert!(html.find("hello").unwrap() < html.find("thanks").unwrap());
    }

    #[test]
    fn default_options() {
        let options = Options::default();

        assert_eq!(options.output_dir, PathBuf::from("output_html"));
        assert!(options.download);
        assert!(!options.dry_run);
        assert!(options.template.is_none());
    }
}
