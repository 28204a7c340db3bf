// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Materializing attachments next to the rendered documents.
//!
//! Before a channel is rendered every attachment gets a `local_file` path
//! relative to the output directory (`<channel>/<id>_<created>_<name>`).
//! Files that are not already on disk are turned into [`DownloadRequest`]s
//! and handed to a [`Downloader`].

use crate::parser::Message;
use snafu::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Error type for a single failed download.
#[derive(Debug, Snafu)]
pub enum DownloadError {
    /// The HTTP client could not be built.
    #[snafu(display("failed to create HTTP client: {source}"))]
    Client {
        /// The underlying client error.
        source: reqwest::Error,
    },

    /// The request failed or the server returned an error status.
    #[snafu(display("failed to fetch {url}: {source}"))]
    Fetch {
        /// The URL that was requested.
        url: String,
        /// The underlying HTTP error.
        source: reqwest::Error,
    },

    /// The destination directory could not be created.
    #[snafu(display("failed to create {}: {source}", path.display()))]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The downloaded bytes could not be written.
    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write {
        /// The destination file.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// A file that needs to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Where to fetch the file from.
    pub source_url: String,
    /// Where to store it.
    pub destination: PathBuf,
}

/// Fetches attachment files.
pub trait Downloader {
    /// Fetches one file to `request.destination`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file could not be fetched or written.
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

/// Downloads files over HTTP, one at a time.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    /// Creates a downloader with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context(ClientSnafu)?;
        Ok(Self { client })
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        let url = &request.source_url;
        let mut response = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .context(FetchSnafu { url })?;

        // Stream into a sibling temp file so an interrupted transfer never
        // leaves a partial file at the destination.
        let path = &request.destination;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).context(CreateDirSnafu { path: parent })?;
        let mut partial = NamedTempFile::new_in(parent).context(WriteSnafu { path })?;
        response
            .copy_to(partial.as_file_mut())
            .map_err(io::Error::other)
            .context(WriteSnafu { path })?;
        partial
            .persist(path)
            .map_err(|e| e.error)
            .context(WriteSnafu { path })?;
        Ok(())
    }
}

/// Removes deleted-file placeholders from every message.
///
/// This runs before anything else looks at attachments, so tombstones are
/// never rendered or downloaded.
pub fn prune_tombstones(messages: &mut [Message]) {
    for message in messages {
        message.files.retain(|f| !f.is_tombstone());
    }
}

/// Assigns `local_file` to every attachment and returns the downloads still
/// needed.
///
/// `local_file` is set whether or not a download is needed, so files that
/// are already present in `output_dir` still render. Attachments without a
/// source URL get a path but no request.
pub fn plan_downloads(
    messages: &mut [Message],
    channel: &str,
    output_dir: &Path,
) -> Vec<DownloadRequest> {
    let channel_dir = output_dir.join(channel);
    let mut requests = Vec::new();

    for file in messages.iter_mut().flat_map(|m| m.files.iter_mut()) {
        let file_name = local_file_name(&file.id, file.created, &file.name);
        let destination = channel_dir.join(&file_name);
        file.local_file = Some(format!("{channel}/{file_name}"));

        if destination.exists() {
            debug!(file = %file_name, "already downloaded");
            continue;
        }
        match &file.source_url {
            Some(url) => requests.push(DownloadRequest {
                source_url: url.clone(),
                destination,
            }),
            None => debug!(file = %file_name, "attachment has no download URL"),
        }
    }

    requests
}

/// Runs every request through `downloader`, logging failures.
///
/// Returns the number of failed downloads.
pub fn fetch_all(downloader: &dyn Downloader, requests: &[DownloadRequest]) -> usize {
    let mut failed = 0;
    for request in requests {
        if let Err(e) = downloader.download(request) {
            warn!(destination = %request.destination.display(), "download failed: {e}");
            failed += 1;
        }
    }
    failed
}

/// Builds `<id>_<created>_<name>`, keeping path separators out of the result.
fn local_file_name(id: &str, created: Option<i64>, name: &str) -> String {
    let created = created.map(|c| c.to_string()).unwrap_or_default();
    format!("{id}_{created}_{name}").replace(['/', '\\'], "_")
}
