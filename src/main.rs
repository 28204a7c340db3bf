// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for slack2html.
//!
//! This binary provides the `slack2html` command for converting a Slack
//! export (a whole archive or a single channel directory) to HTML.

use lexopt::prelude::*;
use slack2html::download::{self, HttpDownloader};
use slack2html::pipeline::{self, Converter, Options};
use snafu::prelude::*;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// What the input directory contains.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// A single channel's message files.
    Channel,
    /// `users.json` plus one subdirectory per channel.
    Archive,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

struct Cli {
    input: PathBuf,
    mode: Mode,
    users: Option<PathBuf>,
    options: Options,
    verbosity: Verbosity,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to set up downloads: {source}"))]
    Downloader { source: download::DownloadError },

    #[snafu(display("{source}"))]
    Convert { source: pipeline::Error },
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert Slack export archives to static HTML

Usage: {name} [OPTIONS] <DIR>

Arguments:
  <DIR>  A channel directory, or an archive directory with --archive

Options:
  -c, --channel             Treat <DIR> as a single channel (default)
  -a, --archive             Treat <DIR> as an archive of channel subdirectories
  -o, --output <DIR>        Output directory (default: {output})
      --users <FILE>        User directory (default in archive mode: <DIR>/users.json)
      --template <FILE>     Page template with a class=\"messages\" container
      --no-download         Do not fetch attachments

Other options:
  -q, --quiet               Only report warnings and errors
  -v, --verbose             Report per-message diagnostics
  -n, --dry-run             Show what would be written without fetching or writing
  -h, --help                Print help
  -V, --version             Print version

Log output can also be filtered with RUST_LOG.",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        output = pipeline::DEFAULT_OUTPUT_DIR,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input: Option<PathBuf> = None;
    let mut mode = Mode::Channel;
    let mut users = None;
    let mut options = Options::default();
    let mut verbosity = Verbosity::Normal;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('c') | Long("channel") => mode = Mode::Channel,
            Short('a') | Long("archive") => mode = Mode::Archive,
            Short('o') | Long("output") => options.output_dir = parser.value()?.parse()?,
            Long("users") => users = Some(parser.value()?.parse()?),
            Long("template") => options.template = Some(parser.value()?.parse()?),
            Long("no-download") => options.download = false,
            Short('n') | Long("dry-run") => options.dry_run = true,
            // Last one wins
            Short('q') | Long("quiet") => verbosity = Verbosity::Quiet,
            Short('v') | Long("verbose") => verbosity = Verbosity::Verbose,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input: input.ok_or("missing required argument: <DIR>")?,
        mode,
        users,
        options,
        verbosity,
    })
}

fn init_logging(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Quiet => "slack2html=warn",
        Verbosity::Normal => "slack2html=info",
        Verbosity::Verbose => "slack2html=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;
    init_logging(cli.verbosity);

    let downloader = HttpDownloader::new(DOWNLOAD_TIMEOUT).context(DownloaderSnafu)?;
    let converter = Converter::new(cli.options, Box::new(downloader)).context(ConvertSnafu)?;

    match cli.mode {
        Mode::Archive => {
            converter
                .convert_archive(&cli.input, cli.users.as_deref())
                .context(ConvertSnafu)?;
        }
        Mode::Channel => {
            converter
                .convert_channel_dir(&cli.input, cli.users.as_deref())
                .context(ConvertSnafu)?;
        }
    }

    Ok(())
}
