//! Command line definition.

use std::net::Ipv4Addr;

use clap::Parser;
use tracing::{debug, warn};

use crate::input::InputOptions;

#[derive(Parser, Debug)]
#[command(
    name = "quick-transfer",
    version,
    about = "Serve one file over HTTP to exactly one client, then exit"
)]
pub struct Cli {
    /// IPv4 address for the server to bind on when listening for requests
    #[arg(short, long, default_value = "0.0.0.0")]
    pub address: Ipv4Addr,

    /// IPv4 address to use as host part of the displayed URL
    #[arg(short, long)]
    pub display: Option<Ipv4Addr>,

    /// Override the file extension
    #[arg(short, long)]
    pub extension: Option<String>,

    /// Override the filename. Default "stdin.txt" or "archive.zip" depending
    /// on arguments
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Force a single argument to be treated as a glob pattern and create an
    /// archive file
    #[arg(short, long)]
    pub glob: bool,

    /// Server port number instead of a system assigned one
    #[arg(short, long, default_value_t = 0)]
    pub port: u16,

    /// Content-Type to use, also changes the extension of the filename.
    /// Overrides -e
    #[arg(short = 't', long = "type", value_name = "CONTENT_TYPE")]
    pub content_type: Option<String>,

    /// Output debugging information
    #[arg(short, long)]
    pub verbose: bool,

    /// Files to serve. None reads stdin, several are served as one archive
    pub files: Vec<String>,
}

impl Cli {
    /// Naming options for the input resolver, with `--type` folded into an
    /// extension override.
    pub fn input_options(&self) -> InputOptions {
        let mut extension = self.extension.clone();

        if let Some(content_type) = &self.content_type {
            if extension.is_some() {
                warn!("both --extension and --type provided, respecting only --type");
            }

            if let Some(ext) = extension_for_type(content_type) {
                debug!(%content_type, extension = ext, "type parsed to extension");

                extension = Some(ext.to_owned());
            }
        }

        InputOptions {
            filename: self.filename.clone(),
            extension,
            glob: self.glob,
        }
    }
}

fn extension_for_type(content_type: &str) -> Option<&'static str> {
    mime_guess::get_mime_extensions_str(content_type).and_then(|exts| exts.first().copied())
}
