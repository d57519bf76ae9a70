//! Serve a single file over HTTP to exactly one client, then shut down.
//!
//! The heart of the crate is [`ServeOnce`]: an HTTP listener bound to a
//! single [`ServableFile`] that answers exactly one meaningful request
//! (a download of the file, or a 404 for an unknown path) and then tears
//! itself down. Favicon probes from browsers do not count against the
//! single-transfer budget.
//!
//! # Example
//! ```no_run
//! use quick_transfer::{ServableFile, ServeOnce};
//!
//! # async {
//! let file = ServableFile::open("notes.txt").await?;
//! let server = ServeOnce::new(file)
//!     .bind(([0, 0, 0, 0], 0).into())
//!     .await?;
//! println!("listening on {}", server.local_addr());
//! server.serve().await?;
//! # Ok::<_, quick_transfer::Error>(())
//! # };
//! ```

use std::io;

use bytes::Bytes;
use http_body::combinators::BoxBody;

pub use error::{Error, Result};
pub use file::{ContentReader, FileContent, ServableFile};
pub use serve_once::{BoundServer, ServeOnce, TransferOutcome};
pub use stat_stream::{StatStream, StreamStats};

mod body;
pub mod cli;
pub mod display;
mod error;
mod file;
pub mod input;
pub mod logging;
mod serve_once;
mod stat_stream;

pub type ResponseBody = BoxBody<Bytes, io::Error>;
