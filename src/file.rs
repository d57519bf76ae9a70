//! The servable file descriptor: the one logical file a run of the tool
//! exposes, whether it came from disk, stdin or a generated archive.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use bytes::Bytes;
use http::HeaderValue;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::Result;

/// Byte content of a [`ServableFile`]. Read at most once.
#[derive(Debug)]
pub enum FileContent {
    /// An open file on disk, streamed during the response.
    Disk(File),
    /// Fully buffered bytes (stdin capture, generated archive).
    Memory(Bytes),
}

impl FileContent {
    pub(crate) fn into_reader(self) -> ContentReader {
        match self {
            FileContent::Disk(file) => ContentReader::Disk(file),
            FileContent::Memory(bytes) => ContentReader::Memory(io::Cursor::new(bytes)),
        }
    }
}

/// Single-use reader over a [`FileContent`].
#[derive(Debug)]
pub enum ContentReader {
    Disk(File),
    Memory(io::Cursor<Bytes>),
}

impl AsyncRead for ContentReader {
    #[inline]
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ContentReader::Disk(file) => Pin::new(file).poll_read(cx, buf),
            ContentReader::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
        }
    }
}

/// The single logical file this process serves.
///
/// The logical path is used only for naming: it decides the served URL path,
/// the `Content-Disposition` filename and the guessed `Content-Type`. The
/// size must be final by the time the descriptor is handed to the server;
/// the input resolver enforces that for streamed sources.
#[derive(Debug)]
pub struct ServableFile {
    logical_path: PathBuf,
    size: u64,
    modified: SystemTime,
    content: FileContent,
}

impl ServableFile {
    pub fn new(
        logical_path: impl Into<PathBuf>,
        size: u64,
        modified: SystemTime,
        content: FileContent,
    ) -> Self {
        Self {
            logical_path: logical_path.into(),
            size,
            modified,
            content,
        }
    }

    /// Open a file on disk, taking size and modification time from its
    /// metadata. The file itself is the logical path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        let metadata = file.metadata().await?;
        let modified = metadata.modified().unwrap_or_else(|_| SystemTime::now());

        Ok(Self::new(
            path,
            metadata.len(),
            modified,
            FileContent::Disk(file),
        ))
    }

    /// Filename component of the logical path.
    pub fn basename(&self) -> String {
        self.logical_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The URL path the server answers with the file: `/` + basename.
    pub fn expected_path(&self) -> String {
        format!("/{}", self.basename())
    }

    /// `Content-Type` guessed from the logical path's extension, falling
    /// back to `text/plain` for unrecognized extensions.
    pub fn mime_header_value(&self) -> HeaderValue {
        mime_guess::from_path(&self.logical_path)
            .first_raw()
            .map(HeaderValue::from_static)
            .unwrap_or_else(|| HeaderValue::from_static("text/plain"))
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub(crate) fn into_content(self) -> FileContent {
        self.content
    }
}
