//! Response bodies for the one-shot server.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use http::HeaderMap;
use http_body::{Body, Full, SizeHint};
use pin_project::pin_project;
use tokio_util::io::ReaderStream;

use crate::file::ContentReader;
use crate::ResponseBody;

// default read capacity 64KiB
const DEFAULT_CAPACITY: usize = 65536;

/// Body that streams a [`ContentReader`] to the response, chunk by chunk,
/// advertising the descriptor's known size.
#[pin_project]
#[derive(Debug)]
struct FileBody {
    #[pin]
    stream: ReaderStream<ContentReader>,
    remaining: u64,
}

impl Body for FileBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_data(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        let this = self.project();

        match this.stream.poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                *this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}

/// Stream the file content as a response body of `len` bytes.
pub(crate) fn file_body(reader: ContentReader, len: u64) -> ResponseBody {
    FileBody {
        stream: ReaderStream::with_capacity(reader, DEFAULT_CAPACITY),
        remaining: len,
    }
    .boxed()
}

/// Fixed plaintext body, used for 404 responses.
pub(crate) fn text_body(text: String) -> ResponseBody {
    Full::from(Bytes::from(text))
        .map_err(|err| match err {})
        .boxed()
}
