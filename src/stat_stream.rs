//! Size accounting for byte sources whose length is not known up front
//! (stdin captures and generated archives).

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::watch;
use tracing::debug;

// Nominal filesystem block size used for the derived block count.
const BLOCK_SIZE: u64 = 4096;
const BLOCKS_PER_CHUNK: u64 = 8;

/// Shared handle to the running statistics of a [`StatStream`].
///
/// The size grows monotonically while the stream is being read and freezes
/// once the underlying source reaches end-of-data.
#[derive(Debug, Clone)]
pub struct StreamStats {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    size: AtomicU64,
    done: watch::Sender<bool>,
}

impl StreamStats {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);

        Self {
            shared: Arc::new(Shared {
                size: AtomicU64::new(0),
                done,
            }),
        }
    }

    /// Bytes seen so far, or the final size once [`is_finalized`] is true.
    ///
    /// [`is_finalized`]: StreamStats::is_finalized
    pub fn size(&self) -> u64 {
        self.shared.size.load(Ordering::Acquire)
    }

    /// Derived block count for the current size.
    pub fn blocks(&self) -> u64 {
        self.size().div_ceil(BLOCK_SIZE) * BLOCKS_PER_CHUNK
    }

    pub fn is_finalized(&self) -> bool {
        *self.shared.done.borrow()
    }

    /// Wait until the underlying source has been fully consumed and the
    /// size is frozen. Resolves immediately if already finalized.
    pub async fn finalized(&self) {
        let mut rx = self.shared.done.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }

    fn record(&self, n: u64) {
        if self.is_finalized() {
            return;
        }

        let size = self.shared.size.fetch_add(n, Ordering::AcqRel) + n;

        debug!(bytes = n, size, "processed chunk");
    }

    fn finalize(&self) {
        if !self.shared.done.send_replace(true) {
            debug!(size = self.size(), "stream finalized");
        }
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter that passes every chunk of `R` through unchanged while updating
/// a [`StreamStats`] as a side effect.
#[pin_project]
#[derive(Debug)]
pub struct StatStream<R> {
    #[pin]
    inner: R,
    stats: StreamStats,
}

impl<R> StatStream<R> {
    pub fn new(inner: R, stats: StreamStats) -> Self {
        Self { inner, stats }
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

impl<R: AsyncRead> AsyncRead for StatStream<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();

        let before = buf.filled().len();
        match this.inner.poll_read(cx, buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Ready(Ok(())) => {
                let n = buf.filled().len() - before;
                if n == 0 {
                    this.stats.finalize();
                } else {
                    this.stats.record(n as u64);
                }

                Poll::Ready(Ok(()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio::io::AsyncReadExt;

    use super::*;

    #[tokio::test]
    async fn counts_and_finalizes() {
        let stats = StreamStats::new();
        let mut stream = StatStream::new(Cursor::new(vec![7u8; 5000]), stats.clone());

        assert_eq!(stats.size(), 0);
        assert!(!stats.is_finalized());

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();

        assert_eq!(out.len(), 5000);
        assert_eq!(stats.size(), 5000);
        // ceil(5000 / 4096) * 8
        assert_eq!(stats.blocks(), 16);
        assert!(stats.is_finalized());
    }

    #[tokio::test]
    async fn passes_data_through_unchanged() {
        let stats = StreamStats::new();
        let mut stream = StatStream::new(Cursor::new(b"hello".to_vec()), stats.clone());

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();

        assert_eq!(out, b"hello");
        assert_eq!(stats.size(), 5);
        assert_eq!(stats.blocks(), 8);
    }

    #[tokio::test]
    async fn finalized_resolves_after_eof() {
        let stats = StreamStats::new();
        let mut stream = StatStream::new(Cursor::new(b"abc".to_vec()), stats.clone());

        let waiter = {
            let stats = stats.clone();
            tokio::spawn(async move {
                stats.finalized().await;
                stats.size()
            })
        };

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();

        assert_eq!(waiter.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn size_frozen_after_finalize() {
        let stats = StreamStats::new();
        let mut stream = StatStream::new(Cursor::new(b"abc".to_vec()), stats.clone());

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert!(stats.is_finalized());

        stats.record(100);
        assert_eq!(stats.size(), 3);
    }

    #[tokio::test]
    async fn empty_source_finalizes_at_zero() {
        let stats = StreamStats::new();
        let mut stream = StatStream::new(Cursor::new(Vec::new()), stats.clone());

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();

        assert!(stats.is_finalized());
        assert_eq!(stats.size(), 0);
        assert_eq!(stats.blocks(), 0);
    }
}
