use std::time::Duration;

use bytes::Bytes;
use drive_client::{ChunkResponse, RemoteTransport};
use error_printer::ErrorPrinter;
use tracing::{debug, info, warn};

use crate::error::{Result, UploadError};

/// One byte range `[offset, end)` of a resumable upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: u64,
    pub offset: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.offset
    }

    /// `Content-Range` header value, inclusive on both ends.
    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.offset, self.end - 1, total)
    }
}

pub fn chunk_count(size: u64, chunk_size: u64) -> u64 {
    size.div_ceil(chunk_size)
}

/// The range of the chunk starting at `offset`. Errors if `offset` does not lie inside the item.
pub fn chunk_range(offset: u64, size: u64, chunk_size: u64) -> Result<ChunkRange> {
    if offset >= size {
        return Err(UploadError::OffsetOutOfRange { offset, size });
    }
    Ok(ChunkRange {
        index: offset / chunk_size,
        offset,
        end: offset.saturating_add(chunk_size).min(size),
    })
}

/// Consecutive, non-overlapping ranges covering `[0, size)` in increasing order.
pub fn chunk_ranges(size: u64, chunk_size: u64) -> impl Iterator<Item = ChunkRange> {
    (0..chunk_count(size, chunk_size)).map(move |index| {
        let offset = index * chunk_size;
        ChunkRange {
            index,
            offset,
            end: (offset + chunk_size).min(size),
        }
    })
}

/// Delays between attempts at the same chunk: `base, 2*base, 4*base, ...`, without bound.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    next: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration) -> Self {
        Self { next: base }
    }
}

impl Iterator for ExponentialBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = current.saturating_mul(2);
        Some(current)
    }
}

/// Sends the payload of an upload session chunk by chunk, in offset order.
pub(crate) struct ChunkScheduler<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub data: &'a Bytes,
    pub chunk_size: u64,
    pub base_backoff: Duration,
    /// Called once for every retry after a server error.
    pub on_retry: &'a (dyn Fn() + Send + Sync),
}

impl ChunkScheduler<'_> {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Sends the chunk beginning at `offset` once.
    pub async fn upload_chunk<T: RemoteTransport + ?Sized>(
        &self,
        transport: &T,
        upload_url: &str,
        offset: u64,
    ) -> Result<ChunkResponse> {
        if upload_url.is_empty() {
            return Err(UploadError::MissingUploadUrl);
        }
        let range = chunk_range(offset, self.size(), self.chunk_size)?;

        // A stale token would fail the next authenticated request, not this one.
        let _ = transport
            .refresh()
            .await
            .warn_error(format!("Failed to refresh credentials before uploading chunk of {}", self.name));

        let body = self.data.slice(range.offset as usize..range.end as usize);
        let response = transport
            .put_chunk(upload_url, &range.content_range(self.size()), body)
            .await?;
        Ok(response)
    }

    /// Uploads every chunk and returns the body of the reply to the final one.
    pub async fn run<T: RemoteTransport + ?Sized>(&self, transport: &T, upload_url: &str) -> Result<Bytes> {
        let size = self.size();
        let nchunks = chunk_count(size, self.chunk_size);
        let mut last_body = Bytes::new();

        for range in chunk_ranges(size, self.chunk_size) {
            let mut backoff = ExponentialBackoff::new(self.base_backoff);
            let mut response = self.upload_chunk(transport, upload_url, range.offset).await?;

            while response.is_server_error() {
                let delay = backoff.next().unwrap_or(self.base_backoff);
                warn!(
                    id = self.id,
                    name = self.name,
                    chunk = range.index,
                    nchunks,
                    status = response.status,
                    "Server error uploading chunk, retrying in {delay:?}"
                );
                tokio::time::sleep(delay).await;
                (self.on_retry)();
                response = self.upload_chunk(transport, upload_url, range.offset).await?;
            }

            if response.is_client_error() {
                let body = String::from_utf8_lossy(&response.body).into_owned();
                warn!(
                    id = self.id,
                    name = self.name,
                    chunk = range.index,
                    nchunks,
                    status = response.status,
                    "Chunk rejected by server"
                );
                return Err(UploadError::ChunkRejected {
                    status: response.status,
                    body,
                });
            }

            debug!(id = self.id, chunk = range.index, nchunks, status = response.status, "Uploaded chunk");
            last_body = response.body;
        }

        info!(id = self.id, name = self.name, nchunks, "All chunks uploaded");
        Ok(last_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_ranges_tile_without_gaps() {
        let size = 25 * MIB;
        let ranges: Vec<_> = chunk_ranges(size, 10 * MIB).collect();
        assert_eq!(ranges.len(), 3);
        assert_eq!(ranges[0].offset, 0);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].offset);
        }
        assert_eq!(ranges[2].end, size);
        assert_eq!(ranges[2].len(), 5 * MIB);
        assert_eq!(ranges.iter().map(ChunkRange::len).sum::<u64>(), size);
    }

    #[test]
    fn test_exact_multiple() {
        let ranges: Vec<_> = chunk_ranges(20 * MIB, 10 * MIB).collect();
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[1].len(), 10 * MIB);
        assert_eq!(chunk_count(0, 10 * MIB), 0);
        assert_eq!(chunk_count(1, 10 * MIB), 1);
    }

    #[test]
    fn test_content_range_is_inclusive() {
        let range = chunk_range(20 * MIB, 25 * MIB, 10 * MIB).unwrap();
        assert_eq!(range.index, 2);
        assert_eq!(range.content_range(25 * MIB), "bytes 20971520-26214399/26214400");
        assert_eq!(range.len(), 5 * MIB);
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(matches!(
            chunk_range(10, 10, 4),
            Err(UploadError::OffsetOutOfRange { offset: 10, size: 10 })
        ));
    }

    #[test]
    fn test_backoff_doubles() {
        let delays: Vec<_> = ExponentialBackoff::new(Duration::from_secs(1)).take(4).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
    }

    #[test]
    fn test_backoff_saturates() {
        let mut backoff = ExponentialBackoff::new(Duration::MAX / 2);
        backoff.next();
        backoff.next();
        assert_eq!(backoff.next(), Some(Duration::MAX));
    }
}
