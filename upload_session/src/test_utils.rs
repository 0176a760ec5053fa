//! In-memory [`RemoteTransport`] for exercising uploads without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use drive_client::{ChunkResponse, DriveClientError, RemoteTransport, Result, StatusCode};
use parking_lot::Mutex;
use tokio::time::Instant;

pub const MOCK_UPLOAD_URL: &str = "https://upload.mock/session/1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedRequest {
    Put { resource: String, len: usize },
    Post { resource: String, body: serde_json::Value },
    Delete { url: String },
    Chunk { url: String, content_range: String, len: usize, at: Instant },
    Refresh,
}

/// Scriptable transport that records every call.
///
/// Unscripted calls succeed: content PUTs and the final chunk return the configured remote
/// item, intermediate chunks return `202`, and session creation returns [`MOCK_UPLOAD_URL`].
#[derive(Debug)]
pub struct MockTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    put_replies: Mutex<VecDeque<Result<Bytes>>>,
    post_replies: Mutex<VecDeque<Result<Bytes>>>,
    chunk_replies: Mutex<HashMap<u64, VecDeque<Result<ChunkResponse>>>>,
    remote_item: Mutex<Bytes>,
    fail_refresh: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            put_replies: Mutex::new(VecDeque::new()),
            post_replies: Mutex::new(VecDeque::new()),
            chunk_replies: Mutex::new(HashMap::new()),
            remote_item: Mutex::new(Bytes::from_static(b"{}")),
            fail_refresh: AtomicBool::new(false),
            latency: Mutex::new(None),
        }
    }

    /// Transport whose completed uploads report `sha1` as the remote hash.
    pub fn with_remote_sha1(id: &str, sha1: &str) -> Self {
        let transport = Self::new();
        transport.set_remote_item(drive_item_body(id, sha1));
        transport
    }

    pub fn set_remote_item(&self, body: Bytes) {
        *self.remote_item.lock() = body;
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn fail_refresh(&self) {
        self.fail_refresh.store(true, Ordering::SeqCst);
    }

    pub fn push_put(&self, reply: Result<Bytes>) {
        self.put_replies.lock().push_back(reply);
    }

    pub fn push_post(&self, reply: Result<Bytes>) {
        self.post_replies.lock().push_back(reply);
    }

    /// Queues a reply for the next upload of the chunk starting at `offset`.
    pub fn push_chunk(&self, offset: u64, reply: Result<ChunkResponse>) {
        self.chunk_replies.lock().entry(offset).or_default().push_back(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&RecordedRequest) -> bool) -> usize {
        self.requests.lock().iter().filter(|&r| pred(r)).count()
    }

    /// `(content_range, len, at)` of every chunk request, in order.
    pub fn chunks(&self) -> Vec<(String, usize, Instant)> {
        self.requests
            .lock()
            .iter()
            .filter_map(|r| match r {
                RecordedRequest::Chunk {
                    content_range, len, at, ..
                } => Some((content_range.clone(), *len, *at)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests.lock().push(request);
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

/// Parses `bytes {first}-{last}/{total}`.
fn parse_content_range(content_range: &str) -> Option<(u64, u64, u64)> {
    let (range, total) = content_range.strip_prefix("bytes ")?.split_once('/')?;
    let (first, last) = range.split_once('-')?;
    Some((first.parse().ok()?, last.parse().ok()?, total.parse().ok()?))
}

/// JSON body of a remote file item reporting `sha1` as its SHA1 hash.
pub fn drive_item_body(id: &str, sha1: &str) -> Bytes {
    let body = serde_json::json!({
        "id": id,
        "name": "remote",
        "file": { "hashes": { "sha1Hash": sha1 } }
    });
    Bytes::from(body.to_string())
}

/// The error the drive API returns when an item changed while it was being replaced.
pub fn resource_modified() -> DriveClientError {
    DriveClientError::Api {
        status: StatusCode::CONFLICT,
        body: r#"{"error":{"code":"resourceModified","message":"ETag does not match current item's value"}}"#.to_string(),
    }
}

pub fn api_error(status: StatusCode, body: &str) -> DriveClientError {
    DriveClientError::Api {
        status,
        body: body.to_string(),
    }
}

#[async_trait::async_trait]
impl RemoteTransport for MockTransport {
    async fn put(&self, resource: &str, body: Bytes) -> Result<Bytes> {
        self.delay().await;
        self.record(RecordedRequest::Put {
            resource: resource.to_owned(),
            len: body.len(),
        });
        let scripted = self.put_replies.lock().pop_front();
        scripted.unwrap_or_else(|| Ok(self.remote_item.lock().clone()))
    }

    async fn post(&self, resource: &str, body: Bytes) -> Result<Bytes> {
        self.delay().await;
        self.record(RecordedRequest::Post {
            resource: resource.to_owned(),
            body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
        });
        let scripted = self.post_replies.lock().pop_front();
        scripted.unwrap_or_else(|| {
            let body = serde_json::json!({
                "uploadUrl": MOCK_UPLOAD_URL,
                "expirationDateTime": "2030-01-01T00:00:00Z",
                "nextExpectedRanges": ["0-"]
            });
            Ok(Bytes::from(body.to_string()))
        })
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.delay().await;
        self.record(RecordedRequest::Delete { url: url.to_owned() });
        Ok(())
    }

    async fn put_chunk(&self, upload_url: &str, content_range: &str, body: Bytes) -> Result<ChunkResponse> {
        self.delay().await;
        self.record(RecordedRequest::Chunk {
            url: upload_url.to_owned(),
            content_range: content_range.to_owned(),
            len: body.len(),
            at: Instant::now(),
        });

        let Some((first, last, total)) = parse_content_range(content_range) else {
            return Ok(ChunkResponse::new(400, "malformed Content-Range"));
        };
        let scripted = self.chunk_replies.lock().get_mut(&first).and_then(VecDeque::pop_front);
        if let Some(reply) = scripted {
            return reply;
        }
        if last + 1 == total {
            Ok(ChunkResponse::new(200, self.remote_item.lock().clone()))
        } else {
            Ok(ChunkResponse::new(202, format!(r#"{{"nextExpectedRanges":["{}-"]}}"#, last + 1)))
        }
    }

    async fn refresh(&self) -> Result<()> {
        self.record(RecordedRequest::Refresh);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(DriveClientError::AuthError(utils::errors::AuthError::NoToken));
        }
        Ok(())
    }
}
