use bytes::Bytes;

use crate::error::Result;

/// The reply to a single chunk PUT. Any status is a valid reply here; only failures that
/// prevented the request from completing are reported as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ChunkResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }
}

/// Requests the upload engine needs from the remote drive API.
///
/// Resources passed to `put` and `post` are paths relative to the API endpoint
/// (e.g. `/me/drive/items/{id}/content`) and are sent with the caller's bearer token.
/// Non-success replies to those calls are errors. `delete` and `put_chunk` target absolute,
/// pre-authorized upload URLs and carry no bearer token.
#[async_trait::async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Replace content at `resource`, returning the response body.
    async fn put(&self, resource: &str, body: Bytes) -> Result<Bytes>;

    /// POST a JSON body to `resource`, returning the response body.
    async fn post(&self, resource: &str, body: Bytes) -> Result<Bytes>;

    /// Delete the object at an absolute URL.
    async fn delete(&self, url: &str) -> Result<()>;

    /// Upload one byte range of a resumable session. `content_range` is the full header value,
    /// e.g. `bytes 0-1023/4096`; the content length is the length of `body`.
    async fn put_chunk(&self, upload_url: &str, content_range: &str, body: Bytes) -> Result<ChunkResponse>;

    /// Make sure the credentials used by authenticated calls are not about to expire.
    async fn refresh(&self) -> Result<()>;
}
