use std::sync::Arc;

use drive_client::DriveClientError;
use thiserror::Error;

/// Everything that can end an upload. Cloneable so the same error can be kept in the
/// session's status and returned to the caller of `upload`.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum UploadError {
    #[error("Could not obtain remote ID for upload")]
    MissingRemoteId,

    #[error("Item {0} has only a local ID and is not known to the server yet")]
    LocalOnlyId(String),

    #[error("Snapshot data was missing")]
    MissingData,

    #[error("Both snapshot checksums were missing")]
    MissingChecksum,

    #[error("Snapshot size {size} does not match its data length {len}")]
    SizeMismatch { size: u64, len: u64 },

    #[error("Invalid upload configuration: {0}")]
    ConfigurationError(String),

    #[error("Upload was already started for this session")]
    AlreadyStarted,

    /// The request could not be made or the connection failed outright.
    #[error("Transport Error: {0}")]
    Transport(#[source] Arc<DriveClientError>),

    /// The server rejected an authenticated request; the message is the server's reply.
    #[error("{0}")]
    Remote(#[source] Arc<DriveClientError>),

    /// A chunk was rejected with a 4xx status; the message is the response body verbatim.
    #[error("{body}")]
    ChunkRejected { status: u16, body: String },

    #[error("Upload session request could not be encoded: {0}")]
    InvalidSessionRequest(#[source] Arc<serde_json::Error>),

    #[error("Upload session response could not be parsed: {0}")]
    InvalidSessionResponse(#[source] Arc<serde_json::Error>),

    #[error("Upload session URL cannot be empty")]
    MissingUploadUrl,

    #[error("Offset {offset} is out of range for an item of size {size}")]
    OffsetOutOfRange { offset: u64, size: u64 },

    #[error("Remote checksum did not match (local {local}, remote {})", .remote.as_deref().unwrap_or("<none>"))]
    ChecksumMismatch { local: String, remote: Option<String> },

    #[error("Remote checksum did not match: final response could not be parsed: {0}")]
    UnparsableResponse(#[source] Arc<serde_json::Error>),
}

pub type Result<T> = std::result::Result<T, UploadError>;

impl UploadError {
    /// The upload finished but the remote copy could not be shown to equal the local data.
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, UploadError::ChecksumMismatch { .. } | UploadError::UnparsableResponse(_))
    }

    /// The session could not be built from its snapshot.
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            UploadError::MissingRemoteId
                | UploadError::LocalOnlyId(_)
                | UploadError::MissingData
                | UploadError::MissingChecksum
                | UploadError::SizeMismatch { .. }
                | UploadError::ConfigurationError(_)
        )
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, UploadError::Transport(_))
    }
}

impl From<DriveClientError> for UploadError {
    /// Server replies become [`UploadError::Remote`]; everything else failed before a reply
    /// was received.
    fn from(err: DriveClientError) -> Self {
        match err {
            e @ DriveClientError::Api { .. } => UploadError::Remote(Arc::new(e)),
            e => UploadError::Transport(Arc::new(e)),
        }
    }
}
