use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use drive_client::{DriveItem, RemoteTransport};
use error_printer::ErrorPrinter;
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::chunking::ChunkScheduler;
use crate::config::UploadConfig;
use crate::constants::LOCAL_ID_PREFIX;
use crate::error::{Result, UploadError};
use crate::snapshot::FileSnapshot;
use crate::state::{Status, UploadState};
use crate::verification::ChecksumVerifier;
use crate::wire::{SerializedUploadSession, UploadSessionPost, UploadSessionResponse};

#[derive(Debug, Default)]
struct SessionInner {
    status: Status,
    upload_url: Option<String>,
    expiration: Option<DateTime<Utc>>,
    retries: u32,
}

/// A single attempt to upload one file snapshot to the drive.
///
/// Files up to [`UploadConfig::large_session_threshold`] bytes are sent with a single
/// content PUT. Larger files go through a resumable upload session and are sent in
/// [`UploadConfig::chunk_size`] pieces. Either way the upload only completes once the
/// checksum the server reports for the item matches the local one.
///
/// The payload and checksum are fixed at construction. Progress can be polled from any
/// thread through [`UploadSession::state`] and [`UploadSession::status`] while
/// [`UploadSession::upload`] runs on another task. A session is used for one attempt only:
/// once it has left `NotStarted` it cannot be uploaded again.
pub struct UploadSession {
    id: String,
    name: String,
    size: u64,
    data: Bytes,
    checksum: String,
    mod_time: DateTime<Utc>,
    config: UploadConfig,
    inner: Mutex<SessionInner>,
}

impl UploadSession {
    pub fn new(snapshot: FileSnapshot) -> Result<Self> {
        Self::with_config(snapshot, UploadConfig::default())
    }

    pub fn with_config(snapshot: FileSnapshot, config: UploadConfig) -> Result<Self> {
        let checksum = snapshot.hashes.preferred().map(str::to_owned);
        Self::build(
            snapshot.id,
            snapshot.name,
            snapshot.size,
            snapshot.data,
            checksum,
            snapshot.mod_time,
            config,
        )
    }

    fn build(
        id: Option<String>,
        name: String,
        size: u64,
        data: Option<Bytes>,
        checksum: Option<String>,
        mod_time: DateTime<Utc>,
        config: UploadConfig,
    ) -> Result<Self> {
        let id = id.filter(|id| !id.is_empty()).ok_or(UploadError::MissingRemoteId)?;
        if id.starts_with(LOCAL_ID_PREFIX) {
            return Err(UploadError::LocalOnlyId(id));
        }
        let data = data.ok_or(UploadError::MissingData)?;
        let len = data.len() as u64;
        if size != len {
            return Err(UploadError::SizeMismatch { size, len });
        }
        let checksum = checksum.filter(|c| !c.is_empty()).ok_or(UploadError::MissingChecksum)?;
        config.validate()?;

        Ok(Self {
            id,
            name,
            size,
            data,
            checksum,
            mod_time,
            config,
            inner: Mutex::new(SessionInner::default()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The checksum the upload is verified against.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn is_large_session(&self) -> bool {
        self.size > self.config.large_session_threshold
    }

    pub fn state(&self) -> UploadState {
        self.inner.lock().status.state()
    }

    pub fn status(&self) -> Status {
        self.inner.lock().status.clone()
    }

    /// The error that ended the upload, if it failed.
    pub fn error(&self) -> Option<UploadError> {
        self.inner.lock().status.error().cloned()
    }

    /// Upload URL of the resumable session, once one has been created.
    pub fn upload_url(&self) -> Option<String> {
        self.inner.lock().upload_url.clone()
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().expiration
    }

    /// Number of chunk requests repeated after server errors.
    pub fn retries(&self) -> u32 {
        self.inner.lock().retries
    }

    /// Moves the status forward; refuses anything else.
    fn advance(&self, next: Status) -> bool {
        let mut inner = self.inner.lock();
        if !inner.status.can_advance_to(&next) {
            return false;
        }
        inner.status = next;
        true
    }

    /// Transfers the snapshot and verifies the result, leaving the session `Complete` or
    /// `Errored`. Fails with [`UploadError::AlreadyStarted`] without touching the status if
    /// the session has already been started.
    pub async fn upload<T: RemoteTransport + ?Sized>(&self, transport: &T) -> Result<()> {
        if !self.advance(Status::Started) {
            return Err(UploadError::AlreadyStarted);
        }
        info!(
            id = self.id.as_str(),
            name = self.name.as_str(),
            size = self.size,
            large = self.is_large_session(),
            "Starting upload"
        );

        let result = if self.is_large_session() {
            self.upload_large(transport).await
        } else {
            self.upload_small(transport).await
        };

        match result {
            Ok(item) => {
                self.advance(Status::Complete);
                info!(id = self.id.as_str(), name = self.name.as_str(), remote_size = item.size, "Upload complete");
                Ok(())
            },
            Err(e) => {
                self.advance(Status::Errored(e.clone()));
                error!(id = self.id.as_str(), name = self.name.as_str(), "Upload failed: {e}");
                Err(e)
            },
        }
    }

    async fn upload_small<T: RemoteTransport + ?Sized>(&self, transport: &T) -> Result<DriveItem> {
        let resource = format!("/me/drive/items/{}/content", self.id);
        let response = match transport.put(&resource, self.data.clone()).await {
            Err(e) if e.is_resource_modified() => {
                warn!(
                    id = self.id.as_str(),
                    name = self.name.as_str(),
                    "Item changed remotely during upload, retrying in {:?}",
                    self.config.conflict_retry_delay
                );
                tokio::time::sleep(self.config.conflict_retry_delay).await;
                transport.put(&resource, self.data.clone()).await?
            },
            result => result?,
        };
        ChecksumVerifier::new(&self.checksum).verify(&response)
    }

    async fn create_session<T: RemoteTransport + ?Sized>(&self, transport: &T) -> Result<String> {
        let resource = format!("/me/drive/items/{}/createUploadSession", self.id);
        let request = serde_json::to_vec(&UploadSessionPost::replace(&self.name, self.mod_time))
            .map_err(|e| UploadError::InvalidSessionRequest(Arc::new(e)))?;
        let body = transport.post(&resource, Bytes::from(request)).await?;

        let response: UploadSessionResponse =
            serde_json::from_slice(&body).map_err(|e| UploadError::InvalidSessionResponse(Arc::new(e)))?;
        if response.upload_url.is_empty() {
            return Err(UploadError::MissingUploadUrl);
        }
        debug!(
            id = self.id.as_str(),
            expiration = ?response.expiration_date_time,
            "Created upload session"
        );

        let mut inner = self.inner.lock();
        inner.upload_url = Some(response.upload_url.clone());
        inner.expiration = response.expiration_date_time;
        Ok(response.upload_url)
    }

    async fn upload_large<T: RemoteTransport + ?Sized>(&self, transport: &T) -> Result<DriveItem> {
        let upload_url = self.create_session(transport).await?;

        let on_retry = || self.inner.lock().retries += 1;
        let scheduler = ChunkScheduler {
            id: &self.id,
            name: &self.name,
            data: &self.data,
            chunk_size: self.config.chunk_size,
            base_backoff: self.config.server_error_base_backoff,
            on_retry: &on_retry,
        };
        let response = scheduler.run(transport, &upload_url).await?;

        ChecksumVerifier::new(&self.checksum).verify(&response)
    }

    /// Asks the server to discard the resumable session in the background. Only applies to
    /// large uploads that have an upload URL and were started; returns the cleanup task when
    /// one was spawned. Failures are logged.
    pub fn cancel<T: RemoteTransport + ?Sized + 'static>(&self, transport: Arc<T>) -> Option<JoinHandle<()>> {
        if !self.is_large_session() {
            return None;
        }
        let url = {
            let inner = self.inner.lock();
            match inner.status.state() {
                UploadState::Started | UploadState::Errored => inner.upload_url.clone()?,
                UploadState::NotStarted | UploadState::Complete => return None,
            }
        };

        let Ok(handle) = Handle::try_current() else {
            warn!(id = self.id.as_str(), "No async runtime available, not cancelling upload session");
            return None;
        };

        let id = self.id.clone();
        Some(handle.spawn(async move {
            info!(id = id.as_str(), "Cancelling upload session");
            let _ = transport
                .delete(&url)
                .await
                .log_error(format!("Failed to cancel upload session for {id}"));
        }))
    }

    fn to_serialized(&self) -> SerializedUploadSession {
        let inner = self.inner.lock();
        SerializedUploadSession {
            id: self.id.clone(),
            name: self.name.clone(),
            upload_url: inner.upload_url.clone(),
            expiration_date_time: inner.expiration,
            size: self.size,
            data: self.data.clone(),
            checksum: self.checksum.clone(),
            mod_time: self.mod_time,
        }
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("UploadSession")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("checksum", &self.checksum)
            .field("mod_time", &self.mod_time)
            .field("status", &inner.status)
            .field("upload_url", &inner.upload_url)
            .finish_non_exhaustive()
    }
}

impl Serialize for UploadSession {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // Copy first so the lock is not held while the payload is encoded.
        let serialized = self.to_serialized();
        serialized.serialize(serializer)
    }
}

impl TryFrom<SerializedUploadSession> for UploadSession {
    type Error = UploadError;

    /// Rebuilds a `NotStarted` session with the default configuration.
    fn try_from(s: SerializedUploadSession) -> Result<Self> {
        let session = Self::build(
            Some(s.id),
            s.name,
            s.size,
            Some(s.data),
            Some(s.checksum),
            s.mod_time,
            UploadConfig::default(),
        )?;
        {
            let mut inner = session.inner.lock();
            inner.upload_url = s.upload_url;
            inner.expiration = s.expiration_date_time;
        }
        Ok(session)
    }
}

impl<'de> Deserialize<'de> for UploadSession {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let serialized = SerializedUploadSession::deserialize(deserializer)?;
        UploadSession::try_from(serialized).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::snapshot::FileHashes;

    fn snapshot(id: Option<&str>, data: Option<&'static [u8]>) -> FileSnapshot {
        let data = data.map(Bytes::from_static);
        FileSnapshot {
            id: id.map(str::to_owned),
            name: "file.txt".to_owned(),
            size: data.as_ref().map_or(0, |d| d.len() as u64),
            hashes: data.as_deref().map(FileHashes::compute).unwrap_or_default(),
            data,
            mod_time: Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap(),
        }
    }

    #[test]
    fn test_construction_failures() {
        assert!(matches!(
            UploadSession::new(snapshot(None, Some(b"abc"))),
            Err(UploadError::MissingRemoteId)
        ));
        assert!(matches!(
            UploadSession::new(snapshot(Some(""), Some(b"abc"))),
            Err(UploadError::MissingRemoteId)
        ));
        assert!(matches!(
            UploadSession::new(snapshot(Some("local-1234"), Some(b"abc"))),
            Err(UploadError::LocalOnlyId(id)) if id == "local-1234"
        ));
        assert!(matches!(UploadSession::new(snapshot(Some("ID"), None)), Err(UploadError::MissingData)));

        let mut no_hash = snapshot(Some("ID"), Some(b"abc"));
        no_hash.hashes = FileHashes::default();
        let err = UploadSession::new(no_hash).unwrap_err();
        assert!(matches!(err, UploadError::MissingChecksum));
        assert!(err.is_construction_error());

        let mut wrong_size = snapshot(Some("ID"), Some(b"abc"));
        wrong_size.size = 4;
        assert!(matches!(
            UploadSession::new(wrong_size),
            Err(UploadError::SizeMismatch { size: 4, len: 3 })
        ));
    }

    #[test]
    fn test_prefers_sha1() {
        let session = UploadSession::new(snapshot(Some("ID"), Some(b"abc"))).unwrap();
        assert_eq!(session.checksum(), "A9993E364706816ABA3E25717850C26C9CD0D89D");
        assert_eq!(session.state(), UploadState::NotStarted);
        assert!(session.error().is_none());
        assert!(!session.is_large_session());
    }

    #[test]
    fn test_falls_back_to_quick_xor() {
        let mut snap = snapshot(Some("ID"), Some(b"a"));
        snap.hashes.sha1 = None;
        let session = UploadSession::new(snap).unwrap();
        assert_eq!(session.checksum(), "YQAAAAAAAAAAAAAAAQAAAAAAAAA=");
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let config = UploadConfig {
            large_session_threshold: 3,
            ..Default::default()
        };
        let at = UploadSession::with_config(snapshot(Some("ID"), Some(b"abc")), config.clone()).unwrap();
        assert!(!at.is_large_session());
        let above = UploadSession::with_config(snapshot(Some("ID"), Some(b"abcd")), config).unwrap();
        assert!(above.is_large_session());
    }

    #[test]
    fn test_serialization_round_trip() {
        let session = UploadSession::new(snapshot(Some("ID"), Some(b"abc"))).unwrap();
        session.inner.lock().upload_url = Some("https://up.example/s".to_owned());

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["id"], "ID");
        assert_eq!(json["data"], "YWJj");
        assert_eq!(json["uploadUrl"], "https://up.example/s");
        assert_eq!(json["modTime"], "2024-05-06T07:08:09Z");

        let restored: UploadSession = serde_json::from_value(json).unwrap();
        assert_eq!(restored.id(), "ID");
        assert_eq!(restored.size(), 3);
        assert_eq!(restored.checksum(), session.checksum());
        assert_eq!(restored.mod_time(), session.mod_time());
        assert_eq!(restored.upload_url().as_deref(), Some("https://up.example/s"));
        assert_eq!(restored.state(), UploadState::NotStarted);
    }

    #[test]
    fn test_deserialize_rejects_local_id() {
        let json = serde_json::json!({
            "id": "local-1",
            "size": 3,
            "data": "YWJj",
            "checksum": "X",
            "modTime": "2024-05-06T07:08:09Z"
        });
        assert!(serde_json::from_value::<UploadSession>(json).is_err());
    }

    #[test]
    fn test_debug_omits_payload() {
        let session = UploadSession::new(snapshot(Some("ID"), Some(b"secret bytes"))).unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("NotStarted"));
        assert!(!debug.contains("secret bytes"));
    }
}
