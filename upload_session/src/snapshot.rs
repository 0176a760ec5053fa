use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use drive_client::hashes::{quick_xor_hash, sha1_hash};

/// Content hashes known for a snapshot. Empty strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHashes {
    pub sha1: Option<String>,
    pub quick_xor: Option<String>,
}

impl FileHashes {
    /// Computes both supported hashes over `data`.
    pub fn compute(data: &[u8]) -> Self {
        Self {
            sha1: Some(sha1_hash(data)),
            quick_xor: Some(quick_xor_hash(data)),
        }
    }

    /// The checksum an upload is verified against: SHA1 when present, QuickXorHash otherwise.
    pub fn preferred(&self) -> Option<&str> {
        [self.sha1.as_deref(), self.quick_xor.as_deref()]
            .into_iter()
            .flatten()
            .find(|h| !h.is_empty())
    }
}

/// An immutable capture of a file taken when its upload is requested.
///
/// The upload works from this copy only; later writes to the file do not affect it.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Remote item id; `None` when the item could not be resolved.
    pub id: Option<String>,
    pub name: String,
    pub size: u64,
    pub data: Option<Bytes>,
    pub mod_time: DateTime<Utc>,
    pub hashes: FileHashes,
}

impl FileSnapshot {
    /// Snapshot of an in-memory buffer, hashing it with both supported algorithms.
    pub fn from_bytes(id: impl Into<String>, name: impl Into<String>, data: Bytes, mod_time: DateTime<Utc>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            size: data.len() as u64,
            hashes: FileHashes::compute(&data),
            data: Some(data),
            mod_time,
        }
    }

    /// Reads `path` fully and snapshots it under the remote item `id`.
    pub fn from_path(id: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let data = Bytes::from(std::fs::read(path)?);
        let mod_time: DateTime<Utc> = metadata.modified()?.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::from_bytes(id, name, data, mod_time))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_preferred_hash_order() {
        let both = FileHashes {
            sha1: Some("SHA".to_string()),
            quick_xor: Some("QX".to_string()),
        };
        assert_eq!(both.preferred(), Some("SHA"));

        let quick_xor_only = FileHashes {
            sha1: Some(String::new()),
            quick_xor: Some("QX".to_string()),
        };
        assert_eq!(quick_xor_only.preferred(), Some("QX"));

        assert_eq!(FileHashes::default().preferred(), None);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();

        let snapshot = FileSnapshot::from_path("ITEM", file.path()).unwrap();
        assert_eq!(snapshot.id.as_deref(), Some("ITEM"));
        assert_eq!(snapshot.size, 3);
        assert_eq!(snapshot.data.as_deref(), Some(&b"abc"[..]));
        assert_eq!(snapshot.hashes.preferred(), Some("A9993E364706816ABA3E25717850C26C9CD0D89D"));
        assert_eq!(snapshot.name, file.path().file_name().unwrap().to_string_lossy());
    }

    #[test]
    fn test_from_path_missing_file() {
        assert!(FileSnapshot::from_path("ITEM", "/definitely/not/here").is_err());
    }
}
