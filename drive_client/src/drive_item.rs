use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content hashes the drive reports for a file. Either may be empty depending on the
/// drive type: personal drives report SHA1, business drives only QuickXorHash.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hashes {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha1_hash: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub quick_xor_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemFile {
    #[serde(default)]
    pub hashes: Hashes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Remote item metadata, as returned by content uploads and the final chunk of an upload session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, rename = "lastModifiedDateTime", skip_serializing_if = "Option::is_none")]
    pub mod_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<DriveItemFile>,
}

impl DriveItem {
    /// True if either reported hash equals `checksum`. Hex SHA1 casing differs between
    /// clients and the service, so the comparison ignores ASCII case.
    pub fn verify_checksum(&self, checksum: &str) -> bool {
        let Some(file) = &self.file else {
            return false;
        };
        if checksum.is_empty() {
            return false;
        }
        [&file.hashes.sha1_hash, &file.hashes.quick_xor_hash]
            .into_iter()
            .any(|remote| !remote.is_empty() && remote.eq_ignore_ascii_case(checksum))
    }

    /// The hash to report when a verification fails, SHA1 first.
    pub fn reported_checksum(&self) -> Option<&str> {
        let hashes = &self.file.as_ref()?.hashes;
        [&hashes.sha1_hash, &hashes.quick_xor_hash]
            .into_iter()
            .find(|h| !h.is_empty())
            .map(String::as_str)
    }
}
