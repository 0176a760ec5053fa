//! JSON bodies exchanged with the drive API and the persisted form of a session.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps the server should record for the uploaded item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSystemInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,
}

/// Body of `POST /me/drive/items/{id}/createUploadSession`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSessionPost {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: String,
    #[serde(rename = "fileSystemInfo")]
    pub file_system_info: FileSystemInfo,
}

impl UploadSessionPost {
    /// Replaces the remote content, keeping the local modification time.
    pub fn replace(name: &str, mod_time: DateTime<Utc>) -> Self {
        Self {
            name: name.to_owned(),
            conflict_behavior: "replace".to_owned(),
            file_system_info: FileSystemInfo {
                last_modified_date_time: Some(mod_time),
                ..Default::default()
            },
        }
    }
}

/// Reply to session creation. Unknown fields such as `nextExpectedRanges` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSessionResponse {
    #[serde(default)]
    pub upload_url: String,
    #[serde(default)]
    pub expiration_date_time: Option<DateTime<Utc>>,
}

/// Flat, owned copy of an `UploadSession`, taken under its lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SerializedUploadSession {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Always written, `null` until a resumable session exists.
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub expiration_date_time: Option<DateTime<Utc>>,
    pub size: u64,
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    pub checksum: String,
    pub mod_time: DateTime<Utc>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_session_post_body() {
        let mod_time = Utc.with_ymd_and_hms(2024, 3, 1, 10, 20, 30).unwrap();
        let body = serde_json::to_value(UploadSessionPost::replace("big.bin", mod_time)).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "big.bin",
                "@microsoft.graph.conflictBehavior": "replace",
                "fileSystemInfo": { "lastModifiedDateTime": "2024-03-01T10:20:30Z" }
            })
        );
    }

    #[test]
    fn test_session_post_omits_empty_name() {
        let body = serde_json::to_value(UploadSessionPost::replace("", Utc::now())).unwrap();
        assert!(body.get("name").is_none());
    }

    #[test]
    fn test_session_response_ignores_extra_fields() {
        let response: UploadSessionResponse = serde_json::from_str(
            r#"{"uploadUrl":"https://up.example/s1","expirationDateTime":"2024-03-02T00:00:00Z","nextExpectedRanges":["0-"]}"#,
        )
        .unwrap();
        assert_eq!(response.upload_url, "https://up.example/s1");
        assert!(response.expiration_date_time.is_some());

        let empty: UploadSessionResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.upload_url.is_empty());
    }

    #[test]
    fn test_data_is_base64() {
        let session = SerializedUploadSession {
            id: "ID".to_owned(),
            name: "n".to_owned(),
            upload_url: None,
            expiration_date_time: None,
            size: 3,
            data: Bytes::from_static(b"abc"),
            checksum: "C".to_owned(),
            mod_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["data"], "YWJj");
        assert_eq!(value["modTime"], "2024-01-01T00:00:00Z");
        assert_eq!(value.get("uploadUrl"), Some(&serde_json::Value::Null));
        assert_eq!(value.get("expirationDateTime"), Some(&serde_json::Value::Null));

        let back: SerializedUploadSession = serde_json::from_value(value).unwrap();
        assert_eq!(back.data, Bytes::from_static(b"abc"));
    }
}
