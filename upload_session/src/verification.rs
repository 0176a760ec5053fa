use std::sync::Arc;

use drive_client::DriveItem;
use tracing::{error, info};

use crate::error::{Result, UploadError};

/// Confirms that the item the server reports after an upload carries the local checksum.
pub struct ChecksumVerifier<'a> {
    checksum: &'a str,
}

impl<'a> ChecksumVerifier<'a> {
    pub fn new(checksum: &'a str) -> Self {
        Self { checksum }
    }

    pub fn verify(&self, response: &[u8]) -> Result<DriveItem> {
        let item: DriveItem = serde_json::from_slice(response).map_err(|e| {
            error!("Could not parse remote item after upload: {e}");
            UploadError::UnparsableResponse(Arc::new(e))
        })?;

        if !item.verify_checksum(self.checksum) {
            let remote = item.reported_checksum().map(str::to_owned);
            error!(
                id = item.id.as_str(),
                local = self.checksum,
                remote = remote.as_deref().unwrap_or("<none>"),
                "Remote checksum did not match"
            );
            return Err(UploadError::ChecksumMismatch {
                local: self.checksum.to_owned(),
                remote,
            });
        }

        info!(id = item.id.as_str(), name = item.name.as_str(), "Upload verified");
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1_ABC: &str = "A9993E364706816ABA3E25717850C26C9CD0D89D";

    #[test]
    fn test_match_either_hash() {
        let body = r#"{"id":"X","file":{"hashes":{"quickXorHash":"QX=="}}}"#;
        assert_eq!(ChecksumVerifier::new("QX==").verify(body.as_bytes()).unwrap().id, "X");

        let body = format!(r#"{{"id":"X","file":{{"hashes":{{"sha1Hash":"{}"}}}}}}"#, SHA1_ABC.to_lowercase());
        assert!(ChecksumVerifier::new(SHA1_ABC).verify(body.as_bytes()).is_ok());
    }

    #[test]
    fn test_mismatch_reports_remote_hash() {
        let body = r#"{"id":"X","file":{"hashes":{"sha1Hash":"0000"}}}"#;
        let err = ChecksumVerifier::new(SHA1_ABC).verify(body.as_bytes()).unwrap_err();
        match err {
            UploadError::ChecksumMismatch { local, remote } => {
                assert_eq!(local, SHA1_ABC);
                assert_eq!(remote.as_deref(), Some("0000"));
            },
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_facet_is_mismatch() {
        let err = ChecksumVerifier::new(SHA1_ABC).verify(br#"{"id":"X"}"#).unwrap_err();
        assert!(matches!(err, UploadError::ChecksumMismatch { remote: None, .. }));
    }

    #[test]
    fn test_unparsable() {
        let err = ChecksumVerifier::new(SHA1_ABC).verify(b"<html>").unwrap_err();
        assert!(matches!(err, UploadError::UnparsableResponse(_)));
        assert!(err.is_integrity_error());
    }
}
