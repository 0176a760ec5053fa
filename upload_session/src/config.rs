use std::time::Duration;

use crate::constants::{
    LARGE_SESSION_THRESHOLD, RESOURCE_MODIFIED_RETRY_DELAY, SERVER_ERROR_BASE_BACKOFF, UPLOAD_CHUNK_SIZE,
};
use crate::error::{Result, UploadError};

/// Tunables for a single upload. The default draws from the environment-configurable constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub chunk_size: u64,
    pub large_session_threshold: u64,
    pub conflict_retry_delay: Duration,
    pub server_error_base_backoff: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: *UPLOAD_CHUNK_SIZE,
            large_session_threshold: *LARGE_SESSION_THRESHOLD,
            conflict_retry_delay: *RESOURCE_MODIFIED_RETRY_DELAY,
            server_error_base_backoff: *SERVER_ERROR_BASE_BACKOFF,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(UploadError::ConfigurationError("chunk size must be non-zero".to_string()));
        }
        Ok(())
    }
}
