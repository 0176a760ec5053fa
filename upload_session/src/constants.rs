use std::time::Duration;

utils::configurable_constants! {
    /// Size of each byte range sent to a resumable upload session. 10MiB is the unit the
    /// drive API recommends; it must stay a multiple of 320KiB for the service to accept it.
    ref UPLOAD_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

    /// Files larger than this are sent through a formal upload session; smaller files are
    /// replaced with a single request.
    ref LARGE_SESSION_THRESHOLD: u64 = 4 * 1024 * 1024;

    /// Delay before the single retry of a small-file replace rejected with `resourceModified`.
    ref RESOURCE_MODIFIED_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// First delay when a chunk upload hits a server error. Doubles on every further attempt.
    ref SERVER_ERROR_BASE_BACKOFF: Duration = Duration::from_secs(1);
}

/// Item ids with this prefix were assigned locally and are unknown to the server.
pub const LOCAL_ID_PREFIX: &str = "local-";
