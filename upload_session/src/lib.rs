#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::chunking::{chunk_count, chunk_range, chunk_ranges, ChunkRange, ExponentialBackoff};
pub use crate::config::UploadConfig;
pub use crate::error::{Result, UploadError};
pub use crate::session::UploadSession;
pub use crate::snapshot::{FileHashes, FileSnapshot};
pub use crate::state::{Status, UploadState};
pub use crate::verification::ChecksumVerifier;
pub use crate::wire::{FileSystemInfo, UploadSessionPost, UploadSessionResponse};

mod chunking;
mod config;
pub mod constants;
mod error;
mod session;
mod snapshot;
mod state;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
mod verification;
mod wire;
