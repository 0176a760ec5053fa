#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::error::{DriveClientError, Result};
pub use drive_item::{DriveItem, DriveItemFile, Hashes};
pub use graph_client::GraphClient;
pub use interface::{ChunkResponse, RemoteTransport};
pub use reqwest::StatusCode;

pub mod constants;
mod drive_item;
mod error;
mod graph_client;
pub mod hashes;
mod http_client;
mod interface;

pub use http_client::{build_auth_http_client, build_http_client, AuthMiddleware};
