use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use drive_client::GraphClient;
use drive_logging::{init_logging, LoggingConfig};
use tracing::{info, warn};
use upload_session::{FileSnapshot, UploadSession, UploadState};
use utils::auth::AuthConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Uploads one local file over an existing OneDrive item.
#[derive(Parser)]
#[clap(name = "drive_upload", version)]
struct UploadCommand {
    /// Remote id of the drive item to replace.
    #[clap(long)]
    item_id: String,
    /// Bearer token for the Graph API.
    #[clap(long)]
    token: Option<String>, // if not specified we use env:DRIVE_SYNC_TOKEN
    /// Graph API endpoint.
    #[clap(long)]
    endpoint: Option<String>,
    /// Write the session as JSON to this path once the upload has finished.
    #[clap(long)]
    save_session: Option<PathBuf>,
    /// The file to upload.
    file: PathBuf,
}

impl UploadCommand {
    async fn run(self) -> Result<()> {
        let token = self
            .token
            .unwrap_or_else(|| std::env::var("DRIVE_SYNC_TOKEN").unwrap_or_default());
        let auth = if token.is_empty() {
            AuthConfig::default()
        } else {
            AuthConfig::with_static_token(token)
        };
        let client = Arc::new(match &self.endpoint {
            Some(endpoint) => GraphClient::new(endpoint, &auth)?,
            None => GraphClient::with_default_endpoint(&auth)?,
        });

        let snapshot = FileSnapshot::from_path(&self.item_id, &self.file)
            .with_context(|| format!("reading {}", self.file.display()))?;
        let session = Arc::new(UploadSession::new(snapshot)?);
        info!(id = session.id(), size = session.size(), "Uploading {}", self.file.display());

        let task = {
            let session = session.clone();
            let client = client.clone();
            tokio::spawn(async move { session.upload(client.as_ref()).await })
        };

        let mut last = UploadState::NotStarted;
        while !task.is_finished() {
            let state = session.state();
            if state != last {
                eprintln!("{}: {state}", self.file.display());
                last = state;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        let result = task.await?;

        if let Some(path) = &self.save_session {
            let json = serde_json::to_vec_pretty(session.as_ref())?;
            std::fs::write(path, json).with_context(|| format!("writing session to {}", path.display()))?;
        }

        if let Err(e) = result {
            if let Some(cleanup) = session.cancel(client) {
                cleanup.await.unwrap_or_else(|e| warn!("Upload session cleanup task failed: {e}"));
            }
            return Err(anyhow!(e).context(format!("uploading {}", self.file.display())));
        }

        eprintln!("{}: {}", self.file.display(), session.state());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingConfig::from_env(env!("CARGO_PKG_VERSION").to_string()));
    UploadCommand::parse().run().await
}
