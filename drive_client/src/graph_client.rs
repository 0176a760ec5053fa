use std::sync::Arc;

use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Response, Url};
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, warn};
use utils::auth::{AuthConfig, TokenProvider};

use crate::constants::{GRAPH_ENDPOINT, TOKEN_REFRESH_MARGIN};
use crate::error::{DriveClientError, Result};
use crate::http_client::{build_auth_http_client, build_http_client};
use crate::interface::{ChunkResponse, RemoteTransport};

/// [`RemoteTransport`] over the Microsoft Graph drive API.
pub struct GraphClient {
    endpoint: String,
    authenticated: ClientWithMiddleware,
    anonymous: ClientWithMiddleware,
    token_provider: Arc<TokenProvider>,
}

impl GraphClient {
    pub fn new(endpoint: &str, auth_config: &AuthConfig) -> Result<Self> {
        if endpoint.is_empty() {
            return Err(DriveClientError::ConfigurationError("empty API endpoint".to_string()));
        }
        // Fail early on an endpoint that can never produce a valid request.
        Url::parse(endpoint)?;

        let token_provider = Arc::new(TokenProvider::new(auth_config, *TOKEN_REFRESH_MARGIN));
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            authenticated: build_auth_http_client(Some(token_provider.clone()))?,
            anonymous: build_http_client()?,
            token_provider,
        })
    }

    /// Client against the public Graph endpoint.
    pub fn with_default_endpoint(auth_config: &AuthConfig) -> Result<Self> {
        Self::new(&GRAPH_ENDPOINT, auth_config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn resource_url(&self, resource: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}/{}", self.endpoint, resource.trim_start_matches('/')))?)
    }
}

/// Reads the body of a response, turning non-success statuses into [`DriveClientError::Api`].
async fn checked_body(response: Response) -> Result<Bytes> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        let body = String::from_utf8_lossy(&body).into_owned();
        warn!(%status, body = %body, "drive API request failed");
        return Err(DriveClientError::Api { status, body });
    }
    Ok(body)
}

#[async_trait::async_trait]
impl RemoteTransport for GraphClient {
    async fn put(&self, resource: &str, body: Bytes) -> Result<Bytes> {
        let url = self.resource_url(resource)?;
        debug!("PUT {url}, {} bytes", body.len());
        let response = self
            .authenticated
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;
        checked_body(response).await
    }

    async fn post(&self, resource: &str, body: Bytes) -> Result<Bytes> {
        let url = self.resource_url(resource)?;
        debug!("POST {url}");
        let response = self
            .authenticated
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        checked_body(response).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        debug!("DELETE {url}");
        let response = self.anonymous.delete(url).send().await?;
        checked_body(response).await.map(|_| ())
    }

    async fn put_chunk(&self, upload_url: &str, content_range: &str, body: Bytes) -> Result<ChunkResponse> {
        let url = Url::parse(upload_url)?;
        // No Authorization header: the upload URL is the credential and the service rejects bearer tokens.
        let response = self
            .anonymous
            .put(url)
            .header(CONTENT_LENGTH, body.len())
            .header(CONTENT_RANGE, content_range)
            .body(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(ChunkResponse { status, body })
    }

    async fn refresh(&self) -> Result<()> {
        self.token_provider.get_valid_token().await?;
        Ok(())
    }
}
