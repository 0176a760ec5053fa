use std::sync::Arc;

use anyhow::anyhow;
use error_printer::OptionPrinter;
use http::Extensions;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use utils::auth::TokenProvider;

use crate::constants::CONNECT_TIMEOUT;
use crate::error::Result;

const USER_AGENT: &str = concat!("drive_sync", "/", env!("CARGO_PKG_VERSION"));

fn reqwest_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(*CONNECT_TIMEOUT)
        .build()?)
}

/// Builds the client used for calls against the drive API; every request carries a bearer
/// token when a token provider is given.
pub fn build_auth_http_client(token_provider: Option<Arc<TokenProvider>>) -> Result<ClientWithMiddleware> {
    let auth_middleware = token_provider
        .map(AuthMiddleware::new)
        .info_none("drive API auth disabled");
    Ok(ClientBuilder::new(reqwest_client()?).maybe_with(auth_middleware).build())
}

/// Builds a client without auth, for pre-authorized upload URLs which reject bearer tokens.
pub fn build_http_client() -> Result<ClientWithMiddleware> {
    Ok(ClientBuilder::new(reqwest_client()?).build())
}

/// Helper trait to allow the reqwest_middleware client to optionally add a middleware.
trait OptionalMiddleware {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self;
}

impl OptionalMiddleware for ClientBuilder {
    fn maybe_with<M: Middleware>(self, middleware: Option<M>) -> Self {
        match middleware {
            Some(m) => self.with(m),
            None => self,
        }
    }
}

/// AuthMiddleware adds a bearer token to outbound requests. If the token it holds is
/// expired, it is refreshed first.
pub struct AuthMiddleware {
    token_provider: Arc<TokenProvider>,
}

impl AuthMiddleware {
    pub fn new(token_provider: Arc<TokenProvider>) -> Self {
        Self { token_provider }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self
            .token_provider
            .get_valid_token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow!("couldn't get token: {e}")))?;

        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow!("invalid token: {e}")))?;
        req.headers_mut().insert(AUTHORIZATION, value);
        next.run(req, extensions).await
    }
}
