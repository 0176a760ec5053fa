use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::AuthError;

/// A bearer token and the unixtime (in seconds) at which it expires.
pub type TokenInfo = (String, u64);

/// Helper to provide auth tokens to the drive API.
#[async_trait]
pub trait TokenRefresher: Debug + Send + Sync {
    /// Get a new auth token and the unixtime (in seconds) for expiration
    async fn refresh(&self) -> Result<TokenInfo, AuthError>;
}

/// Hands out the same token forever; useful for short-lived tools and tests.
#[derive(Debug, Clone)]
pub struct StaticTokenRefresher {
    token: String,
}

impl StaticTokenRefresher {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenRefresher for StaticTokenRefresher {
    async fn refresh(&self) -> Result<TokenInfo, AuthError> {
        Ok((self.token.clone(), u64::MAX))
    }
}

/// Shared configuration for token-based auth
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Initial token to use
    pub token: Option<String>,
    /// Initial token expiration time epoch in seconds
    pub token_expiration: Option<u64>,
    /// A function to refresh tokens.
    pub token_refresher: Option<Arc<dyn TokenRefresher>>,
}

impl AuthConfig {
    pub fn with_static_token(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: Some(token.clone()),
            token_expiration: Some(u64::MAX),
            token_refresher: Some(Arc::new(StaticTokenRefresher::new(token))),
        }
    }
}

#[derive(Debug)]
struct CachedToken {
    token: Option<String>,
    expiration: u64,
}

/// Caches the current token and refreshes it once it is within `refresh_margin` of expiring.
///
/// The cache is guarded by an async mutex, so concurrent callers that find an expired token
/// wait on a single refresh instead of each issuing their own.
#[derive(Debug)]
pub struct TokenProvider {
    cached: Mutex<CachedToken>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    refresh_margin: Duration,
}

impl TokenProvider {
    pub fn new(cfg: &AuthConfig, refresh_margin: Duration) -> Self {
        Self {
            cached: Mutex::new(CachedToken {
                token: cfg.token.clone(),
                expiration: cfg.token_expiration.unwrap_or(0),
            }),
            refresher: cfg.token_refresher.clone(),
            refresh_margin,
        }
    }

    /// Returns a token that will not expire within the refresh margin, refreshing if needed.
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = &cached.token {
            if !self.is_expiring(cached.expiration) {
                return Ok(token.clone());
            }
        }

        let Some(refresher) = &self.refresher else {
            // No way to refresh: hand back what we have and let the server judge it.
            return cached.token.clone().ok_or(AuthError::NoToken);
        };

        debug!("Refreshing auth token");
        let (token, expiration) = refresher.refresh().await?;
        info!(expiration, "Auth token refreshed");
        cached.token = Some(token.clone());
        cached.expiration = expiration;
        Ok(token)
    }

    fn is_expiring(&self, expiration: u64) -> bool {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        now.as_secs().saturating_add(self.refresh_margin.as_secs()) >= expiration
    }
}
