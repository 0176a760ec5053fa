use std::fmt::Debug;

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("Refresh function: {0} is not callable")]
    RefreshFunctionNotCallable(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailure(String),

    #[error("No token available and no refresher configured")]
    NoToken,
}

impl AuthError {
    pub fn token_refresh_failure(err: impl Debug) -> Self {
        Self::TokenRefreshFailure(format!("{err:?}"))
    }
}
