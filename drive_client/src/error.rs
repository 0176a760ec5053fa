use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use utils::errors::AuthError;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DriveClientError {
    #[error("Configuration Error: {0}")]
    ConfigurationError(String),

    #[error("Auth Error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Parse Error: {0}")]
    ParseError(#[from] url::ParseError),

    #[error("ReqwestMiddleware Error: {0}")]
    ReqwestMiddlewareError(#[from] reqwest_middleware::Error),

    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// The server answered, but not with a success status. The body is kept verbatim.
    #[error("HTTP {status}: {body}")]
    Api { status: StatusCode, body: String },
}

// Define our own result type here (this seems to be the standard).
pub type Result<T> = std::result::Result<T, DriveClientError>;

/// The error envelope the Graph API wraps failures in.
#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphError,
}

/// One level of a Graph error; more specific codes are nested under `innerError`.
#[derive(Debug, Deserialize)]
struct GraphError {
    #[serde(default)]
    code: String,
    #[serde(default, rename = "innerError", alias = "innererror")]
    inner_error: Option<Box<GraphError>>,
}

impl DriveClientError {
    /// HTTP status of an API error, if the request made it to the server.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DriveClientError::Api { status, .. } => Some(*status),
            DriveClientError::ReqwestError(e) => e.status(),
            _ => None,
        }
    }

    /// The `error.code` field of a Graph API error body, e.g. `resourceModified`.
    pub fn error_code(&self) -> Option<String> {
        self.error_codes().into_iter().next()
    }

    /// `error.code` followed by every nested `innerError.code`, outermost first.
    pub fn error_codes(&self) -> Vec<String> {
        let DriveClientError::Api { body, .. } = self else {
            return Vec::new();
        };
        let Ok(envelope) = serde_json::from_str::<GraphErrorEnvelope>(body) else {
            return Vec::new();
        };
        let mut codes = Vec::new();
        let mut level = Some(&envelope.error);
        while let Some(error) = level {
            if !error.code.is_empty() {
                codes.push(error.code.clone());
            }
            level = error.inner_error.as_deref();
        }
        codes
    }

    /// The remote item changed underneath a content replace; a delayed retry may succeed.
    /// The code may appear at any nesting level, or only in an unstructured body.
    pub fn is_resource_modified(&self) -> bool {
        let DriveClientError::Api { body, .. } = self else {
            return false;
        };
        self.error_codes().iter().any(|code| code == "resourceModified") || body.contains("resourceModified")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_graph_envelope() {
        let err = DriveClientError::Api {
            status: StatusCode::CONFLICT,
            body: r#"{"error":{"code":"resourceModified","message":"ETag does not match"}}"#.to_string(),
        };
        assert_eq!(err.error_code().as_deref(), Some("resourceModified"));
        assert!(err.is_resource_modified());
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
    }

    #[test]
    fn test_unstructured_body_has_no_code() {
        let err = DriveClientError::Api {
            status: StatusCode::BAD_REQUEST,
            body: "not json".to_string(),
        };
        assert_eq!(err.error_code(), None);
        assert!(!err.is_resource_modified());
        assert_eq!(err.to_string(), "HTTP 400 Bad Request: not json");
    }

    #[test]
    fn test_nested_resource_modified() {
        let err = DriveClientError::Api {
            status: StatusCode::CONFLICT,
            body: r#"{"error":{"code":"conflict","innerError":{"code":"resourceModified"}}}"#.to_string(),
        };
        assert_eq!(err.error_code().as_deref(), Some("conflict"));
        assert_eq!(err.error_codes(), vec!["conflict".to_string(), "resourceModified".to_string()]);
        assert!(err.is_resource_modified());
    }

    #[test]
    fn test_unstructured_resource_modified() {
        let err = DriveClientError::Api {
            status: StatusCode::CONFLICT,
            body: "resourceModified: the item changed".to_string(),
        };
        assert!(err.error_codes().is_empty());
        assert!(err.is_resource_modified());
    }

    #[test]
    fn test_non_api_errors() {
        let err = DriveClientError::ConfigurationError("bad".to_string());
        assert_eq!(err.status(), None);
        assert!(!err.is_resource_modified());
    }
}
