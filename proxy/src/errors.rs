use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Result type alias for proxy operations
pub type Result<T, E = ProxyError> = std::result::Result<T, E>;

/// Failure taxonomy for the proxy.
///
/// Each variant is created once at the point an upstream call (or local
/// validation) fails and travels unchanged to the HTTP boundary, where it is
/// rendered as JSON with the corresponding status code.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Upstream Jira could not be reached (connect failure, timeout, or any
    /// other transport-level problem).
    #[error("{0}")]
    Connection(String),

    /// Upstream rejected the credentials (HTTP 401).
    #[error("invalid Jira credentials")]
    Authentication,

    /// Upstream lacks permission for the operation (HTTP 403).
    #[error("insufficient permissions for Jira operation")]
    Permission,

    /// Resource missing upstream, or no proxy route matched (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// Bad request, either rejected upstream (HTTP 400) or by the proxy's own
    /// parameter validation before any upstream call.
    #[error("{0}")]
    Validation(String),

    /// Any other non-2xx upstream status, relayed with its original status
    /// code and body.
    #[error("Jira API error: {status}")]
    Upstream { status: u16, details: Value },

    /// Unclassified failure. The inner message is logged but never surfaced
    /// to the caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProxyError {
    /// Status code surfaced to the proxy's caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Authentication => StatusCode::UNAUTHORIZED,
            ProxyError::Permission => StatusCode::FORBIDDEN,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Validation(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable kind tag carried in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Connection(_) => "ConnectionError",
            ProxyError::Authentication => "AuthenticationError",
            ProxyError::Permission => "PermissionError",
            ProxyError::NotFound(_) => "NotFoundError",
            ProxyError::Validation(_) => "ValidationError",
            ProxyError::Upstream { .. } => "JiraApiError",
            ProxyError::Internal(_) => "InternalServerError",
        }
    }

    /// Raw upstream error body, when one was captured.
    pub fn details(&self) -> Option<&Value> {
        match self {
            ProxyError::Upstream { details, .. } => Some(details),
            _ => None,
        }
    }

    /// Message safe to return to the caller. Internal failures are masked.
    pub fn public_message(&self) -> String {
        match self {
            ProxyError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Internal(format!("serialization error: {err}"))
    }
}
