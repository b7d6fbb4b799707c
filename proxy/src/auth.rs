//! Authorization header construction for upstream Jira calls.
//!
//! Exactly one mode is active per deployment, chosen at startup. The service
//! account modes encode static credentials as Basic auth; passthrough forwards
//! the caller's header untouched.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

/// Impersonation header honored by Jira Server/Data Center deployments.
/// Jira Cloud ignores it.
pub const IMPERSONATION_HEADER: &str = "X-Atlassian-User";

/// How the proxy authenticates against upstream Jira.
#[derive(Debug, Clone)]
pub enum AuthMode {
    /// Static service-account Basic auth on every upstream call.
    ServiceAccount { username: String, api_token: String },

    /// Service-account Basic auth, plus an acting-user header naming the
    /// caller when a username can be recovered from the inbound request.
    Impersonate { username: String, api_token: String },

    /// Forward the inbound Authorization header verbatim. Nothing is stored
    /// or transformed.
    Passthrough,
}

impl AuthMode {
    /// Headers to attach to one upstream call.
    ///
    /// `caller_authorization` is the inbound request's Authorization header,
    /// when present.
    pub fn upstream_headers(&self, caller_authorization: Option<&str>) -> Vec<(String, String)> {
        match self {
            AuthMode::ServiceAccount {
                username,
                api_token,
            } => {
                vec![(
                    "Authorization".to_string(),
                    service_auth_header(username, api_token),
                )]
            }
            AuthMode::Impersonate {
                username,
                api_token,
            } => {
                let mut headers = vec![(
                    "Authorization".to_string(),
                    service_auth_header(username, api_token),
                )];
                if let Some(acting_user) = caller_authorization.and_then(extract_username) {
                    tracing::debug!(%acting_user, "adding impersonation header");
                    headers.push((IMPERSONATION_HEADER.to_string(), acting_user));
                }
                headers
            }
            AuthMode::Passthrough => {
                // A missing inbound header degrades to a header Jira will
                // reject with 401, same as unset service credentials.
                let value = caller_authorization.unwrap_or("Basic ").to_string();
                vec![("Authorization".to_string(), value)]
            }
        }
    }
}

/// Build the `Basic base64(username:api_token)` header value.
///
/// An unset credential pair yields a deliberately invalid header so that the
/// upstream rejects the call with 401 instead of the proxy failing silently.
pub fn service_auth_header(username: &str, api_token: &str) -> String {
    if username.is_empty() || api_token.is_empty() {
        tracing::warn!(
            "service account credentials not configured; \
             set JIRA_SERVICE_USERNAME and JIRA_SERVICE_API_TOKEN"
        );
        return "Basic ".to_string();
    }
    let credentials = format!("{username}:{api_token}");
    format!("Basic {}", BASE64.encode(credentials.as_bytes()))
}

/// Best-effort username recovery from an Authorization header.
///
/// Basic headers are decoded and split on the first colon. Bearer tokens and
/// malformed input yield `None`; nothing here ever fails the request.
pub fn extract_username(authorization: &str) -> Option<String> {
    if let Some(encoded) = authorization.strip_prefix("Basic ") {
        let decoded = match BASE64.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(error = %err, "invalid base64 in Basic auth header");
                return None;
            }
        };
        let decoded = match String::from_utf8(decoded) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "Basic auth credentials are not valid UTF-8");
                return None;
            }
        };
        match decoded.split_once(':') {
            Some((username, _)) => Some(username.to_string()),
            None => {
                tracing::warn!("invalid Basic auth format: no colon separator");
                None
            }
        }
    } else if authorization.starts_with("Bearer ") {
        // Bearer tokens carry no username
        None
    } else {
        tracing::warn!("unknown authorization scheme, no username available");
        None
    }
}
