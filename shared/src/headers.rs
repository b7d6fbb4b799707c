//! Response plumbing applied to every outgoing response: request correlation,
//! processing time, and the fixed security-header set.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const PROCESS_TIME: HeaderName = HeaderName::from_static("x-process-time");

/// Generate a fresh correlation id for an inbound request.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Stamp the correlation id and elapsed processing time onto a response.
pub fn stamp_timing(headers: &mut HeaderMap, request_id: &str, elapsed: Duration) {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID, value);
    }
    let secs = format!("{:.6}", elapsed.as_secs_f64());
    if let Ok(value) = HeaderValue::from_str(&secs) {
        headers.insert(PROCESS_TIME, value);
    }
}

/// Apply the standard security headers.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
}

/// Truncate a response body for log lines. Bodies can be arbitrarily large
/// Jira payloads; logs only need enough to identify the failure.
pub fn truncate_for_log(body: &str, max_len: usize) -> String {
    if body.len() <= max_len {
        return body.to_string();
    }
    let mut end = max_len;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &body[..end])
}
