//! Request/response shapes the proxy itself declares. Everything Jira returns
//! that the proxy does not reshape travels as raw `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The stable search response shape expected by IDE clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub expand: String,
    pub start_at: u64,
    pub max_results: u64,
    /// Number of issues in this page. The reduced search endpoint does not
    /// report the true match count, so callers must not treat this as an
    /// authoritative total.
    pub total: u64,
    /// Issue objects exactly as the upstream returned them.
    pub issues: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub fields: Value,
}

/// Issue update payload. Unset members are dropped from the outbound body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionRequest {
    #[serde(default)]
    pub transition: Option<TransitionTarget>,
    #[serde(default)]
    pub fields: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransitionTarget {
    #[serde(default)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_result_serializes_camel_case() {
        let result = SearchResult {
            expand: "schema".to_string(),
            start_at: 0,
            max_results: 50,
            total: 1,
            issues: vec![json!({"key": "PROJ-1"})],
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["startAt"], 0);
        assert_eq!(value["maxResults"], 50);
        assert_eq!(value["total"], 1);
        assert_eq!(value["issues"][0]["key"], "PROJ-1");
    }

    #[test]
    fn test_update_request_drops_unset_members() {
        let update: UpdateIssueRequest =
            serde_json::from_value(json!({"fields": {"summary": "new"}})).unwrap();
        let body = serde_json::to_value(&update).unwrap();
        assert_eq!(body, json!({"fields": {"summary": "new"}}));
    }

    #[test]
    fn test_transition_request_tolerates_missing_parts() {
        let req: TransitionRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.transition.is_none());

        let req: TransitionRequest =
            serde_json::from_value(json!({"transition": {}})).unwrap();
        assert!(req.transition.unwrap().id.is_none());

        let req: TransitionRequest =
            serde_json::from_value(json!({"transition": {"id": "31"}})).unwrap();
        assert_eq!(req.transition.unwrap().id.unwrap(), "31");
    }
}
