//! Fixed routing table for the `/rest/api/latest` surface.
//!
//! Routes map directly onto translator operations; parameter extraction and
//! proxy-side validation happen here, before any upstream call.

use crate::errors::{ProxyError, Result};
use crate::jira::JiraClient;
use crate::models::{CreateIssueRequest, TransitionRequest, UpdateIssueRequest};
use crate::upstream::UpstreamTransport;
use http::Method;
use hyper::body::Bytes;
use serde_json::{Value, json};
use std::collections::HashMap;

const API_PREFIX: &str = "/rest/api/latest";

/// Default page size for the plain search endpoint.
const SEARCH_PAGE_SIZE: u64 = 50;

/// Default page size for the IDE-specific `search/jql` endpoint.
const SEARCH_JQL_PAGE_SIZE: u64 = 160;

pub struct Router<T> {
    client: JiraClient<T>,
}

impl<T: UpstreamTransport> Router<T> {
    pub fn new(client: JiraClient<T>) -> Self {
        Self { client }
    }

    /// Dispatch one parsed request. Returns the JSON payload for a 200
    /// response, or a typed error for the boundary to render.
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        raw_query: Option<&str>,
        caller_auth: Option<&str>,
        body: Bytes,
    ) -> Result<Value> {
        if path == "/" && method == Method::GET {
            return Ok(json!({
                "message": "Jira API Proxy Server",
                "version": env!("CARGO_PKG_VERSION"),
            }));
        }

        let Some(rest) = path.strip_prefix(API_PREFIX) else {
            return Err(no_route(method, path));
        };
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let query = parse_query(raw_query);

        match (method, segments.as_slice()) {
            (&Method::GET, ["health"]) => Ok(json!({
                "status": "healthy",
                "message": "Proxy server is running. Authentication is handled per-request.",
            })),

            (&Method::GET, ["serverInfo"]) => self.client.server_info(caller_auth).await,

            (&Method::GET, ["search"]) => {
                self.search(caller_auth, &query, SEARCH_PAGE_SIZE).await
            }
            (&Method::GET, ["search", "jql"]) => {
                self.search(caller_auth, &query, SEARCH_JQL_PAGE_SIZE).await
            }

            (&Method::GET, ["issue", issue_key]) => {
                let fields = fields_param(&query);
                self.client
                    .get_issue(caller_auth, issue_key, fields.as_deref())
                    .await
            }
            (&Method::PUT, ["issue", issue_key]) => {
                let update: UpdateIssueRequest = parse_body(&body)?;
                self.client
                    .update_issue(caller_auth, issue_key, &update)
                    .await?;
                Ok(json!({"message": format!("Issue {issue_key} updated successfully")}))
            }
            (&Method::POST, ["issue"]) => {
                let issue: CreateIssueRequest = parse_body(&body)?;
                self.client.create_issue(caller_auth, &issue).await
            }

            (&Method::GET, ["issue", issue_key, "transitions"]) => {
                self.client.get_transitions(caller_auth, issue_key).await
            }
            (&Method::POST, ["issue", issue_key, "transitions"]) => {
                let request: TransitionRequest = parse_body(&body)?;
                let transition_id = request
                    .transition
                    .and_then(|t| t.id)
                    .ok_or_else(|| {
                        ProxyError::Validation("Transition ID is required".to_string())
                    })?;
                self.client
                    .transition_issue(
                        caller_auth,
                        issue_key,
                        &transition_id,
                        request.fields.as_ref(),
                    )
                    .await?;
                Ok(json!({"message": format!("Issue {issue_key} transitioned successfully")}))
            }

            (&Method::GET, ["project"]) => self.client.list_projects(caller_auth).await,
            (&Method::GET, ["project", project_key]) => {
                self.client.get_project(caller_auth, project_key).await
            }

            _ => Err(no_route(method, path)),
        }
    }

    async fn search(
        &self,
        caller_auth: Option<&str>,
        query: &HashMap<String, String>,
        default_page_size: u64,
    ) -> Result<Value> {
        let jql = query
            .get("jql")
            .ok_or_else(|| ProxyError::Validation("missing required query parameter: jql".to_string()))?;
        let start_at = u64_param(query, "startAt", 0)?;
        let max_results = u64_param(query, "maxResults", default_page_size)?;
        let fields = fields_param(query);

        let result = self
            .client
            .search_issues(caller_auth, jql, start_at, max_results, fields.as_deref())
            .await?;
        Ok(serde_json::to_value(result)?)
    }
}

fn no_route(method: &Method, path: &str) -> ProxyError {
    ProxyError::NotFound(format!("no route for {method} {path}"))
}

fn parse_query(raw: Option<&str>) -> HashMap<String, String> {
    match raw {
        Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
            .into_owned()
            .collect(),
        None => HashMap::new(),
    }
}

fn u64_param(query: &HashMap<String, String>, name: &str, default: u64) -> Result<u64> {
    match query.get(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ProxyError::Validation(format!("invalid value for {name}: {raw}"))),
        None => Ok(default),
    }
}

fn fields_param(query: &HashMap<String, String>) -> Option<Vec<String>> {
    query.get("fields").map(|raw| {
        raw.split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect()
    })
}

fn parse_body<B: serde::de::DeserializeOwned>(body: &Bytes) -> Result<B> {
    serde_json::from_slice(body)
        .map_err(|e| ProxyError::Validation(format!("invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthMode;
    use crate::errors::ProxyError;
    use crate::upstream::UpstreamRequest;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct MockTransport {
        requests: Arc<Mutex<Vec<UpstreamRequest>>>,
        respond: Arc<dyn Fn(&UpstreamRequest) -> Result<Value> + Send + Sync>,
    }

    impl MockTransport {
        fn new(
            respond: impl Fn(&UpstreamRequest) -> Result<Value> + Send + Sync + 'static,
        ) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                respond: Arc::new(respond),
            }
        }

        fn upstream_call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UpstreamTransport for MockTransport {
        async fn execute(&self, request: UpstreamRequest) -> Result<Value> {
            let response = (self.respond)(&request);
            self.requests.lock().unwrap().push(request);
            response
        }
    }

    fn router(transport: &MockTransport) -> Router<MockTransport> {
        Router::new(JiraClient::new(
            transport.clone(),
            AuthMode::ServiceAccount {
                username: "svc".into(),
                api_token: "tok".into(),
            },
        ))
    }

    async fn get(router: &Router<MockTransport>, path: &str, query: Option<&str>) -> Result<Value> {
        router
            .dispatch(&Method::GET, path, query, None, Bytes::new())
            .await
    }

    #[tokio::test]
    async fn test_health_needs_no_upstream() {
        let transport = MockTransport::new(|_| panic!("health must not call upstream"));
        let value = get(&router(&transport), "/rest/api/latest/health", None)
            .await
            .unwrap();
        assert_eq!(value["status"], "healthy");
        assert_eq!(transport.upstream_call_count(), 0);
    }

    #[tokio::test]
    async fn test_root_banner() {
        let transport = MockTransport::new(|_| panic!("banner must not call upstream"));
        let value = get(&router(&transport), "/", None).await.unwrap();
        assert_eq!(value["message"], "Jira API Proxy Server");
    }

    #[tokio::test]
    async fn test_server_info_passthrough() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.path, "/rest/api/2/serverInfo");
            Ok(json!({"baseUrl": "https://jira.example.com", "version": "9.4.0"}))
        });
        let value = get(&router(&transport), "/rest/api/latest/serverInfo", None)
            .await
            .unwrap();
        assert_eq!(value["version"], "9.4.0");
    }

    #[tokio::test]
    async fn test_search_requires_jql() {
        let transport = MockTransport::new(|_| panic!("validation must precede upstream calls"));
        let err = get(&router(&transport), "/rest/api/latest/search", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
        assert_eq!(transport.upstream_call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_decodes_and_forwards_parameters() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.path, "/rest/api/3/search/jql");
            assert!(req.query.contains(&("jql".to_string(), "project = PROJ".to_string())));
            assert!(req.query.contains(&("startAt".to_string(), "5".to_string())));
            assert!(req.query.contains(&("maxResults".to_string(), "10".to_string())));
            Ok(json!({"issues": []}))
        });
        let value = get(
            &router(&transport),
            "/rest/api/latest/search",
            Some("jql=project%20%3D%20PROJ&startAt=5&maxResults=10"),
        )
        .await
        .unwrap();
        assert_eq!(value["total"], 0);
        assert_eq!(value["startAt"], 5);
    }

    #[tokio::test]
    async fn test_search_jql_default_page_size() {
        let transport = MockTransport::new(|req| {
            assert!(req.query.contains(&("maxResults".to_string(), "160".to_string())));
            Ok(json!({"issues": []}))
        });
        get(
            &router(&transport),
            "/rest/api/latest/search/jql",
            Some("jql=x"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_search_rejects_bad_pagination() {
        let transport = MockTransport::new(|_| panic!("validation must precede upstream calls"));
        let err = get(
            &router(&transport),
            "/rest/api/latest/search",
            Some("jql=x&startAt=abc"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
    }

    #[tokio::test]
    async fn test_get_issue_with_fields() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.path, "/rest/api/2/issue/PROJ-1");
            assert!(req.query.contains(&("fields".to_string(), "summary,status".to_string())));
            Ok(json!({"key": "PROJ-1"}))
        });
        let value = get(
            &router(&transport),
            "/rest/api/latest/issue/PROJ-1",
            Some("fields=summary,status"),
        )
        .await
        .unwrap();
        assert_eq!(value["key"], "PROJ-1");
    }

    #[tokio::test]
    async fn test_update_issue() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.method, Method::PUT);
            assert_eq!(req.path, "/rest/api/2/issue/PROJ-1");
            Ok(Value::Null)
        });
        let body = Bytes::from(r#"{"fields": {"summary": "updated"}}"#);
        let value = router(&transport)
            .dispatch(
                &Method::PUT,
                "/rest/api/latest/issue/PROJ-1",
                None,
                None,
                body,
            )
            .await
            .unwrap();
        assert_eq!(value["message"], "Issue PROJ-1 updated successfully");
    }

    #[tokio::test]
    async fn test_create_issue_requires_fields() {
        let transport = MockTransport::new(|_| panic!("validation must precede upstream calls"));
        let err = router(&transport)
            .dispatch(
                &Method::POST,
                "/rest/api/latest/issue",
                None,
                None,
                Bytes::from("{}"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_issue() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.method, Method::POST);
            assert_eq!(req.path, "/rest/api/2/issue");
            assert_eq!(req.body.as_ref().unwrap()["fields"]["summary"], "new issue");
            Ok(json!({"id": "10000", "key": "PROJ-7"}))
        });
        let body = Bytes::from(r#"{"fields": {"summary": "new issue"}}"#);
        let value = router(&transport)
            .dispatch(&Method::POST, "/rest/api/latest/issue", None, None, body)
            .await
            .unwrap();
        assert_eq!(value["key"], "PROJ-7");
    }

    #[tokio::test]
    async fn test_transition_requires_id() {
        let transport = MockTransport::new(|_| panic!("validation must precede upstream calls"));
        for body in [r#"{}"#, r#"{"transition": {}}"#, r#"{"fields": {"a": 1}}"#] {
            let err = router(&transport)
                .dispatch(
                    &Method::POST,
                    "/rest/api/latest/issue/PROJ-1/transitions",
                    None,
                    None,
                    Bytes::from(body),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ProxyError::Validation(_)), "body: {body}");
        }
        assert_eq!(transport.upstream_call_count(), 0);
    }

    #[tokio::test]
    async fn test_transition_issue() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.path, "/rest/api/2/issue/PROJ-1/transitions");
            assert_eq!(req.body.as_ref().unwrap()["transition"]["id"], "31");
            Ok(Value::Null)
        });
        let value = router(&transport)
            .dispatch(
                &Method::POST,
                "/rest/api/latest/issue/PROJ-1/transitions",
                None,
                None,
                Bytes::from(r#"{"transition": {"id": "31"}}"#),
            )
            .await
            .unwrap();
        assert_eq!(value["message"], "Issue PROJ-1 transitioned successfully");
    }

    #[tokio::test]
    async fn test_projects() {
        let transport = MockTransport::new(|req| {
            if req.path == "/rest/api/2/project" {
                Ok(json!([{"key": "PROJ"}, {"key": "OTHER"}]))
            } else {
                assert_eq!(req.path, "/rest/api/2/project/PROJ");
                Ok(json!({"key": "PROJ", "name": "Project"}))
            }
        });
        let all = get(&router(&transport), "/rest/api/latest/project", None)
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 2);

        let one = get(&router(&transport), "/rest/api/latest/project/PROJ", None)
            .await
            .unwrap();
        assert_eq!(one["name"], "Project");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let transport = MockTransport::new(|_| panic!("no upstream call expected"));
        for (method, path) in [
            (Method::GET, "/rest/api/latest/unknown"),
            (Method::DELETE, "/rest/api/latest/issue/PROJ-1"),
            (Method::GET, "/other/prefix"),
        ] {
            let err = router(&transport)
                .dispatch(&method, path, None, None, Bytes::new())
                .await
                .unwrap_err();
            assert!(matches!(err, ProxyError::NotFound(_)), "{method} {path}");
        }
    }

    #[tokio::test]
    async fn test_upstream_error_propagates_unchanged() {
        let transport = MockTransport::new(|_| Err(ProxyError::NotFound("Jira resource not found".into())));
        let err = get(&router(&transport), "/rest/api/latest/issue/PROJ-1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NotFound(_)));
        assert_eq!(err.kind(), "NotFoundError");
    }
}
