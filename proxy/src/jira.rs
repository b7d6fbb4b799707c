//! The translator: maps each proxy operation to one or more upstream Jira
//! calls and reshapes the results into the proxy's declared response shapes.
//!
//! The upstream API is versioned and uneven: most resources live under
//! `/rest/api/2`, while search goes through the v3 `search/jql` endpoint
//! because the older search endpoints are deprecated. The reduced form that
//! endpoint returns is reconciled back into full issues here.

use crate::auth::AuthMode;
use crate::errors::Result;
use crate::models::{CreateIssueRequest, SearchResult, UpdateIssueRequest};
use crate::upstream::{UpstreamRequest, UpstreamTransport};
use http::Method;
use serde_json::{Value, json};

pub struct JiraClient<T> {
    transport: T,
    auth: AuthMode,
}

impl<T: UpstreamTransport> JiraClient<T> {
    pub fn new(transport: T, auth: AuthMode) -> Self {
        Self { transport, auth }
    }

    /// Base request for one upstream call, with authorization headers for the
    /// configured mode attached.
    fn request(
        &self,
        method: Method,
        path: impl Into<String>,
        caller_auth: Option<&str>,
    ) -> UpstreamRequest {
        let mut request = UpstreamRequest::new(method, path);
        for (name, value) in self.auth.upstream_headers(caller_auth) {
            request = request.header(name, value);
        }
        request
    }

    pub async fn server_info(&self, caller_auth: Option<&str>) -> Result<Value> {
        self.transport
            .execute(self.request(Method::GET, "/rest/api/2/serverInfo", caller_auth))
            .await
    }

    /// Search issues via JQL, reconciling the reduced-form response of the
    /// v3 `search/jql` endpoint back into full issue objects.
    ///
    /// When the page comes back in reduced form (stubs without `fields`),
    /// each stub is re-fetched by id, sequentially and in page order. A
    /// failed per-issue fetch falls back to the stub; one bad issue never
    /// fails the page. `total` is the returned page length, since the
    /// reduced endpoint exposes no true total.
    pub async fn search_issues(
        &self,
        caller_auth: Option<&str>,
        jql: &str,
        start_at: u64,
        max_results: u64,
        fields: Option<&[String]>,
    ) -> Result<SearchResult> {
        let mut request = self
            .request(Method::GET, "/rest/api/3/search/jql", caller_auth)
            .query("jql", jql)
            .query("startAt", start_at.to_string())
            .query("maxResults", max_results.to_string());
        if let Some(fields) = fields {
            request = request.query("fields", fields.join(","));
        }

        let data = self.transport.execute(request).await?;

        let expand = data
            .get("expand")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let issues = match data.get("issues").and_then(Value::as_array) {
            Some(issues) => issues.clone(),
            None => Vec::new(),
        };

        let reduced = issues
            .first()
            .map(|issue| issue.get("fields").is_none())
            .unwrap_or(false);

        let issues = if reduced {
            tracing::debug!(stubs = issues.len(), "search returned reduced form");
            self.fetch_full_issues(caller_auth, issues).await
        } else {
            issues
        };

        Ok(SearchResult {
            expand,
            start_at,
            max_results,
            total: issues.len() as u64,
            issues,
        })
    }

    /// Replace each search stub with its full issue representation.
    ///
    /// Fetches run one at a time in stub order. Stubs without an id, and
    /// stubs whose detail fetch fails, are kept as-is.
    async fn fetch_full_issues(
        &self,
        caller_auth: Option<&str>,
        stubs: Vec<Value>,
    ) -> Vec<Value> {
        let mut issues = Vec::with_capacity(stubs.len());
        for stub in stubs {
            let Some(id) = issue_id(&stub) else {
                issues.push(stub);
                continue;
            };
            let request = self.request(
                Method::GET,
                format!("/rest/api/3/issue/{id}"),
                caller_auth,
            );
            match self.transport.execute(request).await {
                Ok(detail) => issues.push(detail),
                Err(err) => {
                    tracing::warn!(issue_id = %id, error = %err, "detail fetch failed, keeping search stub");
                    issues.push(stub);
                }
            }
        }
        issues
    }

    pub async fn get_issue(
        &self,
        caller_auth: Option<&str>,
        issue_key: &str,
        fields: Option<&[String]>,
    ) -> Result<Value> {
        let mut request = self.request(
            Method::GET,
            format!("/rest/api/2/issue/{issue_key}"),
            caller_auth,
        );
        if let Some(fields) = fields {
            request = request.query("fields", fields.join(","));
        }
        self.transport.execute(request).await
    }

    pub async fn create_issue(
        &self,
        caller_auth: Option<&str>,
        issue: &CreateIssueRequest,
    ) -> Result<Value> {
        let request = self
            .request(Method::POST, "/rest/api/2/issue", caller_auth)
            .json(serde_json::to_value(issue)?);
        self.transport.execute(request).await
    }

    pub async fn update_issue(
        &self,
        caller_auth: Option<&str>,
        issue_key: &str,
        update: &UpdateIssueRequest,
    ) -> Result<()> {
        let request = self
            .request(
                Method::PUT,
                format!("/rest/api/2/issue/{issue_key}"),
                caller_auth,
            )
            .json(serde_json::to_value(update)?);
        self.transport.execute(request).await?;
        Ok(())
    }

    pub async fn get_transitions(
        &self,
        caller_auth: Option<&str>,
        issue_key: &str,
    ) -> Result<Value> {
        self.transport
            .execute(self.request(
                Method::GET,
                format!("/rest/api/2/issue/{issue_key}/transitions"),
                caller_auth,
            ))
            .await
    }

    pub async fn transition_issue(
        &self,
        caller_auth: Option<&str>,
        issue_key: &str,
        transition_id: &str,
        fields: Option<&Value>,
    ) -> Result<()> {
        let mut body = json!({ "transition": { "id": transition_id } });
        if let Some(fields) = fields {
            body["fields"] = fields.clone();
        }
        let request = self
            .request(
                Method::POST,
                format!("/rest/api/2/issue/{issue_key}/transitions"),
                caller_auth,
            )
            .json(body);
        self.transport.execute(request).await?;
        Ok(())
    }

    pub async fn list_projects(&self, caller_auth: Option<&str>) -> Result<Value> {
        self.transport
            .execute(self.request(Method::GET, "/rest/api/2/project", caller_auth))
            .await
    }

    pub async fn get_project(
        &self,
        caller_auth: Option<&str>,
        project_key: &str,
    ) -> Result<Value> {
        self.transport
            .execute(self.request(
                Method::GET,
                format!("/rest/api/2/project/{project_key}"),
                caller_auth,
            ))
            .await
    }
}

/// Issue ids arrive as strings from some deployments and numbers from others.
fn issue_id(stub: &Value) -> Option<String> {
    match stub.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}
