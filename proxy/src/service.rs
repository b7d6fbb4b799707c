//! The HTTP boundary: one hyper service that stamps correlation headers,
//! logs the request/response cycle, renders typed errors as JSON, and
//! answers CORS preflight locally.

use crate::errors::ProxyError;
use crate::jira::JiraClient;
use crate::routes::Router;
use crate::upstream::UpstreamTransport;
use http_body_util::{BodyExt, Full, combinators::BoxBody};
use hyper::body::{Bytes, Incoming};
use hyper::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION, CONTENT_TYPE,
    HeaderValue, ORIGIN,
};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::{Value, json};
use shared::headers::{apply_security_headers, new_request_id, stamp_timing};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

type ProxyBody = BoxBody<Bytes, ProxyError>;

pub struct ProxyService<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ProxyService<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<T> {
    router: Router<T>,
    allow_origins: Vec<String>,
}

impl<T: UpstreamTransport> ProxyService<T> {
    pub fn new(client: JiraClient<T>, allow_origins: Vec<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                router: Router::new(client),
                allow_origins,
            }),
        }
    }
}

impl<T> Inner<T>
where
    T: UpstreamTransport,
{
    async fn handle<B>(&self, req: Request<B>, request_id: &str) -> Response<ProxyBody>
    where
        B: hyper::body::Body,
        B::Error: std::fmt::Display,
    {
        if req.method() == Method::OPTIONS {
            return preflight_response();
        }

        let (parts, body) = req.into_parts();
        let caller_auth = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                return self.render_error(
                    ProxyError::Internal(format!("failed to read request body: {err}")),
                    request_id,
                );
            }
        };

        let result = self
            .router
            .dispatch(
                &parts.method,
                parts.uri.path(),
                parts.uri.query(),
                caller_auth.as_deref(),
                body,
            )
            .await;

        match result {
            Ok(value) => json_response(StatusCode::OK, &value),
            Err(err) => self.render_error(err, request_id),
        }
    }

    fn render_error(&self, err: ProxyError, request_id: &str) -> Response<ProxyBody> {
        match &err {
            ProxyError::Internal(detail) => {
                tracing::error!(%request_id, detail, "unhandled internal error");
            }
            other => {
                tracing::error!(%request_id, kind = other.kind(), error = %other, "request failed");
            }
        }

        let mut error = json!({
            "message": err.public_message(),
            "type": err.kind(),
        });
        if let Some(details) = err.details() {
            error["details"] = details.clone();
        }
        let body = json!({ "error": error, "request_id": request_id });
        json_response(err.status_code(), &body)
    }

    fn cors_origin(&self, request_origin: Option<&HeaderValue>) -> Option<HeaderValue> {
        if self.allow_origins.iter().any(|o| o == "*") {
            return Some(HeaderValue::from_static("*"));
        }
        let origin = request_origin?.to_str().ok()?;
        if self.allow_origins.iter().any(|o| o == origin) {
            HeaderValue::from_str(origin).ok()
        } else {
            None
        }
    }
}

fn full(bytes: Vec<u8>) -> ProxyBody {
    Full::new(Bytes::from(bytes))
        .map_err(|never| match never {})
        .boxed()
}

fn json_response(status: StatusCode, value: &Value) -> Response<ProxyBody> {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    let response = Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(full(bytes));
    match response {
        Ok(response) => response,
        Err(_) => Response::new(full(b"{}".to_vec())),
    }
}

fn preflight_response() -> Response<ProxyBody> {
    let response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(ACCESS_CONTROL_ALLOW_METHODS, "*")
        .header(ACCESS_CONTROL_ALLOW_HEADERS, "*")
        .body(full(Vec::new()));
    match response {
        Ok(response) => response,
        Err(_) => Response::new(full(Vec::new())),
    }
}

impl<T> Service<Request<Incoming>> for ProxyService<T>
where
    T: UpstreamTransport + 'static,
{
    type Response = Response<ProxyBody>;
    type Error = ProxyError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move {
            let request_id = new_request_id();
            let started = Instant::now();
            let method = req.method().clone();
            let path = req.uri().path().to_string();
            let origin = req.headers().get(ORIGIN).cloned();
            let is_health = path.ends_with("/health");

            if !is_health {
                tracing::debug!(%request_id, %method, %path, "request");
            }

            let mut response = inner.handle(req, &request_id).await;

            let headers = response.headers_mut();
            stamp_timing(headers, &request_id, started.elapsed());
            apply_security_headers(headers);
            if let Some(allowed) = inner.cors_origin(origin.as_ref()) {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
                headers.insert(
                    ACCESS_CONTROL_ALLOW_CREDENTIALS,
                    HeaderValue::from_static("true"),
                );
            }

            if !is_health {
                tracing::debug!(
                    %request_id,
                    status = response.status().as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "response"
                );
            }

            Ok(response)
        })
    }
}
