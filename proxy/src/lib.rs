pub mod auth;
pub mod config;
pub mod errors;
pub mod jira;
pub mod models;
pub mod routes;
pub mod service;
pub mod upstream;

use crate::config::Config;
use crate::errors::ProxyError;
use crate::jira::JiraClient;
use crate::service::ProxyService;
use crate::upstream::JiraTransport;
use shared::http::run_http_service;

/// Run the proxy until the process is terminated.
pub async fn run(config: Config) -> Result<(), ProxyError> {
    let transport = JiraTransport::new(&config.jira_base_url)?;
    let client = JiraClient::new(transport, config.auth.clone());
    let service = ProxyService::new(client, config.allow_origins.clone());

    run_http_service(&config.listener.host, config.listener.port, service).await
}
