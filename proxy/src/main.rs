use jira_proxy::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(
        jira_base_url = %config.jira_base_url,
        debug = config.debug,
        "starting Jira API proxy"
    );

    if let Err(err) = jira_proxy::run(config).await {
        tracing::error!(error = %err, "proxy exited with error");
        std::process::exit(1);
    }
}
