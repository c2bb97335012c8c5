use std::sync::Arc;

use capsule_care_client::config::Config;
use capsule_care_client::http_client::ReqwestCapsuleCareClient;
use capsule_care_client::{CapsuleCareClient, LoginRequest};
use capsule_care_mcp::{CapsuleCareMcpHandler, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the protocol, so logs go to stderr.
    let log_level = logging::log_level();
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(logging::env_filter(&log_level))
        .init();
    tracing::info!("capsule_care_mcp: log filter: {}", log_level);

    let config = Config::from_env()?;
    let client = ReqwestCapsuleCareClient::from_config(&config)?;

    if let Some(credentials) = config.credentials.clone() {
        let request = LoginRequest {
            username: credentials.username,
            password: credentials.password,
        };
        // A failed login leaves the server usable through the login tool.
        if let Err(e) = client.login(&request).await {
            tracing::warn!("capsule_care_mcp: automatic login failed: {}", e);
        }
    }

    let handler = CapsuleCareMcpHandler::new(Arc::new(client))
        .with_history_max_pages(config.history_max_pages);

    tracing::info!(
        "capsule_care_mcp: registered {} tools and {} prompts",
        handler.tool_count(),
        handler.prompt_count()
    );
    tracing::info!(base_url = %config.base_url, "capsule_care_mcp: starting stdio MCP server");

    let transport = (tokio::io::stdin(), tokio::io::stdout());
    let server = rmcp::serve_server(handler, transport).await?;
    server.waiting().await?;

    Ok(())
}
