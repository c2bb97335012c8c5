use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use capsule_care_client::config::Config;
use capsule_care_client::{
    AdherenceReport, CapsuleCareClient, CapsuleCareError, LoginRequest, load_history,
    http_client::ReqwestCapsuleCareClient,
};
use capsule_care_mcp::domains::adherence::resolve_window;
use capsule_care_mcp::{CapsuleCareMcpHandler, HISTORY_PAGE_SIZE, McpError, logging};

struct AppState {
    client: Arc<dyn CapsuleCareClient>,
    metrics: PrometheusHandle,
    history_max_pages: u32,
}

#[derive(Debug, Deserialize)]
struct AdherenceQuery {
    days: Option<u32>,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[debug_handler]
async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[debug_handler]
async fn metrics_endpoint(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state.metrics.render();
    ([("content-type", "text/plain; version=0.0.4")], body)
}

#[debug_handler]
async fn adherence(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdherenceQuery>,
) -> Result<Json<AdherenceReport>, (StatusCode, String)> {
    let window = resolve_window(
        query.days,
        query.start_date.as_deref(),
        query.end_date.as_deref(),
        chrono::Local::now().date_naive(),
    )
    .map_err(map_mcp_err)?;
    metrics::counter!("capsulecare_http_adherence_requests_total").increment(1);
    let history = load_history(
        state.client.as_ref(),
        HISTORY_PAGE_SIZE,
        state.history_max_pages,
    )
    .await
    .map_err(map_err)?;
    Ok(Json(AdherenceReport::from_history(&history, window)))
}

fn map_err(e: CapsuleCareError) -> (StatusCode, String) {
    let status = match &e {
        CapsuleCareError::Auth(_) => StatusCode::UNAUTHORIZED,
        CapsuleCareError::NotFound(_) => StatusCode::NOT_FOUND,
        CapsuleCareError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CapsuleCareError::Config(_) | CapsuleCareError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CapsuleCareError::Http(_)
        | CapsuleCareError::Api { .. }
        | CapsuleCareError::Decode(_) => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

fn map_mcp_err(e: McpError) -> (StatusCode, String) {
    match e {
        McpError::Api(inner) => map_err(inner),
        McpError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        McpError::Serialization(_) | McpError::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// `MAX_HTTP_BODY_SIZE` in bytes, 50 MiB when unset or invalid.
fn max_body_size_from(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(50 * 1024 * 1024)
}

fn address_from(raw: Option<&str>) -> SocketAddr {
    raw.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 3000)))
}

#[cfg(test)]
#[allow(clippy::items_after_test_module)]
mod tests {
    use super::*;
    use capsule_care_client::Session;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_for(server: &MockServer, history_max_pages: u32) -> Arc<AppState> {
        Mock::given(method("GET"))
            .and(path("/api/medications/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "medications": [{"id": 1, "prescribed_frequency": "once_daily"}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/notifications/intake"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "intakes": [
                    {"id": 1, "user_medication_id": 1, "status": "taken", "status_at": "2025-03-01T08:00:00"}
                ],
                "total": 3, "page": 1, "per_page": 1, "pages": 3
            })))
            .mount(server)
            .await;
        let client = ReqwestCapsuleCareClient::new(
            &format!("{}/api", server.uri()),
            Session::with_token(secrecy::SecretString::from("tok")),
        );
        Arc::new(AppState {
            client: Arc::new(client),
            metrics: PrometheusBuilder::new().build_recorder().handle(),
            history_max_pages,
        })
    }

    #[tokio::test]
    async fn adherence_endpoint_flags_truncated_history() {
        let server = MockServer::start().await;
        let state = state_for(&server, 1).await;

        let Json(report) = adherence(
            State(state),
            Query(AdherenceQuery {
                days: None,
                start_date: Some("2025-03-01".into()),
                end_date: Some("2025-03-01".into()),
            }),
        )
        .await
        .unwrap();

        assert!(report.history_truncated);
        assert_eq!(report.days[0].taken_count, 1);
    }

    #[tokio::test]
    async fn adherence_endpoint_rejects_inverted_window() {
        let server = MockServer::start().await;
        let state = state_for(&server, 1).await;

        let (status, _) = adherence(
            State(state),
            Query(AdherenceQuery {
                days: None,
                start_date: Some("2025-03-05".into()),
                end_date: Some("2025-03-01".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn client_errors_map_to_http_statuses() {
        assert_eq!(
            map_err(CapsuleCareError::Auth("expired".into())).0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            map_err(CapsuleCareError::NotFound("x".into())).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            map_err(CapsuleCareError::Api {
                status: 503,
                message: "down".into()
            })
            .0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            map_mcp_err(McpError::Validation("days".into())).0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn body_size_and_address_defaults() {
        assert_eq!(max_body_size_from(None), 50 * 1024 * 1024);
        assert_eq!(max_body_size_from(Some("1024")), 1024);
        assert_eq!(max_body_size_from(Some("lots")), 50 * 1024 * 1024);
        assert_eq!(address_from(None).port(), 3000);
        assert_eq!(address_from(Some("0.0.0.0:8080")).port(), 8080);
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_level = logging::log_level();
    tracing_subscriber::fmt()
        .compact()
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(logging::env_filter(&log_level))
        .init();
    tracing::info!(%log_level, "capsule_care_mcp:http: log filter");

    let handle = PrometheusBuilder::new().install_recorder()?;

    let config = Config::from_env()?;
    let client = ReqwestCapsuleCareClient::from_config(&config)?;
    if let Some(credentials) = config.credentials.clone() {
        let request = LoginRequest {
            username: credentials.username,
            password: credentials.password,
        };
        if let Err(e) = client.login(&request).await {
            tracing::warn!("automatic login failed: {}", e);
        }
    }

    let client: Arc<dyn CapsuleCareClient> = Arc::new(client);
    let state = Arc::new(AppState {
        client: client.clone(),
        metrics: handle,
        history_max_pages: config.history_max_pages,
    });

    let max_body_size = max_body_size_from(std::env::var("MAX_HTTP_BODY_SIZE").ok().as_deref());

    let handler =
        CapsuleCareMcpHandler::new(client).with_history_max_pages(config.history_max_pages);
    let factory = move || -> Result<_, std::io::Error> { Ok(handler.clone()) };
    let session = Arc::new(
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default(),
    );
    let mcp_service = rmcp::transport::streamable_http_server::tower::StreamableHttpService::new(
        factory,
        session,
        rmcp::transport::streamable_http_server::tower::StreamableHttpServerConfig::default(),
    );

    let app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/adherence", get(adherence))
        .nest_service("/mcp", mcp_service)
        .layer(axum::extract::DefaultBodyLimit::max(max_body_size))
        .with_state(state);

    let addr = address_from(std::env::var("ADDRESS").ok().as_deref());
    info!(%addr, max_body_bytes = max_body_size, base_url = %config.base_url, "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl+c: {e}");
            }
        })
        .await?;

    Ok(())
}
