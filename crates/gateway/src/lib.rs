//! HTTP gateway for ragchat.
//!
//! Serves the embedded browser client and a small JSON API. Every browser
//! page is its own session with its own [`ChatController`](ragchat_chain::ChatController):
//! one history, one turn in flight. See [`session`].
//!
//! Built on Axum.

pub mod api;
pub mod frontend;
pub mod session;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    http::{HeaderName, HeaderValue},
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use ragchat_chain::ConversationOrchestrator;
use ragchat_config::{AppConfig, GatewayConfig};

use crate::session::{SESSION_HEADER, SessionStore};

/// Shared application state.
pub struct AppState {
    pub sessions: SessionStore,
    pub model: String,
    /// Number of chunks in the knowledge base.
    pub documents: usize,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// State with sessions bounded by the gateway settings.
    pub fn new(
        orchestrator: Arc<ConversationOrchestrator>,
        gateway: &GatewayConfig,
        model: impl Into<String>,
        documents: usize,
    ) -> Self {
        Self {
            sessions: SessionStore::new(
                orchestrator,
                gateway.max_sessions,
                Duration::from_secs(gateway.session_idle_secs),
            ),
            model: model.into(),
            documents,
            start_time: chrono::Utc::now(),
        }
    }

    pub fn orchestrator(&self) -> &Arc<ConversationOrchestrator> {
        self.sessions.orchestrator()
    }

    /// Wire provider, knowledge base, orchestrator and controller from config.
    ///
    /// Fails when no API key is available or the knowledge file can't be loaded.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let provider = ragchat_providers::default_from_config(config)?;
        let (retriever, documents) =
            ragchat_retrieval::build_from_config(&config.retrieval, provider.clone()).await?;

        let orchestrator = ConversationOrchestrator::builder(provider, retriever)
            .from_config(config)
            .build()?;

        info!(
            model = %orchestrator.model(),
            documents,
            history_aware = orchestrator.is_history_aware(),
            "Chat pipeline ready"
        );

        let model = orchestrator.model().to_string();
        Ok(Self::new(Arc::new(orchestrator), &config.gateway, model, documents))
    }
}

/// Build the full router: health, `/v1` API and the embedded frontend.
///
/// Layers: request body limit (64 KB), CORS, HTTP trace logging.
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", api::v1_router(state))
        .merge(frontend::frontend_router())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(cors_layer(gateway))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Same-origin by default; configured origins are allowed explicitly.
fn cors_layer(gateway: &GatewayConfig) -> CorsLayer {
    let mut origins: Vec<HeaderValue> = gateway
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        origins.extend(format!("http://localhost:{}", gateway.port).parse::<HeaderValue>().ok());
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            HeaderName::from_static(SESSION_HEADER),
        ])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config).await?);
    let app = build_router(state, &config.gateway);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
