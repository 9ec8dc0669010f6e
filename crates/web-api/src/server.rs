use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ops_insight_core::{DetectionConfig, HistoryStore, RecordFeed, ReportSink};
use ops_insight_data::{DailyKpiRepository, VerdictRepository};

use crate::handlers;

/// Shared state behind the trigger API: the engine's collaborators plus
/// read-side repositories for the report endpoint.
pub struct AppState {
    pub auth_token: String,
    pub detection: DetectionConfig,
    pub feed: Arc<dyn RecordFeed>,
    pub store: Arc<dyn HistoryStore>,
    pub sinks: Vec<Arc<dyn ReportSink>>,
    pub kpi: DailyKpiRepository,
    pub verdicts: VerdictRepository,
}

pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/run", post(handlers::run))
            .route("/api/report/:date", get(handlers::report))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Ops trigger API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
