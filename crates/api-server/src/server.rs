//! API server — HTTP routes and the Prometheus metrics exporter.

use crate::rest::{self, AppState};
use axum::routing::{get, post};
use axum::Router;
use mailpress_core::config::AppConfig;
use mailpress_engine::Dispatcher;
use mailpress_store::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Main API server for campaign dispatch and engagement endpoints.
pub struct ApiServer {
    config: AppConfig,
    store: Arc<MemoryStore>,
    dispatcher: Arc<Dispatcher>,
}

impl ApiServer {
    pub fn new(config: AppConfig, store: Arc<MemoryStore>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            store,
            dispatcher,
        }
    }

    /// Start the HTTP server. Blocks until shutdown.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let state = AppState {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
            base_url: self.config.dispatch.public_base_url.clone(),
            start_time: Instant::now(),
        };

        let app = Router::new()
            // Campaign endpoints
            .route("/api/campaigns", get(rest::list_campaigns))
            .route("/api/campaigns/:id", get(rest::get_campaign))
            .route("/api/campaigns/:id/dispatch", post(rest::dispatch_campaign))
            // Engagement endpoints referenced by generated content
            .route("/unsubscribe", get(rest::unsubscribe))
            .route("/track/open", get(rest::track_open))
            .route("/track/click", get(rest::track_click))
            // Operational endpoints
            .route("/health", get(rest::health_check))
            .route("/ready", get(rest::readiness))
            .route("/live", get(rest::liveness))
            // Middleware
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics server on a separate port.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install_recorder()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");

        // Keep the handle alive
        std::mem::forget(handle);
        Ok(())
    }
}
