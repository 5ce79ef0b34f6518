//! HTTP trigger surface with observability for the receipt pipeline.
//!
//! Exposes a trigger endpoint for newly written webhook event files, with
//! structured logging (tracing) and Prometheus metrics.

pub mod clients;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline::EmailProvider;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use clients::{EnvSecretStore, HttpObjectStore, HttpWarehouse, SendGridMailer};
use config::Config;
use routes::trigger::{AppState, MailerFactory};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/trigger", post(routes::trigger::invoke))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state wired to production clients.
pub fn create_default_state(config: Config) -> Arc<AppState> {
    let client = reqwest::Client::new();

    let mailer_factory: MailerFactory = {
        let client = client.clone();
        Arc::new(move |api_key: String| {
            Arc::new(SendGridMailer::new(client.clone(), api_key)) as Arc<dyn EmailProvider>
        })
    };

    Arc::new(AppState {
        object_store: Arc::new(HttpObjectStore::new(
            client.clone(),
            config.storage_base_url.clone(),
        )),
        secret_store: Arc::new(EnvSecretStore::new()),
        warehouse: Arc::new(HttpWarehouse::new(client, config.warehouse_url.clone())),
        erp_transport: Arc::new(erp_gateway::HttpTransport::new()),
        mailer_factory,
        config,
    })
}
