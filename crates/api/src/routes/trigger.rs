//! Pipeline trigger endpoint.
//!
//! The cloud scheduler (or bucket notification relay) posts the location of
//! a newly written webhook event file; the handler downloads it, builds a
//! fresh processor with credentials fetched for this invocation, and runs
//! the pipeline to completion.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use erp_gateway::{ErpClient, Transport};
use pipeline::{
    EmailProvider, EventProcessor, NotificationDispatcher, ObjectStore, PipelineOutcome,
    SecretStore, Warehouse, WebhookEvent,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::ApiError;

/// Builds an email provider from the API key fetched for one invocation.
pub type MailerFactory = Arc<dyn Fn(String) -> Arc<dyn EmailProvider> + Send + Sync>;

/// Shared application state accessible from all handlers.
///
/// Everything here is invocation-independent; credentials and the processor
/// itself are built per request so rotation takes effect immediately.
pub struct AppState {
    pub config: Config,
    pub object_store: Arc<dyn ObjectStore>,
    pub secret_store: Arc<dyn SecretStore>,
    pub warehouse: Arc<dyn Warehouse>,
    pub erp_transport: Arc<dyn Transport>,
    pub mailer_factory: MailerFactory,
}

#[derive(Deserialize)]
pub struct TriggerRequest {
    /// Bucket holding the webhook event file.
    pub bucket: String,
    /// Object name of the event file.
    pub name: String,
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub outcome: PipelineOutcome,
}

/// POST /trigger — process one webhook event file.
#[tracing::instrument(skip(state, req), fields(bucket = %req.bucket, name = %req.name))]
pub async fn invoke(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ApiError> {
    metrics::counter!("api_trigger_requests_total").increment(1);

    let bytes = state.object_store.download(&req.bucket, &req.name).await?;
    let event = WebhookEvent::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("invalid event payload: {e}")))?;

    let erp_token = state
        .secret_store
        .access(&state.config.erp_token_secret)
        .await?;
    let email_key = state
        .secret_store
        .access(&state.config.email_key_secret)
        .await?;

    let erp = ErpClient::with_transport(
        state.erp_transport.clone(),
        state.config.erp_base_url.clone(),
        erp_token,
    );
    let provider = (state.mailer_factory)(email_key);
    let dispatcher = NotificationDispatcher::new(provider, state.config.dispatch());
    let processor = EventProcessor::new(
        erp,
        state.warehouse.clone(),
        state.config.tables(),
        dispatcher,
    );

    let outcome = processor.process(&event).await?;
    Ok(Json(TriggerResponse { outcome }))
}
