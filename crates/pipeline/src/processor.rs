//! The coordinator driving one invocation end to end.

use common::{InvocationId, TaxId, TransactionId};
use erp_gateway::{ErpClient, Transport};
use tracing::Instrument;

use crate::dispatch::{DispatchStatus, NotificationDispatcher};
use crate::error::{PipelineError, PipelineOutcome};
use crate::event::WebhookEvent;
use crate::payload::EmailPayload;
use crate::services::{EmailProvider, Warehouse, WarehouseTables};
use crate::{analytics, fiscal, lookup};

/// Drives the pipeline stages for one webhook event.
///
/// A processor is the invocation context: it is built fresh per event from
/// credentials fetched at the start of that invocation and holds no state
/// shared across invocations, so concurrent events stay fully isolated.
pub struct EventProcessor<T, W, P>
where
    T: Transport,
    W: Warehouse,
    P: EmailProvider,
{
    erp: ErpClient<T>,
    warehouse: W,
    tables: WarehouseTables,
    dispatcher: NotificationDispatcher<P>,
}

impl<T, W, P> EventProcessor<T, W, P>
where
    T: Transport,
    W: Warehouse,
    P: EmailProvider,
{
    /// Creates a processor from its collaborators.
    pub fn new(
        erp: ErpClient<T>,
        warehouse: W,
        tables: WarehouseTables,
        dispatcher: NotificationDispatcher<P>,
    ) -> Self {
        Self {
            erp,
            warehouse,
            tables,
            dispatcher,
        }
    }

    /// Processes one webhook event.
    ///
    /// Enrichment failures (fiscal document, loyalty metrics) degrade to
    /// defaults; fatal conditions (purchase items absent, warehouse
    /// connectivity for contact data) return an error and no email is
    /// sent.
    pub async fn process(&self, event: &WebhookEvent) -> Result<PipelineOutcome, PipelineError> {
        let invocation = InvocationId::new();
        let span = tracing::info_span!("process_event", %invocation);
        self.process_inner(event).instrument(span).await
    }

    async fn process_inner(
        &self,
        event: &WebhookEvent,
    ) -> Result<PipelineOutcome, PipelineError> {
        metrics::counter!("pipeline_invocations_total").increment(1);
        let started = std::time::Instant::now();

        let outcome = self.run_stages(event).await;

        metrics::histogram!("pipeline_duration_seconds").record(started.elapsed().as_secs_f64());
        match &outcome {
            Ok(outcome) => tracing::info!(?outcome, "pipeline finished"),
            Err(err) => {
                metrics::counter!("pipeline_failures_total").increment(1);
                tracing::error!(error = %err, "pipeline aborted");
            }
        }
        outcome
    }

    async fn run_stages(&self, event: &WebhookEvent) -> Result<PipelineOutcome, PipelineError> {
        let Some(dados) = &event.dados else {
            tracing::error!("payload missing 'dados' block");
            return Ok(PipelineOutcome::SkippedMalformedPayload);
        };
        let Some(id) = &dados.id else {
            tracing::error!("payload missing 'dados.id'");
            return Ok(PipelineOutcome::SkippedMalformedPayload);
        };
        let transaction_id = TransactionId::new(id.clone());

        let receipt = fiscal::issue_receipt(&self.erp, &transaction_id).await;

        let cliente = dados.cliente.clone().unwrap_or_default();
        let client_name = cliente.nome.unwrap_or_else(|| "Unknown Client".to_string());
        tracing::info!(client_name, cpf_cnpj = ?cliente.cpf_cnpj, "processing customer");

        let Some(cpf_cnpj) = cliente.cpf_cnpj else {
            tracing::warn!(
                client_name,
                "fiscal document processed but tax id is missing, no email will be sent"
            );
            return Ok(PipelineOutcome::SkippedMissingTaxId);
        };
        let tax_id = TaxId::new(cpf_cnpj);

        let email = lookup::resolve_email(&self.warehouse, &self.erp, &self.tables.contacts, &tax_id)
            .await?;
        let Some(client_email) = email else {
            tracing::warn!(
                client_name,
                %tax_id,
                "no email found, fiscal document processed but no email will be sent"
            );
            return Ok(PipelineOutcome::SkippedNoEmail);
        };

        let (purchase, loyalty) =
            analytics::aggregate(&self.warehouse, &self.tables.sales, &transaction_id, &tax_id)
                .await?;

        let payload = EmailPayload::assemble(
            client_email,
            client_name,
            transaction_id.to_string(),
            purchase,
            loyalty,
            receipt.public_url,
        );

        Ok(match self.dispatcher.send(&payload).await {
            DispatchStatus::Sent => PipelineOutcome::Sent,
            DispatchStatus::Skipped => PipelineOutcome::SkippedNoEmail,
            DispatchStatus::Exhausted => PipelineOutcome::EmailExhausted,
        })
    }
}
