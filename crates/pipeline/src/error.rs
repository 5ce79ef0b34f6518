//! Pipeline error and outcome types.

use common::TransactionId;
use erp_gateway::GatewayError;
use serde::Serialize;
use thiserror::Error;

use crate::services::WarehouseError;

/// Fatal conditions that terminate an invocation without sending an email.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The warehouse has no purchase line items for the transaction, even
    /// after the ingestion-lag retry budget.
    #[error("purchase details for transaction {0} not found after retries")]
    IncompleteData(TransactionId),

    /// A warehouse query failed in a required stage.
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// An ERP call failed in a required stage.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Terminal states of one pipeline invocation that did not raise an error.
///
/// Skips are warnings, not failures: the fiscal document may well have been
/// emitted even when no email can be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The receipt email was handed to the provider.
    Sent,
    /// The payload had no `dados` block or no transaction id; nothing was
    /// called.
    SkippedMalformedPayload,
    /// The customer record carries no tax id, so no lookup is possible.
    SkippedMissingTaxId,
    /// Neither the warehouse nor the ERP knows an email for the customer.
    SkippedNoEmail,
    /// The email provider kept failing until the retry budget ran out.
    EmailExhausted,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_serialize_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&PipelineOutcome::SkippedMissingTaxId).unwrap(),
            "\"skipped_missing_tax_id\""
        );
        assert_eq!(
            serde_json::to_string(&PipelineOutcome::Sent).unwrap(),
            "\"sent\""
        );
    }
}
