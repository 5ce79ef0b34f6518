//! Fiscal document orchestration.
//!
//! The receipt and its public link are enrichments: the customer must
//! still get their purchase summary email even when the tax-authority
//! integration degrades, so every failure here is logged and swallowed.

use common::TransactionId;
use erp_gateway::{ErpClient, Transport};

use crate::payload::FiscalDocumentRef;

/// Drives the two sequential ERP calls with independent failure tolerance:
/// document generation, then (only on success) the public link lookup.
pub async fn issue_receipt<T: Transport>(
    erp: &ErpClient<T>,
    transaction_id: &TransactionId,
) -> FiscalDocumentRef {
    let document_id = match erp.generate_fiscal_document(transaction_id).await {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::error!(%transaction_id, error = %err, "NFC-e generation failed");
            None
        }
    };

    let public_url = match &document_id {
        Some(id) => match erp.fetch_document_link(id).await {
            Ok(link) => Some(link),
            Err(err) => {
                tracing::error!(document_id = id, error = %err, "fiscal document link lookup failed");
                None
            }
        },
        None => None,
    };

    FiscalDocumentRef {
        document_id,
        public_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erp_gateway::ScriptedTransport;
    use serde_json::json;

    fn client(transport: &ScriptedTransport) -> ErpClient<ScriptedTransport> {
        ErpClient::with_transport(transport.clone(), "https://erp.example/api2", "t0ken")
    }

    fn generation_ok(id: &str) -> serde_json::Value {
        json!({
            "retorno": {
                "status_processamento": "3",
                "registros": {"registro": {"idNotaFiscal": id}}
            }
        })
    }

    #[tokio::test]
    async fn both_steps_succeed() {
        let transport = ScriptedTransport::new();
        transport.push_body(generation_ok("55"));
        transport.push_body(json!({
            "retorno": {"status_processamento": "3", "link_nfe": "http://x/55"}
        }));

        let receipt = issue_receipt(&client(&transport), &TransactionId::new("123")).await;
        assert_eq!(receipt.document_id.as_deref(), Some("55"));
        assert_eq!(receipt.public_url.as_deref(), Some("http://x/55"));
    }

    #[tokio::test]
    async fn generation_failure_skips_link_lookup() {
        let transport = ScriptedTransport::new();
        transport.push_body(json!({"retorno": {"status_processamento": "2"}}));

        let receipt = issue_receipt(&client(&transport), &TransactionId::new("123")).await;
        assert_eq!(receipt, FiscalDocumentRef::default());
        // One call only: the link lookup never ran.
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn link_failure_keeps_the_document_id() {
        let transport = ScriptedTransport::new();
        transport.push_body(generation_ok("55"));
        transport.push_body(json!({"retorno": {"status_processamento": "3"}}));

        let receipt = issue_receipt(&client(&transport), &TransactionId::new("123")).await;
        assert_eq!(receipt.document_id.as_deref(), Some("55"));
        assert_eq!(receipt.public_url, None);
    }
}
