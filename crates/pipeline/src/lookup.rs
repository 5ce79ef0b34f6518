//! Customer email resolution.

use common::TaxId;
use erp_gateway::{ErpClient, Transport};

use crate::error::PipelineError;
use crate::services::Warehouse;

/// Resolves a customer's email by tax id.
///
/// The warehouse contact table is the source of truth; a miss there (no
/// row, or rows without an email) falls back to the ERP's contact search.
/// Warehouse query errors propagate: they mean the contact source of truth
/// is unreachable, which is an operational failure.
pub async fn resolve_email<W: Warehouse, T: Transport>(
    warehouse: &W,
    erp: &ErpClient<T>,
    contacts_table: &str,
    tax_id: &TaxId,
) -> Result<Option<String>, PipelineError> {
    tracing::info!(%tax_id, "resolving customer email");

    let query = format!(
        "SELECT email FROM `{contacts_table}` WHERE cpf_cnpj = '{tax_id}'",
    );

    let rows = warehouse.query(&query).await?;
    for row in &rows {
        if let Some(email) = row.get_str("email").filter(|email| !email.is_empty()) {
            tracing::info!(%tax_id, email, "email found in warehouse");
            return Ok(Some(email.to_string()));
        }
    }

    tracing::warn!(%tax_id, "no email in warehouse, falling back to ERP contact search");
    let email = erp.search_contact_email(tax_id).await?;
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryWarehouse;
    use erp_gateway::ScriptedTransport;
    use serde_json::json;

    const CONTACTS: &str = "warehouse.contacts";

    fn erp(transport: &ScriptedTransport) -> ErpClient<ScriptedTransport> {
        ErpClient::with_transport(transport.clone(), "https://erp.example/api2", "t0ken")
    }

    #[tokio::test]
    async fn warehouse_hit_skips_the_erp() {
        let warehouse = InMemoryWarehouse::new();
        warehouse.on_query_containing(CONTACTS, vec![json!({"email": "ana@x.com"})]);
        let transport = ScriptedTransport::new();

        let email = resolve_email(&warehouse, &erp(&transport), CONTACTS, &TaxId::new("111"))
            .await
            .unwrap();
        assert_eq!(email.as_deref(), Some("ana@x.com"));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn rows_without_email_fall_back_to_erp() {
        let warehouse = InMemoryWarehouse::new();
        warehouse.on_query_containing(CONTACTS, vec![json!({"email": ""}), json!({})]);
        let transport = ScriptedTransport::new();
        transport.push_body(json!({
            "retorno": {
                "status_processamento": "3",
                "contatos": [{"contato": {"email": "ana@erp.com"}}]
            }
        }));

        let email = resolve_email(&warehouse, &erp(&transport), CONTACTS, &TaxId::new("111"))
            .await
            .unwrap();
        assert_eq!(email.as_deref(), Some("ana@erp.com"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn double_miss_resolves_to_none() {
        let warehouse = InMemoryWarehouse::new();
        let transport = ScriptedTransport::new();
        transport.push_body(json!({
            "retorno": {"status_processamento": "3", "contatos": []}
        }));

        let email = resolve_email(&warehouse, &erp(&transport), CONTACTS, &TaxId::new("111"))
            .await
            .unwrap();
        assert_eq!(email, None);
    }

    #[tokio::test]
    async fn warehouse_error_propagates() {
        let warehouse = InMemoryWarehouse::new();
        warehouse.fail_query_containing(CONTACTS, "connection lost");
        let transport = ScriptedTransport::new();

        let err = resolve_email(&warehouse, &erp(&transport), CONTACTS, &TaxId::new("111"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Warehouse(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
