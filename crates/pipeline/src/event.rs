//! Serde model of the incoming invoice webhook payload.

use serde::{Deserialize, Deserializer};

/// The webhook payload written by the ERP when a sale closes.
///
/// Read-only to the pipeline; only the transaction id and the customer
/// block are consumed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub dados: Option<Dados>,
}

/// The `dados` block identifying the transaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dados {
    /// Transaction id; the ERP serializes it sometimes as a number.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub cliente: Option<Cliente>,
}

/// The customer block of the payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cliente {
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(rename = "cpfCnpj", default)]
    pub cpf_cnpj: Option<String>,
}

impl WebhookEvent {
    /// Decodes a webhook payload from raw object bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
