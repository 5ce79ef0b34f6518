//! Typed operations against the ERP's api2 endpoints.

use common::{TaxId, TransactionId};
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::{field_as_string, ApiGateway};
use crate::transport::{HttpTransport, Transport};

/// Client for the three ERP endpoints the pipeline drives: fiscal document
/// generation, public link lookup, and contact search.
///
/// The bearer token travels as a query parameter per the ERP's convention;
/// the gateway redacts it from every log line.
#[derive(Debug, Clone)]
pub struct ErpClient<T: Transport> {
    gateway: ApiGateway<T>,
    base_url: String,
    token: String,
}

impl ErpClient<HttpTransport> {
    /// Creates a client over a fresh HTTP transport.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_transport(HttpTransport::new(), base_url, token)
    }
}

impl<T: Transport> ErpClient<T> {
    /// Creates a client over the given transport.
    pub fn with_transport(
        transport: T,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            gateway: ApiGateway::new(transport),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Requests NFCe generation for a transaction and returns the fiscal
    /// document id from `retorno.registros.registro.idNotaFiscal`.
    pub async fn generate_fiscal_document(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<String, GatewayError> {
        tracing::info!(%transaction_id, "starting NFC-e generation");
        let url = format!(
            "{}/gerar.nota.fiscal.pedido.php?token={}&formato=JSON&id={}&modelo=NFCe",
            self.base_url, self.token, transaction_id
        );

        let response = self.gateway.call(&url).await?;
        let document_id = field_as_string(
            response.pointer("/retorno/registros/registro/idNotaFiscal"),
        )
        .ok_or_else(|| {
            GatewayError::Validation(
                "NFCe generation response is missing idNotaFiscal".to_string(),
            )
        })?;

        tracing::info!(%transaction_id, document_id, "NFC-e generated");
        Ok(document_id)
    }

    /// Fetches the public link of a generated fiscal document from
    /// `retorno.link_nfe`.
    pub async fn fetch_document_link(&self, document_id: &str) -> Result<String, GatewayError> {
        tracing::info!(document_id, "fetching fiscal document link");
        let url = format!(
            "{}/nota.fiscal.obter.link.php?token={}&formato=JSON&id={}",
            self.base_url, self.token, document_id
        );

        let response = self.gateway.call(&url).await?;
        let link = response
            .pointer("/retorno/link_nfe")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::Validation(
                    "fiscal document link response is missing link_nfe".to_string(),
                )
            })?;

        tracing::info!(document_id, link, "fiscal document link fetched");
        Ok(link)
    }

    /// Searches the ERP contact directory by tax id and returns the first
    /// contact's email, if any.
    pub async fn search_contact_email(
        &self,
        tax_id: &TaxId,
    ) -> Result<Option<String>, GatewayError> {
        tracing::info!(%tax_id, "searching ERP contacts for email");
        let url = format!(
            "{}/contatos.pesquisa.php?token={}&formato=JSON&cpf_cnpj={}",
            self.base_url, self.token, tax_id
        );

        let response = self.gateway.call(&url).await?;
        let email = response
            .pointer("/retorno/contatos")
            .and_then(Value::as_array)
            .and_then(|contacts| contacts.first())
            .and_then(|entry| entry.pointer("/contato/email"))
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
            .map(str::to_string);

        match &email {
            Some(email) => tracing::info!(%tax_id, email, "contact email found in ERP"),
            None => tracing::warn!(%tax_id, "no contact email found in ERP"),
        }
        Ok(email)
    }
}
