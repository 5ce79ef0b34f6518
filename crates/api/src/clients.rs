//! Production implementations of the pipeline's service traits.
//!
//! Each type speaks plain HTTP (or the process environment) so the service
//! runs against real infrastructure; the in-memory doubles in the pipeline
//! crate cover everything below this layer in tests.

use async_trait::async_trait;
use pipeline::{
    EmailError, EmailMessage, EmailProvider, Row, SecretError, SecretStore, SendResponse,
    StorageError, Warehouse, WarehouseError,
};

/// Object store reading webhook event files over HTTP.
///
/// Objects resolve to `{base_url}/{bucket}/{name}`, matching the public
/// read endpoint of the cloud bucket.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl pipeline::ObjectStore for HttpObjectStore {
    async fn download(&self, bucket: &str, name: &str) -> Result<Vec<u8>, StorageError> {
        let url = format!("{}/{}/{}", self.base_url, bucket, name);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound {
                bucket: bucket.to_string(),
                name: name.to_string(),
            });
        }

        let response = response
            .error_for_status()
            .map_err(|e| StorageError::Io(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Secret store reading from the process environment.
///
/// A secret identifier maps to its environment variable by uppercasing and
/// replacing dashes, so `z316-tiny-token-api` reads `Z316_TINY_TOKEN_API`.
/// The deployment injects secret-manager values through the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn access(&self, name: &str) -> Result<String, SecretError> {
        let var = name.to_uppercase().replace('-', "_");
        std::env::var(&var).map_err(|e| SecretError::Unavailable {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Warehouse client posting queries to an HTTP query endpoint.
///
/// The endpoint accepts `{"query": "<sql>"}` and answers with
/// `{"rows": [{...}, ...]}`.
#[derive(Debug, Clone)]
pub struct HttpWarehouse {
    client: reqwest::Client,
    url: String,
}

impl HttpWarehouse {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Warehouse for HttpWarehouse {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "query": sql }))
            .send()
            .await
            .map_err(|e| WarehouseError::Query(e.to_string()))?
            .error_for_status()
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let rows = body
            .get("rows")
            .and_then(|rows| rows.as_array())
            .map(|rows| rows.iter().cloned().map(Row::from_value).collect())
            .unwrap_or_default();
        Ok(rows)
    }
}

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Email provider submitting to the SendGrid v3 mail send endpoint.
#[derive(Debug, Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
}

impl SendGridMailer {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for SendGridMailer {
    async fn send(&self, message: &EmailMessage) -> Result<SendResponse, EmailError> {
        let body = serde_json::json!({
            "from": { "email": message.from_email },
            "personalizations": [{
                "to": [{ "email": message.to_email }],
                "dynamic_template_data": message.dynamic_data,
            }],
            "template_id": message.template_id,
            "asm": {
                "group_id": message.suppression.group_id,
                "groups_to_display": message.suppression.groups_to_display,
            },
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;
        Ok(SendResponse { status, body })
    }
}
