//! Transport trait and implementations for the ERP gateway.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// Trait for issuing a GET request and decoding the JSON body.
///
/// The gateway's classification and retry logic sit above this seam, so
/// tests drive them with a scripted transport instead of a live server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request against the given URL and returns the
    /// decoded JSON body.
    async fn get(&self, url: &str) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str) -> Result<Value, TransportError> {
        (**self).get(url).await
    }
}

/// Production transport backed by a shared reqwest client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a fresh reqwest client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Value, TransportError> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Clone)]
enum Scripted {
    Body(Value),
    TransportFailure(String),
}

#[derive(Debug, Default)]
struct ScriptState {
    script: Vec<Scripted>,
    cursor: usize,
    calls: u32,
}

/// Scripted transport for tests.
///
/// Responses are returned in the order they were pushed; once the script is
/// exhausted the last entry repeats, so a single pushed response can feed
/// every attempt of a retry loop.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<RwLock<ScriptState>>,
}

impl ScriptedTransport {
    /// Creates an empty scripted transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON body to return.
    pub fn push_body(&self, body: Value) {
        self.state.write().unwrap().script.push(Scripted::Body(body));
    }

    /// Queues a transport-level failure.
    pub fn push_transport_failure(&self, message: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .script
            .push(Scripted::TransportFailure(message.into()));
    }

    /// Returns the number of GET calls made so far.
    pub fn call_count(&self) -> u32 {
        self.state.read().unwrap().calls
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, _url: &str) -> Result<Value, TransportError> {
        let mut state = self.state.write().unwrap();
        state.calls += 1;

        if state.script.is_empty() {
            return Err(TransportError::Other("no scripted response".to_string()));
        }

        let index = state.cursor;
        if state.cursor + 1 < state.script.len() {
            state.cursor += 1;
        }

        match state.script[index].clone() {
            Scripted::Body(body) => Ok(body),
            Scripted::TransportFailure(message) => Err(TransportError::Other(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_transport_replays_in_order_and_repeats_last() {
        let transport = ScriptedTransport::new();
        transport.push_transport_failure("connection reset");
        transport.push_body(json!({"ok": true}));

        assert!(transport.get("http://x").await.is_err());
        assert_eq!(transport.get("http://x").await.unwrap(), json!({"ok": true}));
        // Script exhausted: last response repeats.
        assert_eq!(transport.get("http://x").await.unwrap(), json!({"ok": true}));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_script_is_a_transport_failure() {
        let transport = ScriptedTransport::new();
        let err = transport.get("http://x").await.unwrap_err();
        assert!(matches!(err, TransportError::Other(_)));
    }
}
