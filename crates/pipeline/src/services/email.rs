//! Email provider trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure to reach the email provider at all.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("email transport error: {0}")]
    Transport(String),
}

/// Suppression-group settings attached to every outbound message so
/// recipients can opt out of this category of mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuppressionGroup {
    pub group_id: i64,
    pub groups_to_display: Vec<i64>,
}

/// A structured transactional message for the provider.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from_email: String,
    pub to_email: String,
    pub template_id: String,
    /// The [`crate::EmailPayload`] serialized as template data.
    pub dynamic_data: Value,
    pub suppression: SuppressionGroup,
}

/// HTTP-like status/body pair returned by the provider.
#[derive(Debug, Clone)]
pub struct SendResponse {
    pub status: u16,
    pub body: String,
}

impl SendResponse {
    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the email delivery provider.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Submits a message and returns the provider's status/body pair.
    async fn send(&self, message: &EmailMessage) -> Result<SendResponse, EmailError>;
}

#[async_trait]
impl<P: EmailProvider + ?Sized> EmailProvider for Arc<P> {
    async fn send(&self, message: &EmailMessage) -> Result<SendResponse, EmailError> {
        (**self).send(message).await
    }
}

#[derive(Debug, Default)]
struct EmailState {
    sent: Vec<EmailMessage>,
    attempts: u32,
    failing_attempts: u32,
    fail_transport: bool,
}

/// In-memory email provider for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEmailProvider {
    state: Arc<RwLock<EmailState>>,
}

impl InMemoryEmailProvider {
    /// Creates a new in-memory email provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` send attempts return a 500 status.
    pub fn set_failing_attempts(&self, count: u32) {
        self.state.write().unwrap().failing_attempts = count;
    }

    /// Makes every send fail at the transport level.
    pub fn set_fail_transport(&self, fail: bool) {
        self.state.write().unwrap().fail_transport = fail;
    }

    /// Returns the number of successfully accepted messages.
    pub fn sent_count(&self) -> usize {
        self.state.read().unwrap().sent.len()
    }

    /// Returns the total number of send attempts, including failed ones.
    pub fn attempt_count(&self) -> u32 {
        self.state.read().unwrap().attempts
    }

    /// Returns the last accepted message, if any.
    pub fn last_message(&self) -> Option<EmailMessage> {
        self.state.read().unwrap().sent.last().cloned()
    }
}

#[async_trait]
impl EmailProvider for InMemoryEmailProvider {
    async fn send(&self, message: &EmailMessage) -> Result<SendResponse, EmailError> {
        let mut state = self.state.write().unwrap();
        state.attempts += 1;

        if state.fail_transport {
            return Err(EmailError::Transport("connection refused".to_string()));
        }

        if state.failing_attempts > 0 {
            state.failing_attempts -= 1;
            return Ok(SendResponse {
                status: 500,
                body: "upstream error".to_string(),
            });
        }

        state.sent.push(message.clone());
        Ok(SendResponse {
            status: 202,
            body: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage {
            from_email: "sac@emporiozingaro.com".to_string(),
            to_email: "ana@x.com".to_string(),
            template_id: "d-template".to_string(),
            dynamic_data: json!({"client_name": "Ana"}),
            suppression: SuppressionGroup {
                group_id: 23816,
                groups_to_display: vec![23816, 23831, 23817],
            },
        }
    }

    #[tokio::test]
    async fn accepted_messages_are_recorded() {
        let provider = InMemoryEmailProvider::new();
        let response = provider.send(&message()).await.unwrap();
        assert!(response.is_success());
        assert_eq!(provider.sent_count(), 1);
        assert_eq!(provider.last_message().unwrap().to_email, "ana@x.com");
    }

    #[tokio::test]
    async fn failing_attempts_return_500_then_recover() {
        let provider = InMemoryEmailProvider::new();
        provider.set_failing_attempts(1);

        let first = provider.send(&message()).await.unwrap();
        assert_eq!(first.status, 500);
        let second = provider.send(&message()).await.unwrap();
        assert!(second.is_success());
        assert_eq!(provider.attempt_count(), 2);
        assert_eq!(provider.sent_count(), 1);
    }
}
