//! Notification dispatch with its own local retry loop.

use std::time::Duration;

use crate::payload::EmailPayload;
use crate::services::{EmailMessage, EmailProvider, SuppressionGroup};

/// Maximum send attempts, including the first.
const MAX_ATTEMPTS: u32 = 3;
/// Base of the inter-attempt sleep, in seconds.
const RETRY_BASE_SECS: u64 = 30;

/// Returns the sleep scheduled before the given 1-based attempt:
/// 60s before attempt 2, 120s before attempt 3.
fn retry_delay(next_attempt: u32) -> Duration {
    Duration::from_secs(RETRY_BASE_SECS * 2u64.pow(next_attempt - 1))
}

/// Terminal state of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The provider accepted the message.
    Sent,
    /// No recipient address; nothing was submitted.
    Skipped,
    /// Every attempt failed; the failure is terminal for this invocation
    /// but does not propagate.
    Exhausted,
}

/// Static dispatch settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub from_email: String,
    pub template_id: String,
    /// When set, every message goes to `test_email` instead of the
    /// customer.
    pub test_mode: bool,
    pub test_email: String,
    pub suppression: SuppressionGroup,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            from_email: "sac@emporiozingaro.com".to_string(),
            template_id: "d-f5543523eceb42bc9eec353aebc19aef".to_string(),
            test_mode: false,
            test_email: "rodrigo@brunale.com".to_string(),
            suppression: SuppressionGroup {
                group_id: 23816,
                groups_to_display: vec![23816, 23831, 23817],
            },
        }
    }
}

/// Builds the outbound message and submits it with a bounded retry loop,
/// independent of any retry the provider's transport applies.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher<P: EmailProvider> {
    provider: P,
    config: DispatchConfig,
}

impl<P: EmailProvider> NotificationDispatcher<P> {
    /// Creates a dispatcher over the given provider.
    pub fn new(provider: P, config: DispatchConfig) -> Self {
        Self { provider, config }
    }

    /// Sends the receipt email for an assembled payload.
    pub async fn send(&self, payload: &EmailPayload) -> DispatchStatus {
        let recipient = if self.config.test_mode {
            self.config.test_email.clone()
        } else {
            payload.client_email.clone()
        };

        if recipient.is_empty() {
            tracing::warn!(
                client_name = payload.client_name,
                "email not sent, no address for client"
            );
            return DispatchStatus::Skipped;
        }

        let message = EmailMessage {
            from_email: self.config.from_email.clone(),
            to_email: recipient.clone(),
            template_id: self.config.template_id.clone(),
            dynamic_data: serde_json::to_value(payload).unwrap_or_default(),
            suppression: self.config.suppression.clone(),
        };

        for attempt in 1..=MAX_ATTEMPTS {
            match self.provider.send(&message).await {
                Ok(response) if response.is_success() => {
                    tracing::info!(recipient, attempt, "email sent");
                    metrics::counter!("pipeline_emails_sent_total").increment(1);
                    return DispatchStatus::Sent;
                }
                Ok(response) => {
                    tracing::error!(
                        recipient,
                        attempt,
                        status = response.status,
                        body = response.body,
                        "email provider rejected the message"
                    );
                }
                Err(err) => {
                    tracing::error!(recipient, attempt, error = %err, "email send failed");
                }
            }

            if attempt < MAX_ATTEMPTS {
                let delay = retry_delay(attempt + 1);
                tracing::warn!(
                    recipient,
                    attempt,
                    delay_secs = delay.as_secs(),
                    "retrying email send"
                );
                tokio::time::sleep(delay).await;
            }
        }

        tracing::error!(recipient, "max retry attempts reached for sending email");
        metrics::counter!("pipeline_emails_exhausted_total").increment(1);
        DispatchStatus::Exhausted
    }
}
