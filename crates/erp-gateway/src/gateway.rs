//! Response classification and retry policy for ERP API calls.

use std::time::Duration;

use serde_json::Value;

use crate::error::GatewayError;
use crate::transport::Transport;

/// Maximum number of call attempts, including the first.
const MAX_ATTEMPTS: u32 = 4;
/// First backoff delay, in seconds.
const BACKOFF_BASE_SECS: f64 = 30.0;
/// Backoff growth factor between attempts.
const BACKOFF_MULTIPLIER: f64 = 2.5;
/// Upper bound on a single backoff delay, in seconds.
const BACKOFF_CAP_SECS: f64 = 187.5;

/// Returns the backoff delay scheduled after the given 1-based attempt:
/// 30s, 75s, 187.5s, then capped at 187.5s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1) as i32;
    let secs = (BACKOFF_BASE_SECS * BACKOFF_MULTIPLIER.powi(exp)).min(BACKOFF_CAP_SECS);
    Duration::from_secs_f64(secs)
}

/// Strips the bearer credential from a URL before it reaches a log line.
///
/// Everything from the `?token=` marker onward is dropped.
pub fn redact_token(url: &str) -> &str {
    url.split("?token=").next().unwrap_or(url)
}

/// Classifying wrapper around a [`Transport`].
///
/// Each call issues the GET, inspects the ERP's `retorno` envelope, and
/// retries transport failures and retryable business errors with bounded
/// exponential backoff. Validation and credential errors propagate
/// immediately.
#[derive(Debug, Clone)]
pub struct ApiGateway<T: Transport> {
    transport: T,
}

impl<T: Transport> ApiGateway<T> {
    /// Creates a gateway over the given transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Calls the URL and returns the classified JSON body.
    pub async fn call(&self, url: &str) -> Result<Value, GatewayError> {
        let mut attempt = 1;
        loop {
            match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        url = redact_token(url),
                        attempt,
                        delay_secs = delay.as_secs_f64(),
                        error = %err,
                        "API call failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        url = redact_token(url),
                        attempt,
                        error = %err,
                        "API call failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<Value, GatewayError> {
        tracing::info!(url = redact_token(url), "making API call");
        let body = self.transport.get(url).await?;
        classify(body)
    }
}

/// Classifies an ERP response body by its embedded processing status.
fn classify(body: Value) -> Result<Value, GatewayError> {
    let status = field_as_string(body.pointer("/retorno/status_processamento"));

    match status.as_deref() {
        Some("3") => Ok(body),
        Some("2") => Err(GatewayError::Validation(
            "invalid query parameter".to_string(),
        )),
        Some("1") => {
            let code = field_as_string(body.pointer("/retorno/codigo_erro"));
            let message = body
                .pointer("/retorno/erros/0/erro")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string();

            if code.as_deref() == Some("1") {
                tracing::error!(error = %message, "ERP API token rejected");
                Err(GatewayError::InvalidToken(message))
            } else {
                Err(GatewayError::RetryableBusiness(message))
            }
        }
        _ => Err(GatewayError::Validation(
            "response is missing retorno.status_processamento".to_string(),
        )),
    }
}

/// Reads a field that the ERP serializes sometimes as a string and
/// sometimes as a number.
pub(crate) fn field_as_string(field: Option<&Value>) -> Option<String> {
    match field? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
