//! Gateway error types.

use thiserror::Error;

/// Failure of the underlying HTTP transport, before the ERP envelope is
/// even inspected.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (connection, timeout, non-success status).
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Any other transport-level failure (used by test transports).
    #[error("{0}")]
    Other(String),
}

/// Errors that can come out of an ERP API call.
///
/// Callers pattern-match on the variant, never on message content.
/// Only [`GatewayError::Transport`] and [`GatewayError::RetryableBusiness`]
/// are retried by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network or HTTP-level failure; retried.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The ERP rejected the request as malformed (`status_processamento`
    /// of 2) or the response is missing a required field; never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// The API credential was rejected (`status_processamento` 1 with
    /// `codigo_erro` 1); never retried, surfaced as an operational alert.
    #[error("invalid API token: {0}")]
    InvalidToken(String),

    /// The ERP reported a processing error it considers transient
    /// (`status_processamento` 1, any other error code); retried.
    #[error("retryable upstream error: {0}")]
    RetryableBusiness(String),
}

impl GatewayError {
    /// Returns true if the gateway's retry policy applies to this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_) | GatewayError::RetryableBusiness(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_business_errors_are_retryable() {
        let transport = GatewayError::Transport(TransportError::Other("boom".into()));
        let business = GatewayError::RetryableBusiness("busy".into());
        let validation = GatewayError::Validation("bad parameter".into());
        let token = GatewayError::InvalidToken("expired".into());

        assert!(transport.is_retryable());
        assert!(business.is_retryable());
        assert!(!validation.is_retryable());
        assert!(!token.is_retryable());
    }
}
