//! HTTP gateway for the Tiny ERP fiscal-document API.
//!
//! The ERP wraps every response in a `retorno` envelope whose
//! `status_processamento` field carries the real outcome, independent of
//! the HTTP status. This crate classifies that envelope into a closed error
//! taxonomy, retries the transient kinds with bounded exponential backoff,
//! and exposes the three typed operations the pipeline needs: fiscal
//! document generation, public link lookup, and contact search.

pub mod error;
pub mod gateway;
pub mod operations;
pub mod transport;

pub use error::{GatewayError, TransportError};
pub use gateway::ApiGateway;
pub use operations::ErpClient;
pub use transport::{HttpTransport, ScriptedTransport, Transport};
