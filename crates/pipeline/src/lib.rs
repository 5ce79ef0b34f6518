//! Event-processing pipeline for invoice webhook events.
//!
//! One invocation runs a linear sequence of fallible stages:
//! 1. Parse the webhook payload and extract identifiers.
//! 2. Drive the ERP to emit the fiscal document and fetch its public link
//!    (best effort, never fatal).
//! 3. Resolve the customer's email, warehouse first with an ERP fallback.
//! 4. Aggregate purchase line items and loyalty metrics from the warehouse.
//! 5. Dispatch the templated receipt email with its own bounded retry.
//!
//! Enrichment failures degrade to neutral defaults so the customer still
//! gets their email; failures of required stages (purchase items, warehouse
//! connectivity for contact data) abort the invocation without sending.

pub mod analytics;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod fiscal;
pub mod lookup;
pub mod payload;
pub mod processor;
pub mod services;

pub use dispatch::{DispatchConfig, DispatchStatus, NotificationDispatcher};
pub use error::{PipelineError, PipelineOutcome};
pub use event::WebhookEvent;
pub use payload::{EmailPayload, FiscalDocumentRef, LoyaltyMetrics, PurchaseItem, PurchaseSummary};
pub use processor::EventProcessor;
pub use services::{
    EmailError, EmailMessage, EmailProvider, InMemoryEmailProvider, InMemoryObjectStore,
    InMemorySecretStore, InMemoryWarehouse, ObjectStore, Row, SecretError, SecretStore,
    SendResponse, StorageError, SuppressionGroup, Warehouse, WarehouseError, WarehouseTables,
};
