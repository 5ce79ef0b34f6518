//! Shared identifier types and value normalization helpers used across
//! the receipt notification pipeline.

pub mod discount;
pub mod types;

pub use types::{InvocationId, TaxId, TransactionId};
