//! Warehouse query trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Warehouse query failure.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// The query engine rejected or failed the query.
    #[error("warehouse query failed: {0}")]
    Query(String),
}

/// One result row with named columns.
///
/// The warehouse contract is a black box: query text in, rows out. Columns
/// arrive as JSON values; numeric columns may be encoded as numbers or as
/// decimal strings depending on the upstream table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(serde_json::Map<String, Value>);

impl Row {
    /// Builds a row from a JSON object; non-object values yield an empty
    /// row.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    /// Returns a raw column value.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Returns a string column.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.0.get(column).and_then(Value::as_str)
    }

    /// Returns a numeric column, accepting both JSON numbers and decimal
    /// strings.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns an integer column, accepting both JSON numbers and digit
    /// strings.
    pub fn get_u64(&self, column: &str) -> Option<u64> {
        match self.0.get(column)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Trait for the analytical warehouse's query engine.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs a query and returns its rows.
    async fn query(&self, sql: &str) -> Result<Vec<Row>, WarehouseError>;
}

#[async_trait]
impl<W: Warehouse + ?Sized> Warehouse for Arc<W> {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        (**self).query(sql).await
    }
}

/// Fully-qualified table names the pipeline queries.
#[derive(Debug, Clone)]
pub struct WarehouseTables {
    /// Contact directory keyed by tax id.
    pub contacts: String,
    /// Raw point-of-sale transactions with nested line items.
    pub sales: String,
}

impl Default for WarehouseTables {
    fn default() -> Self {
        Self {
            contacts: "emporio-zingaro.z316_tiny.z316-tiny-contatos".to_string(),
            sales: "emporio-zingaro.z316_tiny_raw_json.pdv".to_string(),
        }
    }
}

#[derive(Debug)]
enum Scripted {
    Rows(Vec<Row>),
    Failure(String),
}

#[derive(Debug, Default)]
struct WarehouseState {
    rules: Vec<(String, Scripted)>,
    queries: Vec<String>,
}

/// In-memory warehouse for tests.
///
/// Queries are matched by substring against registered rules, in
/// registration order; unmatched queries return an empty result set.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWarehouse {
    state: Arc<RwLock<WarehouseState>>,
}

impl InMemoryWarehouse {
    /// Creates an empty in-memory warehouse.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the given rows for any query containing `pattern`.
    pub fn on_query_containing(&self, pattern: impl Into<String>, rows: Vec<Value>) {
        let rows = rows.into_iter().map(Row::from_value).collect();
        self.state
            .write()
            .unwrap()
            .rules
            .push((pattern.into(), Scripted::Rows(rows)));
    }

    /// Fails any query containing `pattern`.
    pub fn fail_query_containing(&self, pattern: impl Into<String>, message: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .rules
            .push((pattern.into(), Scripted::Failure(message.into())));
    }

    /// Returns the number of queries executed so far.
    pub fn query_count(&self) -> usize {
        self.state.read().unwrap().queries.len()
    }

    /// Returns the queries executed so far.
    pub fn queries(&self) -> Vec<String> {
        self.state.read().unwrap().queries.clone()
    }
}

#[async_trait]
impl Warehouse for InMemoryWarehouse {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, WarehouseError> {
        let mut state = self.state.write().unwrap();
        state.queries.push(sql.to_string());

        for (pattern, scripted) in &state.rules {
            if sql.contains(pattern.as_str()) {
                return match scripted {
                    Scripted::Rows(rows) => Ok(rows.clone()),
                    Scripted::Failure(message) => Err(WarehouseError::Query(message.clone())),
                };
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_reads_numbers_and_decimal_strings() {
        let row = Row::from_value(json!({
            "total_paid": "20.50",
            "sub_total": 20.5,
            "daily_checkins": 3,
            "payment_method": "pix"
        }));

        assert_eq!(row.get_f64("total_paid"), Some(20.5));
        assert_eq!(row.get_f64("sub_total"), Some(20.5));
        assert_eq!(row.get_u64("daily_checkins"), Some(3));
        assert_eq!(row.get_str("payment_method"), Some("pix"));
        assert_eq!(row.get_f64("missing"), None);
    }

    #[tokio::test]
    async fn rules_match_by_substring_in_order() {
        let warehouse = InMemoryWarehouse::new();
        warehouse.on_query_containing("daily_checkins", vec![json!({"daily_checkins": 3})]);
        warehouse.fail_query_containing("quarter_spend", "quota exceeded");

        let rows = warehouse.query("SELECT daily_checkins FROM t").await.unwrap();
        assert_eq!(rows[0].get_u64("daily_checkins"), Some(3));

        let err = warehouse
            .query("SELECT quarter_spend FROM t")
            .await
            .unwrap_err();
        assert!(matches!(err, WarehouseError::Query(_)));

        // Unmatched queries are a warehouse miss, not an error.
        let rows = warehouse.query("SELECT email FROM contacts").await.unwrap();
        assert!(rows.is_empty());
        assert_eq!(warehouse.query_count(), 3);
    }
}
