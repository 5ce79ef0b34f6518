//! Warehouse analytics aggregation.
//!
//! Four independent queries feed the email payload: purchase line items
//! (fatal when absent, since the sale must exist in the source of truth),
//! then three loyalty figures that each degrade to zero on failure. The
//! line-items query gets its own retry schedule to ride out warehouse
//! ingestion lag.

use std::time::Duration;

use common::discount;
use common::{TaxId, TransactionId};
use serde_json::Value;

use crate::error::PipelineError;
use crate::payload::{LoyaltyMetrics, PurchaseItem, PurchaseSummary};
use crate::services::{Row, Warehouse, WarehouseError};

/// Maximum attempts for the purchase-items query, including the first.
const MAX_ATTEMPTS: u32 = 4;
/// First ingestion-lag retry delay, in seconds.
const RETRY_BASE_SECS: f64 = 30.0;
/// Ingestion-lag retry growth factor.
const RETRY_MULTIPLIER: f64 = 30.0;
/// Upper bound on a single ingestion-lag retry delay, in seconds.
const RETRY_CAP_SECS: f64 = 90.0;

/// Payment methods that count toward full-price spend.
pub const FULL_PRICE_PAYMENT_METHODS: [&str; 5] =
    ["credito", "debito", "pix", "multiplas", "dinheiro"];

/// Spend accumulated before this date predates the loyalty program.
const LIFETIME_CUTOVER: &str = "2023-10-01";

/// Returns the retry delay scheduled after the given 1-based attempt of
/// the purchase-items query: 30s, then capped at 90s.
pub fn ingestion_retry_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1) as i32;
    let secs = (RETRY_BASE_SECS * RETRY_MULTIPLIER.powi(exp)).min(RETRY_CAP_SECS);
    Duration::from_secs_f64(secs)
}

/// Reference semantics of the full-price SQL filter: the payment method is
/// in the allowed set, the header discount is a textual zero, and every
/// line item's discount is a textual zero.
pub fn transaction_is_full_price(
    payment_method: &str,
    header_discount: &str,
    item_discounts: &[&str],
) -> bool {
    FULL_PRICE_PAYMENT_METHODS.contains(&payment_method)
        && discount::is_textual_zero(header_discount)
        && item_discounts.iter().all(|d| discount::is_textual_zero(d))
}

fn purchase_details_sql(sales_table: &str, transaction_id: &TransactionId) -> String {
    format!(
        "SELECT \
           item.descricao AS item_name, \
           item.quantidade AS item_quantity, \
           item.valor AS item_price, \
           (item.quantidade * item.valor) AS total_item_price, \
           sub.desconto AS total_discount, \
           sub.totalVenda AS total_paid, \
           sub.formaPagamento AS payment_method, \
           SUM(item.quantidade * item.valor) OVER() AS sub_total \
         FROM ( \
           SELECT id, desconto, totalVenda, formaPagamento, itens \
           FROM `{sales_table}` \
           WHERE id = {transaction_id} \
         ) AS sub \
         CROSS JOIN UNNEST(sub.itens) AS item"
    )
}

fn daily_checkins_sql(sales_table: &str, tax_id: &TaxId) -> String {
    format!(
        "SELECT COUNT(DISTINCT FORMAT_DATE('%Y-%m-%d', data)) AS daily_checkins \
         FROM `{sales_table}` \
         WHERE contato.cpfCnpj = '{tax_id}' \
           AND EXTRACT(QUARTER FROM data) = EXTRACT(QUARTER FROM CURRENT_DATE()) \
           AND EXTRACT(YEAR FROM data) = EXTRACT(YEAR FROM CURRENT_DATE())"
    )
}

fn full_price_spend_sql(
    sales_table: &str,
    tax_id: &TaxId,
    alias: &str,
    window_filter: &str,
) -> String {
    let zeros = discount::sql_zero_list();
    let methods: Vec<String> = FULL_PRICE_PAYMENT_METHODS
        .iter()
        .map(|m| format!("'{m}'"))
        .collect();
    let methods = methods.join(", ");

    format!(
        "SELECT SUM(sub.totalVenda) AS {alias} \
         FROM ( \
           SELECT pdv.totalVenda, \
             ARRAY_LENGTH(ARRAY( \
               SELECT AS STRUCT item FROM UNNEST(pdv.itens) item \
               WHERE item.desconto IN ({zeros}) \
             )) AS no_discount_items_count, \
             ARRAY_LENGTH(pdv.itens) AS total_items_count \
           FROM `{sales_table}` AS pdv \
           WHERE pdv.contato.cpfCnpj = '{tax_id}' \
             AND {window_filter} \
             AND pdv.formaPagamento IN ({methods}) \
             AND pdv.desconto IN ({zeros}) \
         ) AS sub \
         WHERE sub.no_discount_items_count = sub.total_items_count"
    )
}

fn quarter_spend_sql(sales_table: &str, tax_id: &TaxId) -> String {
    full_price_spend_sql(
        sales_table,
        tax_id,
        "quarter_spend",
        "EXTRACT(QUARTER FROM pdv.data) = EXTRACT(QUARTER FROM CURRENT_DATE()) \
         AND EXTRACT(YEAR FROM pdv.data) = EXTRACT(YEAR FROM CURRENT_DATE())",
    )
}

fn lifetime_spend_sql(sales_table: &str, tax_id: &TaxId) -> String {
    full_price_spend_sql(
        sales_table,
        tax_id,
        "total_spend",
        &format!("pdv.data >= '{LIFETIME_CUTOVER}'"),
    )
}

/// Fetches the purchase line items and header figures for a transaction.
///
/// An empty result set means the warehouse has not ingested the sale yet,
/// so both empty results and query errors are retried on the ingestion-lag
/// schedule before becoming fatal.
pub async fn purchase_summary<W: Warehouse>(
    warehouse: &W,
    sales_table: &str,
    transaction_id: &TransactionId,
) -> Result<PurchaseSummary, PipelineError> {
    tracing::info!(%transaction_id, "fetching purchase details");
    let query = purchase_details_sql(sales_table, transaction_id);

    let mut last_error: Option<WarehouseError> = None;
    for attempt in 1..=MAX_ATTEMPTS {
        match warehouse.query(&query).await {
            Ok(rows) if !rows.is_empty() => {
                let summary = summarize_rows(&rows);
                tracing::info!(
                    %transaction_id,
                    item_count = summary.items.len(),
                    sub_total = summary.sub_total,
                    "purchase details fetched"
                );
                return Ok(summary);
            }
            Ok(_) => {
                tracing::warn!(
                    %transaction_id,
                    attempt,
                    "no purchase details yet, data may be delayed"
                );
                last_error = None;
            }
            Err(err) => {
                tracing::error!(%transaction_id, attempt, error = %err, "purchase details query failed");
                last_error = Some(err);
            }
        }

        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(ingestion_retry_delay(attempt)).await;
        }
    }

    match last_error {
        Some(err) => Err(err.into()),
        None => Err(PipelineError::IncompleteData(transaction_id.clone())),
    }
}

fn summarize_rows(rows: &[Row]) -> PurchaseSummary {
    let items = rows
        .iter()
        .map(|row| PurchaseItem {
            item_name: row.get_str("item_name").unwrap_or_default().to_string(),
            item_quantity: row.get_f64("item_quantity").unwrap_or(0.0),
            item_price: row.get_f64("item_price").unwrap_or(0.0),
            total_item_price: row.get_f64("total_item_price").unwrap_or(0.0),
        })
        .collect();

    // Header columns repeat on every row of the unnested join.
    let header = &rows[0];
    PurchaseSummary {
        items,
        sub_total: header.get_f64("sub_total").unwrap_or(0.0),
        total_discount: text_column(header, "total_discount"),
        total_paid: header.get_f64("total_paid").unwrap_or(0.0),
        payment_method: header
            .get_str("payment_method")
            .unwrap_or("N/A")
            .to_string(),
    }
}

fn text_column(row: &Row, column: &str) -> String {
    match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "0.00".to_string(),
    }
}

/// Fetches the three loyalty figures; each query failure degrades that
/// figure to zero without affecting the others.
pub async fn loyalty_metrics<W: Warehouse>(
    warehouse: &W,
    sales_table: &str,
    tax_id: &TaxId,
) -> LoyaltyMetrics {
    let daily_checkins = single_u64(
        warehouse,
        &daily_checkins_sql(sales_table, tax_id),
        "daily_checkins",
    )
    .await;
    let quarter_spend = single_f64(
        warehouse,
        &quarter_spend_sql(sales_table, tax_id),
        "quarter_spend",
    )
    .await;
    let lifetime_spend = single_f64(
        warehouse,
        &lifetime_spend_sql(sales_table, tax_id),
        "total_spend",
    )
    .await;

    tracing::info!(%tax_id, daily_checkins, quarter_spend, lifetime_spend, "loyalty metrics fetched");
    LoyaltyMetrics {
        daily_checkins,
        quarter_spend,
        lifetime_spend,
    }
}

async fn single_u64<W: Warehouse>(warehouse: &W, query: &str, column: &str) -> u64 {
    match warehouse.query(query).await {
        Ok(rows) => rows
            .first()
            .and_then(|row| row.get_u64(column))
            .unwrap_or(0),
        Err(err) => {
            tracing::error!(column, error = %err, "loyalty query failed, defaulting to 0");
            0
        }
    }
}

async fn single_f64<W: Warehouse>(warehouse: &W, query: &str, column: &str) -> f64 {
    match warehouse.query(query).await {
        Ok(rows) => rows
            .first()
            .and_then(|row| row.get_f64(column))
            .unwrap_or(0.0),
        Err(err) => {
            tracing::error!(column, error = %err, "loyalty query failed, defaulting to 0");
            0.0
        }
    }
}

/// Runs the items query followed by the three loyalty queries and returns
/// the merged result. The merge order is fixed (items, check-ins, quarter
/// spend, lifetime spend) but the fields are independent by construction.
pub async fn aggregate<W: Warehouse>(
    warehouse: &W,
    sales_table: &str,
    transaction_id: &TransactionId,
    tax_id: &TaxId,
) -> Result<(PurchaseSummary, LoyaltyMetrics), PipelineError> {
    let purchase = purchase_summary(warehouse, sales_table, transaction_id).await?;
    let loyalty = loyalty_metrics(warehouse, sales_table, tax_id).await;
    Ok((purchase, loyalty))
}
