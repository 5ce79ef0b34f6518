//! Value objects assembled by the pipeline and handed to the email
//! provider as dynamic template data. Nothing here is ever persisted.

use serde::Serialize;

/// Outcome of the fiscal document orchestration.
///
/// `document_id` absent means generation failed (non-fatal); `public_url`
/// absent means the link lookup failed or was never attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiscalDocumentRef {
    pub document_id: Option<String>,
    pub public_url: Option<String>,
}

/// One purchase line item, projected straight from the warehouse row.
///
/// Field names match the email template's placeholders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseItem {
    pub item_name: String,
    pub item_quantity: f64,
    pub item_price: f64,
    pub total_item_price: f64,
}

/// Header-level purchase figures plus the line items.
///
/// `items` is guaranteed non-empty: an empty result set is fatal to the
/// transaction before this value is ever built. `total_discount` keeps the
/// warehouse's textual encoding untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchaseSummary {
    pub items: Vec<PurchaseItem>,
    pub sub_total: f64,
    pub total_discount: String,
    pub total_paid: f64,
    pub payment_method: String,
}

/// Loyalty figures for the customer; each field independently falls back
/// to zero when its query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LoyaltyMetrics {
    pub daily_checkins: u64,
    pub quarter_spend: f64,
    pub lifetime_spend: f64,
}

/// The terminal artifact of one invocation: everything the email template
/// needs, keyed the way the template expects.
#[derive(Debug, Clone, Serialize)]
pub struct EmailPayload {
    pub client_email: String,
    pub client_name: String,
    pub dados_id: String,
    pub items: Vec<PurchaseItem>,
    pub sub_total: f64,
    pub total_discount: String,
    pub total_paid: f64,
    pub payment_method: String,
    pub daily_checkins: u64,
    pub quarter_spend: f64,
    pub lifetime_spend: f64,
    /// Omitted from the serialized template data when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nota_fiscal_url: Option<String>,
}

impl EmailPayload {
    /// Merges the aggregated purchase and loyalty data with the customer
    /// identity into the final template payload.
    pub fn assemble(
        client_email: String,
        client_name: String,
        dados_id: String,
        purchase: PurchaseSummary,
        loyalty: LoyaltyMetrics,
        nota_fiscal_url: Option<String>,
    ) -> Self {
        Self {
            client_email,
            client_name,
            dados_id,
            items: purchase.items,
            sub_total: purchase.sub_total,
            total_discount: purchase.total_discount,
            total_paid: purchase.total_paid,
            payment_method: purchase.payment_method,
            daily_checkins: loyalty.daily_checkins,
            quarter_spend: loyalty.quarter_spend,
            lifetime_spend: loyalty.lifetime_spend,
            nota_fiscal_url,
        }
    }
}
