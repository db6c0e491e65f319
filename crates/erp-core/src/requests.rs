//! # Request Types
//!
//! Input payloads the controller layer hands to the services. They mirror
//! the JSON bodies of the REST endpoints (camelCase, money in cents).
//!
//! Field-level checks (non-negative prices, quantity ≥ 1, email format) run
//! in [`crate::validation`] before any business logic.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{InvoiceStatus, OrderStatus, PaymentMethod, PaymentStatus, SaleStatus};

// =============================================================================
// Line Items
// =============================================================================

/// One requested line: which product, how many, at what unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl LineItemInput {
    pub fn new(product_id: impl Into<String>, quantity: i64, unit_price_cents: i64) -> Self {
        LineItemInput {
            product_id: product_id.into(),
            quantity,
            unit_price_cents,
        }
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Fields common to creating an order, invoice or sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub customer_id: String,
    pub company_id: Option<String>,
    pub user_id: String,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub items: Vec<LineItemInput>,
    /// Defaults to 0.
    pub tax_cents: Option<i64>,
    /// Defaults to 0.
    pub discount_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Fields common to updating an order, invoice or sale. `None` leaves the
/// stored value untouched; `items: Some(..)` replaces every line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChanges {
    pub customer_id: Option<String>,
    pub company_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub date: Option<DateTime<Utc>>,
    pub items: Option<Vec<LineItemInput>>,
    pub tax_cents: Option<i64>,
    pub discount_cents: Option<i64>,
    pub notes: Option<String>,
}

impl DocumentChanges {
    /// True when the change affects subtotal, tax, discount or total.
    pub fn touches_totals(&self) -> bool {
        self.items.is_some() || self.tax_cents.is_some() || self.discount_cents.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(flatten)]
    pub draft: DocumentDraft,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(flatten)]
    pub changes: DocumentChanges,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    #[serde(flatten)]
    pub draft: DocumentDraft,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    #[serde(flatten)]
    pub changes: DocumentChanges,
    pub status: Option<InvoiceStatus>,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    #[serde(flatten)]
    pub draft: DocumentDraft,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleUpdate {
    #[serde(flatten)]
    pub changes: DocumentChanges,
    pub status: Option<SaleStatus>,
    pub payment_method: Option<PaymentMethod>,
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    pub invoice_id: String,
    pub amount_cents: i64,
    /// Defaults to now.
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    /// Defaults to COMPLETED.
    pub status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

/// The invoice a payment belongs to cannot be changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentUpdate {
    pub amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub payment_date: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub status: Option<PaymentStatus>,
    pub notes: Option<String>,
}

// =============================================================================
// Products & Customers
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub cost_cents: Option<i64>,
    /// Opening stock.
    pub quantity: i64,
    pub min_stock: i64,
}

/// Stock is not editable here; it moves only with sales.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub cost_cents: Option<i64>,
    pub min_stock: Option<i64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_invoice_deserializes_flat_payload() {
        let json = r#"{
            "customerId": "c1",
            "userId": "u1",
            "items": [{"productId": "A", "quantity": 2, "unitPriceCents": 5000}],
            "taxCents": 1000,
            "discountCents": 500,
            "dueDate": "2026-11-30"
        }"#;
        let req: NewInvoice = serde_json::from_str(json).unwrap();
        assert_eq!(req.draft.customer_id, "c1");
        assert_eq!(req.draft.items, vec![LineItemInput::new("A", 2, 5000)]);
        assert_eq!(req.draft.tax_cents, Some(1000));
        assert_eq!(req.due_date, NaiveDate::from_ymd_opt(2026, 11, 30));
    }

    #[test]
    fn test_touches_totals() {
        assert!(!DocumentChanges::default().touches_totals());
        let changes = DocumentChanges {
            discount_cents: Some(0),
            ..Default::default()
        };
        assert!(changes.touches_totals());
    }
}
