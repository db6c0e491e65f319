//! # Domain Types
//!
//! Core domain types used throughout Ledgerline ERP.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────────────┐   ┌──────────────┐ │
//! │  │    Product      │   │     DocumentHeader       │   │   Payment    │ │
//! │  │  ─────────────  │   │  ──────────────────────  │   │ ──────────── │ │
//! │  │  id (UUID)      │   │  number (ORD-0001 ...)   │   │ invoice_id   │ │
//! │  │  sku (business) │   │  subtotal/tax/discount   │   │ amount_cents │ │
//! │  │  quantity       │   │  total                   │   │ status       │ │
//! │  └─────────────────┘   └────────────┬─────────────┘   └──────────────┘ │
//! │                                     │ flattened into                    │
//! │                  ┌──────────────────┼──────────────────┐               │
//! │                  ▼                  ▼                  ▼               │
//! │              ┌───────┐         ┌─────────┐        ┌───────┐            │
//! │              │ Order │         │ Invoice │        │ Sale  │            │
//! │              │status │         │ paid    │        │status │            │
//! │              └───────┘         │ balance │        └───────┘            │
//! │                                └─────────┘                              │
//! │                Each owns 1..N LineItems                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, document number) - human-readable

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::settlement::InvoiceBalance;
use crate::totals::DocumentTotals;

// =============================================================================
// Document Kind
// =============================================================================

/// The three document types that carry line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Order,
    Invoice,
    Sale,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Order, DocumentKind::Invoice, DocumentKind::Sale];

    /// Prefix used by the numbering authority.
    pub const fn prefix(&self) -> &'static str {
        match self {
            DocumentKind::Order => "ORD",
            DocumentKind::Invoice => "INV",
            DocumentKind::Sale => "SAL",
        }
    }

    /// Storage key (the `kind` column).
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Order => "order",
            DocumentKind::Invoice => "invoice",
            DocumentKind::Sale => "sale",
        }
    }

    /// Initial status for a freshly created document of this kind.
    pub const fn default_status(&self) -> &'static str {
        match self {
            DocumentKind::Order => OrderStatus::Pending.as_str(),
            DocumentKind::Invoice => InvoiceStatus::Draft.as_str(),
            DocumentKind::Sale => SaleStatus::Completed.as_str(),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentKind::Order => "Order",
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Sale => "Sale",
        };
        f.write_str(label)
    }
}

impl FromStr for DocumentKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(DocumentKind::Order),
            "invoice" => Ok(DocumentKind::Invoice),
            "sale" => Ok(DocumentKind::Sale),
            other => Err(invalid_enum("kind", other)),
        }
    }
}

fn invalid_enum(field: &str, value: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("unknown value '{}'", value),
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a status enum whose
/// storage form is the SCREAMING_SNAKE_CASE variant name.
macro_rules! status_strings {
    ($ty:ident, $field:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(invalid_enum($field, other)),
                }
            }
        }
    };
}

// =============================================================================
// Statuses
// =============================================================================

/// Fulfilment status of an order. Orders carry no payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

status_strings!(OrderStatus, "status", {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

/// Invoice status. PAID/SENT/DRAFT are derived from payments by
/// [`crate::settlement`]; OVERDUE and CANCELLED are set manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

status_strings!(InvoiceStatus, "status", {
    Draft => "DRAFT",
    Sent => "SENT",
    Paid => "PAID",
    Overdue => "OVERDUE",
    Cancelled => "CANCELLED",
});

/// Sale status. Sales are recorded at the point of sale, so they start
/// COMPLETED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    #[default]
    Completed,
    Cancelled,
    Refunded,
}

status_strings!(SaleStatus, "status", {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Refunded => "REFUNDED",
});

// =============================================================================
// Payment Method / Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    BankTransfer,
    Check,
    Other,
}

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Active payments count toward the invoice's paid amount.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Completed)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product that can appear on orders, invoices and sales.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name, snapshotted onto line items.
    pub name: String,

    pub description: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Cost in cents (for margin reporting).
    pub cost_cents: Option<i64>,

    /// On-hand stock. Mutated only by the sale lifecycle.
    pub quantity: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every write.
    pub version: i64,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True when on-hand stock is at or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock
    }
}

// =============================================================================
// Customer
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    /// Unique across customers.
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub company_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Line Item
// =============================================================================

/// A line on an order, invoice or sale.
/// Uses snapshot pattern to freeze product data at time of pricing.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: String,
    pub document_id: String,
    pub product_id: String,
    /// SKU at time of pricing (frozen).
    pub sku_snapshot: String,
    /// Product name at time of pricing (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// quantity × unit_price_cents
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Documents
// =============================================================================

/// Fields shared by orders, invoices and sales.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHeader {
    pub id: String,
    /// Sequential human-readable number, assigned once at creation.
    pub number: String,
    pub customer_id: String,
    pub company_id: Option<String>,
    /// Creator.
    pub user_id: String,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token.
    pub version: i64,
}

impl DocumentHeader {
    /// The stored totals as a [`DocumentTotals`].
    pub fn totals(&self) -> DocumentTotals {
        DocumentTotals {
            subtotal: Money::from_cents(self.subtotal_cents),
            tax: Money::from_cents(self.tax_cents),
            discount: Money::from_cents(self.discount_cents),
            total: Money::from_cents(self.total_cents),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub status: InvoiceStatus,
    /// Σ active payment amounts.
    pub paid_cents: i64,
    /// total_cents - paid_cents
    pub balance_cents: i64,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub items: Vec<LineItem>,
    pub payments: Vec<Payment>,
}

impl Invoice {
    /// The invoice's settlement state.
    pub fn balance(&self) -> InvoiceBalance {
        InvoiceBalance {
            total: Money::from_cents(self.header.total_cents),
            paid: Money::from_cents(self.paid_cents),
            balance: Money::from_cents(self.balance_cents),
            status: self.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    #[serde(flatten)]
    pub header: DocumentHeader,
    pub status: SaleStatus,
    pub payment_method: Option<PaymentMethod>,
    pub items: Vec<LineItem>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment applied against an invoice.
/// An invoice can have many payments (installments, split tender).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub invoice_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub payment_date: DateTime<Utc>,
    pub method: PaymentMethod,
    /// External reference (bank ref, cheque number, card auth code).
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// What this payment contributes to the invoice's paid amount.
    #[inline]
    pub fn effective_amount(&self) -> Money {
        effective_amount(self.amount(), self.status)
    }
}

/// Amount a payment in `status` contributes; inactive payments count zero.
#[inline]
pub fn effective_amount(amount: Money, status: PaymentStatus) -> Money {
    if status.is_active() {
        amount
    } else {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
