//! # erp-core: Financial-State Engine for Ledgerline ERP
//!
//! The arithmetic and status rules that keep orders, invoices, sales and
//! payments consistent. Pure functions only; erp-db owns the I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Ledgerline ERP Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          REST controllers / React dashboard (external)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ DTOs (camelCase JSON)                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                erp-db services (transactions)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ erp-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌────────────┐ ┌──────────┐ ┌────────────┐ ┌────────────┐    │   │
//! │  │   │ line_items │ │  totals  │ │ settlement │ │   stock    │    │   │
//! │  │   │ price_lines│ │ subtotal │ │ paid       │ │ StockPlan  │    │   │
//! │  │   │ subtotal   │ │ +tax     │ │ balance    │ │ netting    │    │   │
//! │  │   │            │ │ -discount│ │ status     │ │ policy     │    │   │
//! │  │   └────────────┘ └──────────┘ └────────────┘ └────────────┘    │   │
//! │  │   numbering • validation • money • types • error               │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Order, Invoice, Sale, Payment)
//! - [`requests`] - Create/update payloads
//! - [`money`] - Money type with integer arithmetic
//! - [`line_items`] - Line-item calculator
//! - [`totals`] - Document total engine
//! - [`settlement`] - Payment application engine
//! - [`numbering`] - Document number format
//! - [`stock`] - Stock movements for the sale lifecycle
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: all amounts are cents (i64), never floats
//! 2. **Recompute, don't patch**: totals and invoice status are derived from
//!    their inputs after every change
//! 3. **Reject, don't clamp**: negative totals and overpayments are errors
//!
//! ## Example Usage
//!
//! ```rust
//! use erp_core::money::Money;
//! use erp_core::settlement::InvoiceBalance;
//! use erp_core::totals::DocumentTotals;
//! use erp_core::types::InvoiceStatus;
//!
//! let totals = DocumentTotals::compute(Money::from_cents(10000), Some(1000), Some(500)).unwrap();
//! assert_eq!(totals.total.cents(), 10500);
//!
//! let invoice = InvoiceBalance::open(totals.total);
//! let settled = invoice.apply(Money::from_cents(10500)).unwrap();
//! assert_eq!(settled.status, InvoiceStatus::Paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod line_items;
pub mod money;
pub mod numbering;
pub mod requests;
pub mod settlement;
pub mod stock;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use requests::*;
pub use settlement::InvoiceBalance;
pub use stock::{StockPlan, StockPolicy};
pub use totals::DocumentTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound on lines per document. Deployments may configure a lower cap.
pub const MAX_LINE_ITEMS: usize = 100;

/// Maximum quantity on a single line.
///
/// ## Business Reason
/// Catches typos such as 10000 instead of 10.
pub const MAX_ITEM_QUANTITY: i64 = 9999;

/// Minimum digits in the sequence part of a document number.
pub const NUMBER_PAD_WIDTH: usize = 4;
