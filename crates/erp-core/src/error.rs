//! # Error Types
//!
//! Domain-specific error types for erp-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  erp-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  erp-db errors (separate crate)                                        │
//! │  ├── DbError          - Database operation failures                    │
//! │  ├── ServiceError     - CoreError | DbError                            │
//! │  └── ApiError         - What the controller layer serializes           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → ApiError           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every error is terminal for the request that raised it. Nothing in the
//! engine retries.

use serde::Serialize;
use thiserror::Error;

use crate::money::Money;
use crate::types::DocumentKind;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification used by the controller layer to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// A referenced entity does not exist (404).
    NotFound,
    /// Duplicate unique key or concurrent modification (409).
    Conflict,
    /// The request is well-formed but breaks a business rule (422).
    InvalidOperation,
    /// The request itself is malformed (400).
    Validation,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A line item references a product id that does not resolve.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The document's customer does not exist.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Order, invoice or sale not found.
    #[error("{kind} not found: {id}")]
    DocumentNotFound { kind: DocumentKind, id: String },

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Payment would exceed the invoice's outstanding balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Invoice INV-0001: total 105.00, paid 105.00, balance 0.00
    ///      │
    ///      ▼
    /// Record payment 1.00
    ///      │
    ///      ▼
    /// Overpayment { requested: 1.00, balance: 0.00 }  (invoice untouched)
    /// ```
    #[error("Payment of {requested} exceeds outstanding balance of {balance}")]
    Overpayment { requested: Money, balance: Money },

    /// An amendment, re-total or reversal would leave a negative balance
    /// or negative paid amount.
    #[error("Invoice total {total} cannot cover paid amount {paid}")]
    BalanceWouldBeNegative { total: Money, paid: Money },

    /// Removing a payment would take more than the invoice has recorded.
    #[error("Cannot reverse {amount}, only {paid} has been paid")]
    ReversalExceedsPaid { amount: Money, paid: Money },

    /// Discount larger than subtotal plus tax.
    #[error("Discount {discount} exceeds subtotal {subtotal} plus tax {tax}")]
    NegativeTotal {
        subtotal: Money,
        tax: Money,
        discount: Money,
    },

    /// Payments cannot be recorded against this invoice.
    #[error("Invoice {number} is {status}, payments are not accepted")]
    InvoiceNotPayable { number: String, status: String },

    /// A requested status does not agree with the document's amounts.
    #[error("Cannot move {entity} from {from} to {to}: {reason}")]
    InvalidStatusChange {
        entity: String,
        from: String,
        to: String,
        reason: String,
    },

    /// Deleting this entity would orphan dependent records.
    #[error("{entity} {id} still has {dependents}")]
    HasDependents {
        entity: String,
        id: String,
        dependents: String,
    },

    /// Insufficient stock to complete a sale.
    ///
    /// Only raised when negative stock is disallowed by configuration.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// Arithmetic on request values overflowed.
    #[error("Amount out of range while computing {context}")]
    AmountOverflow { context: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for the controller layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::CustomerNotFound(_)
            | CoreError::DocumentNotFound { .. }
            | CoreError::PaymentNotFound(_) => ErrorKind::NotFound,

            CoreError::Overpayment { .. }
            | CoreError::BalanceWouldBeNegative { .. }
            | CoreError::ReversalExceedsPaid { .. }
            | CoreError::NegativeTotal { .. }
            | CoreError::InvoiceNotPayable { .. }
            | CoreError::InvalidStatusChange { .. }
            | CoreError::HasDependents { .. }
            | CoreError::InsufficientStock { .. } => ErrorKind::InvalidOperation,

            CoreError::AmountOverflow { .. } => ErrorKind::Validation,

            CoreError::Validation(ValidationError::Duplicate { .. }) => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Shorthand for a missing document.
    pub fn document_not_found(kind: DocumentKind, id: impl Into<String>) -> Self {
        CoreError::DocumentNotFound {
            kind,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when request input doesn't meet requirements and are raised
/// before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid email, malformed document number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate SKU or customer email).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Creates a Required error for `field`.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a Duplicate error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        ValidationError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
