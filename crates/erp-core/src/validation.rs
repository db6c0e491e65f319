//! # Validation Module
//!
//! Input validation utilities for Ledgerline ERP.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Controller DTO decorators (external)                         │
//! │  ├── Types, required fields                                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (called by erp-db services)                      │
//! │  ├── Quantities, money, formats, line-item counts                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / CHECK / foreign key constraints               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use erp_core::validation::{validate_sku, validate_quantity};
//!
//! assert!(validate_sku("WIDGET-01").is_ok());
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::requests::LineItemInput;
use crate::{MAX_ITEM_QUANTITY, MAX_LINE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::required("sku"));
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product or customer).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// Deliberately loose: one `@`, a non-empty local part, and a dotted domain.
///
/// ## Example
/// ```rust
/// use erp_core::validation::validate_email;
///
/// assert!(validate_email("billing@acme.io").is_ok());
/// assert!(validate_email("acme.io").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must look like name@domain.tld".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || email.contains(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }

    Ok(())
}

/// Validates that a required reference (customer id, user id) is present.
pub fn validate_reference(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - At least 1
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a money amount that must not be negative (prices, tax,
/// discount, payment amounts). Zero is allowed.
///
/// ## Example
/// ```rust
/// use erp_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("unitPrice", 0).is_ok());
/// assert!(validate_non_negative_cents("unitPrice", -1).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a stock figure (opening quantity, reorder threshold).
pub fn validate_stock_level(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates a document's line items before pricing.
///
/// ## Rules
/// - 1..=`max_lines` lines (capped by MAX_LINE_ITEMS)
/// - Every line: product id present, quantity in range, unit price ≥ 0
pub fn validate_line_items(items: &[LineItemInput], max_lines: usize) -> ValidationResult<()> {
    if items.is_empty() {
        return Err(ValidationError::required("items"));
    }

    let max_lines = max_lines.min(MAX_LINE_ITEMS);
    if items.len() > max_lines {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: max_lines as i64,
        });
    }

    for item in items {
        validate_reference("productId", &item.product_id)?;
        validate_quantity(item.quantity)?;
        validate_non_negative_cents("unitPriceCents", item.unit_price_cents)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("WIDGET-01").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Acme Widget").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("billing@acme.io").is_ok());
        assert!(validate_email("a.b+c@sub.acme.co.uk").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("acme.io").is_err());
        assert!(validate_email("@acme.io").is_err());
        assert!(validate_email("a@acme").is_err());
        assert!(validate_email("a@@acme.io").is_err());
        assert!(validate_email("a b@acme.io").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_non_negative_cents() {
        assert!(validate_non_negative_cents("price", 0).is_ok());
        assert!(validate_non_negative_cents("price", 1099).is_ok());
        assert!(validate_non_negative_cents("price", -100).is_err());
    }

    #[test]
    fn test_validate_line_items() {
        let ok = vec![LineItemInput::new("A", 2, 5000)];
        assert!(validate_line_items(&ok, 10).is_ok());

        assert!(matches!(
            validate_line_items(&[], 10),
            Err(ValidationError::Required { .. })
        ));
        assert!(validate_line_items(&[LineItemInput::new("A", 0, 5000)], 10).is_err());
        assert!(validate_line_items(&[LineItemInput::new("A", 1, -1)], 10).is_err());
        assert!(validate_line_items(&[LineItemInput::new("", 1, 1)], 10).is_err());

        let many = vec![LineItemInput::new("A", 1, 1); 3];
        assert!(validate_line_items(&many, 2).is_err());
    }
}
