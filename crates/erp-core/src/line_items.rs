//! # Line-Item Calculator
//!
//! Turns requested lines into priced lines and a subtotal. Used by orders,
//! invoices and sales alike.
//!
//! ## Flow
//! ```text
//! [{productId, quantity, unitPrice}, ...]
//!      │
//!      ▼
//! resolve(productId) ──► None? → ProductNotFound (nothing is written)
//!      │
//!      ▼
//! line_total = quantity × unit_price      (integer cents, no rounding)
//!      │
//!      ▼
//! subtotal = Σ line_total
//! ```
//!
//! Resolution is injected as a closure so this module stays free of I/O;
//! erp-db loads the referenced products first and passes a map lookup.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::requests::LineItemInput;
use crate::types::Product;
use crate::validation::{validate_non_negative_cents, validate_quantity};

/// A requested line after product resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total: Money,
}

/// Result of pricing a full line set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLines {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
}

impl PricedLines {
    /// Total quantity per product, in first-seen order.
    pub fn quantities(&self) -> Vec<(String, i64)> {
        quantities_by_product(self.lines.iter().map(|l| (l.product_id.as_str(), l.quantity)))
    }
}

/// Prices `inputs` in order.
///
/// Fails with [`CoreError::ProductNotFound`] on the first product id that
/// `resolve` cannot find. Quantity and unit price are re-checked here so the
/// calculator never produces a negative line.
pub fn price_lines<'p, F>(inputs: &[LineItemInput], mut resolve: F) -> CoreResult<PricedLines>
where
    F: FnMut(&str) -> Option<&'p Product>,
{
    let mut lines = Vec::with_capacity(inputs.len());
    let mut subtotal = Money::zero();

    for input in inputs {
        validate_quantity(input.quantity)?;
        validate_non_negative_cents("unitPriceCents", input.unit_price_cents)?;

        let product = resolve(&input.product_id)
            .ok_or_else(|| CoreError::ProductNotFound(input.product_id.clone()))?;

        let unit_price = Money::from_cents(input.unit_price_cents);
        let total = unit_price
            .checked_multiply_quantity(input.quantity)
            .ok_or_else(|| overflow("line total"))?;
        subtotal = subtotal.checked_add(total).ok_or_else(|| overflow("subtotal"))?;

        lines.push(PricedLine {
            product_id: product.id.clone(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            quantity: input.quantity,
            unit_price,
            total,
        });
    }

    Ok(PricedLines { lines, subtotal })
}

/// Sums quantities per product id, keeping first-seen order.
pub fn quantities_by_product<'a, I>(lines: I) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut out: Vec<(String, i64)> = Vec::new();
    for (product_id, qty) in lines {
        match out.iter_mut().find(|(id, _)| id == product_id) {
            Some((_, total)) => *total += qty,
            None => out.push((product_id.to_string(), qty)),
        }
    }
    out
}

fn overflow(context: &str) -> CoreError {
    CoreError::AmountOverflow {
        context: context.to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn product(id: &str, sku: &str) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: sku.to_string(),
            name: format!("Product {}", sku),
            description: None,
            price_cents: 5000,
            cost_cents: None,
            quantity: 10,
            min_stock: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    fn catalog() -> HashMap<String, Product> {
        [product("A", "SKU-A"), product("B", "SKU-B")]
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect()
    }

    #[test]
    fn test_prices_lines_and_subtotal() {
        let products = catalog();
        let inputs = vec![
            LineItemInput::new("A", 2, 5000),
            LineItemInput::new("B", 3, 199),
        ];

        let priced = price_lines(&inputs, |id| products.get(id)).unwrap();

        assert_eq!(priced.lines.len(), 2);
        assert_eq!(priced.lines[0].total.cents(), 10000);
        assert_eq!(priced.lines[0].sku, "SKU-A");
        assert_eq!(priced.lines[1].total.cents(), 597);
        assert_eq!(priced.subtotal.cents(), 10597);

        let sum: Money = priced.lines.iter().map(|l| l.total).sum();
        assert_eq!(sum, priced.subtotal);
    }

    #[test]
    fn test_request_price_wins_over_catalog_price() {
        let products = catalog();
        let priced = price_lines(&[LineItemInput::new("A", 1, 4200)], |id| products.get(id)).unwrap();
        assert_eq!(priced.lines[0].unit_price.cents(), 4200);
    }

    #[test]
    fn test_unknown_product_fails() {
        let products = catalog();
        let inputs = vec![
            LineItemInput::new("A", 1, 100),
            LineItemInput::new("MISSING", 1, 100),
        ];

        let err = price_lines(&inputs, |id| products.get(id)).unwrap_err();
        assert!(matches!(err, CoreError::ProductNotFound(id) if id == "MISSING"));
    }

    #[test]
    fn test_zero_price_lines_allowed() {
        let products = catalog();
        let priced = price_lines(&[LineItemInput::new("A", 5, 0)], |id| products.get(id)).unwrap();
        assert!(priced.subtotal.is_zero());
    }

    #[test]
    fn test_rejects_bad_quantity() {
        let products = catalog();
        assert!(price_lines(&[LineItemInput::new("A", 0, 100)], |id| products.get(id)).is_err());
    }

    #[test]
    fn test_overflow_is_reported() {
        let products = catalog();
        let err = price_lines(&[LineItemInput::new("A", 2, i64::MAX)], |id| products.get(id))
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }

    #[test]
    fn test_quantities_merge_duplicate_products() {
        let products = catalog();
        let inputs = vec![
            LineItemInput::new("A", 2, 100),
            LineItemInput::new("B", 1, 100),
            LineItemInput::new("A", 3, 90),
        ];
        let priced = price_lines(&inputs, |id| products.get(id)).unwrap();
        assert_eq!(
            priced.quantities(),
            vec![("A".to_string(), 5), ("B".to_string(), 1)]
        );
    }
}
