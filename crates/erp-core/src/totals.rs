//! # Document Total Engine
//!
//! `total = subtotal + tax - discount`
//!
//! Tax and discount are flat amounts supplied with the document; absent
//! values count as zero. A discount that would push the total below zero is
//! rejected rather than clamped.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::validation::validate_non_negative_cents;

/// The four stored money columns of a document header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Computes totals from a subtotal and optional tax/discount in cents.
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::money::Money;
    /// use erp_core::totals::DocumentTotals;
    ///
    /// let totals = DocumentTotals::compute(Money::from_cents(10000), Some(1000), Some(500)).unwrap();
    /// assert_eq!(totals.total.cents(), 10500);
    /// ```
    pub fn compute(
        subtotal: Money,
        tax_cents: Option<i64>,
        discount_cents: Option<i64>,
    ) -> CoreResult<Self> {
        let tax_cents = tax_cents.unwrap_or(0);
        let discount_cents = discount_cents.unwrap_or(0);
        validate_non_negative_cents("taxCents", tax_cents)?;
        validate_non_negative_cents("discountCents", discount_cents)?;

        let tax = Money::from_cents(tax_cents);
        let discount = Money::from_cents(discount_cents);

        let gross = subtotal
            .checked_add(tax)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "document total".to_string(),
            })?;
        let total = gross - discount;

        if total.is_negative() {
            return Err(CoreError::NegativeTotal {
                subtotal,
                tax,
                discount,
            });
        }

        Ok(DocumentTotals {
            subtotal,
            tax,
            discount,
            total,
        })
    }

    /// Recomputes after an update. Values left as `None` keep their stored
    /// amounts; `new_subtotal` is `Some` only when the lines were replaced.
    pub fn recompute(
        &self,
        new_subtotal: Option<Money>,
        tax_cents: Option<i64>,
        discount_cents: Option<i64>,
    ) -> CoreResult<Self> {
        DocumentTotals::compute(
            new_subtotal.unwrap_or(self.subtotal),
            Some(tax_cents.unwrap_or(self.tax.cents())),
            Some(discount_cents.unwrap_or(self.discount.cents())),
        )
    }

    /// `total == subtotal + tax - discount`
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax - self.discount
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
