//! # Stock Ledger
//!
//! Plans the on-hand quantity changes caused by the sale lifecycle. Orders
//! and invoices never touch stock.
//!
//! ```text
//! sale created   : -new
//! sale replaced  : +old  -new      (netted per product)
//! sale deleted   : +old
//! ```
//!
//! erp-db applies the plan with one `UPDATE products SET quantity = quantity + ?`
//! per product, inside the transaction that writes the sale.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::types::Product;

/// What happens when a sale would take a product below zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockPolicy {
    /// Stock may go negative (back-orders).
    #[default]
    AllowNegative,
    /// Fail with [`CoreError::InsufficientStock`].
    RejectNegative,
}

impl StockPolicy {
    pub fn from_allow_negative(allow: bool) -> Self {
        if allow {
            StockPolicy::AllowNegative
        } else {
            StockPolicy::RejectNegative
        }
    }
}

/// Signed change to one product's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockMovement {
    pub product_id: String,
    pub delta: i64,
}

/// Net quantity changes for one sale operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockPlan {
    movements: Vec<StockMovement>,
}

impl StockPlan {
    /// Decrements for every line of a new sale.
    pub fn for_sale_created(lines: &[(String, i64)]) -> Self {
        let mut plan = StockPlan::default();
        for (product_id, qty) in lines {
            plan.add(product_id, -qty);
        }
        plan.prune();
        plan
    }

    /// Restores the old lines then takes the new ones.
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::stock::StockPlan;
    ///
    /// let old = vec![("A".to_string(), 3)];
    /// let new = vec![("A".to_string(), 5), ("B".to_string(), 1)];
    /// let plan = StockPlan::for_sale_replaced(&old, &new);
    /// assert_eq!(plan.delta_for("A"), -2);
    /// assert_eq!(plan.delta_for("B"), -1);
    /// ```
    pub fn for_sale_replaced(old: &[(String, i64)], new: &[(String, i64)]) -> Self {
        let mut plan = StockPlan::default();
        for (product_id, qty) in old {
            plan.add(product_id, *qty);
        }
        for (product_id, qty) in new {
            plan.add(product_id, -qty);
        }
        plan.prune();
        plan
    }

    /// Puts every line of a deleted sale back on the shelf.
    pub fn for_sale_deleted(lines: &[(String, i64)]) -> Self {
        let mut plan = StockPlan::default();
        for (product_id, qty) in lines {
            plan.add(product_id, *qty);
        }
        plan.prune();
        plan
    }

    pub fn movements(&self) -> &[StockMovement] {
        &self.movements
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Net delta for `product_id` (0 when untouched).
    pub fn delta_for(&self, product_id: &str) -> i64 {
        self.movements
            .iter()
            .find(|m| m.product_id == product_id)
            .map(|m| m.delta)
            .unwrap_or(0)
    }

    /// Checks every decrement against current stock under `policy`.
    ///
    /// Products that `resolve` cannot find are skipped; the line-item
    /// calculator has already rejected unknown ids on the way in.
    pub fn check_availability<'p, F>(&self, policy: StockPolicy, mut resolve: F) -> CoreResult<()>
    where
        F: FnMut(&str) -> Option<&'p Product>,
    {
        if policy == StockPolicy::AllowNegative {
            return Ok(());
        }

        for movement in self.movements.iter().filter(|m| m.delta < 0) {
            let Some(product) = resolve(&movement.product_id) else {
                continue;
            };
            if product.quantity + movement.delta < 0 {
                return Err(CoreError::InsufficientStock {
                    sku: product.sku.clone(),
                    available: product.quantity,
                    requested: -movement.delta,
                });
            }
        }

        Ok(())
    }

    fn add(&mut self, product_id: &str, delta: i64) {
        match self.movements.iter_mut().find(|m| m.product_id == product_id) {
            Some(m) => m.delta += delta,
            None => self.movements.push(StockMovement {
                product_id: product_id.to_string(),
                delta,
            }),
        }
    }

    fn prune(&mut self) {
        self.movements.retain(|m| m.delta != 0);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
