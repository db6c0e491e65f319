//! # Payment Application Engine
//!
//! Keeps an invoice's `paid`, `balance` and `status` in step with its
//! payments.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply(amount)          payment created                                 │
//! │    amount > balance?  → Overpayment (invoice untouched)                 │
//! │    paid += amount; balance = total - paid                               │
//! │                                                                         │
//! │  amend(old, new)        payment amount or status changed                │
//! │    paid' = paid - old + new; balance = total - paid'                    │
//! │    balance < 0?       → BalanceWouldBeNegative                          │
//! │                                                                         │
//! │  reverse(amount)        payment deleted                                 │
//! │    paid -= amount; balance = total - paid                               │
//! │                                                                         │
//! │  retotal(new_total)     lines/tax/discount edited, payments survive     │
//! │    balance = new_total - paid                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Derivation
//! After every mutation the status is recomputed from the amounts, never
//! patched incrementally:
//!
//! | paid | balance | status                                |
//! |------|---------|---------------------------------------|
//! | > 0  | 0       | PAID                                  |
//! | > 0  | > 0     | SENT (OVERDUE stays OVERDUE)          |
//! | 0    | any     | DRAFT (OVERDUE stays OVERDUE)         |
//!
//! CANCELLED invoices accept no payments and keep their status.

use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::InvoiceStatus;
use crate::validation::validate_non_negative_cents;

/// Settlement state of one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InvoiceBalance {
    pub total: Money,
    pub paid: Money,
    pub balance: Money,
    pub status: InvoiceStatus,
}

impl InvoiceBalance {
    /// State of a freshly created invoice: nothing paid, DRAFT.
    pub fn open(total: Money) -> Self {
        InvoiceBalance {
            total,
            paid: Money::zero(),
            balance: total,
            status: InvoiceStatus::Draft,
        }
    }

    /// `balance == total - paid`
    pub fn is_consistent(&self) -> bool {
        self.balance == self.total - self.paid
    }

    /// Rejects payments against cancelled invoices.
    pub fn ensure_payable(&self, number: &str) -> CoreResult<()> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(CoreError::InvoiceNotPayable {
                number: number.to_string(),
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Applies a new payment.
    ///
    /// ## Example
    /// ```rust
    /// use erp_core::money::Money;
    /// use erp_core::settlement::InvoiceBalance;
    /// use erp_core::types::InvoiceStatus;
    ///
    /// let open = InvoiceBalance::open(Money::from_cents(10500));
    /// let paid = open.apply(Money::from_cents(10500)).unwrap();
    /// assert!(paid.balance.is_zero());
    /// assert_eq!(paid.status, InvoiceStatus::Paid);
    ///
    /// assert!(paid.apply(Money::from_cents(100)).is_err());
    /// ```
    pub fn apply(&self, amount: Money) -> CoreResult<Self> {
        validate_non_negative_cents("amountCents", amount.cents())?;

        if amount > self.balance {
            return Err(CoreError::Overpayment {
                requested: amount,
                balance: self.balance,
            });
        }

        if amount.is_zero() {
            return Ok(*self);
        }

        Ok(self.settle(self.paid + amount))
    }

    /// Replaces one payment's contribution `old` with `new`.
    ///
    /// Both values are effective amounts: an inactive payment contributes
    /// zero, so status changes go through here too.
    pub fn amend(&self, old: Money, new: Money) -> CoreResult<Self> {
        validate_non_negative_cents("amountCents", new.cents())?;

        let adjusted = self
            .paid
            .checked_sub(old)
            .and_then(|paid| paid.checked_add(new))
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "payment amend".to_string(),
            })?;
        if adjusted.is_negative() || adjusted > self.total {
            return Err(CoreError::BalanceWouldBeNegative {
                total: self.total,
                paid: adjusted,
            });
        }

        Ok(self.settle(adjusted))
    }

    /// Removes a payment's contribution.
    pub fn reverse(&self, amount: Money) -> CoreResult<Self> {
        let remaining = self.paid - amount;
        if remaining.is_negative() {
            return Err(CoreError::ReversalExceedsPaid {
                amount,
                paid: self.paid,
            });
        }

        Ok(self.settle(remaining))
    }

    /// Moves the invoice to a new total while keeping what has been paid.
    ///
    /// A DRAFT or SENT invoice with nothing paid keeps its status; the
    /// amounts only decide the status once money has come in.
    pub fn retotal(&self, new_total: Money) -> CoreResult<Self> {
        if new_total < self.paid {
            return Err(CoreError::BalanceWouldBeNegative {
                total: new_total,
                paid: self.paid,
            });
        }

        let mut next = InvoiceBalance {
            total: new_total,
            paid: self.paid,
            balance: new_total - self.paid,
            status: self.status,
        };
        if self.paid.is_positive() || self.status == InvoiceStatus::Paid {
            next.status = derive_status(next.paid, next.balance, self.status);
        }
        Ok(next)
    }

    /// Validates a status chosen by a user on invoice update.
    pub fn with_requested_status(&self, requested: InvoiceStatus) -> CoreResult<Self> {
        let reject = |reason: &str| CoreError::InvalidStatusChange {
            entity: "invoice".to_string(),
            from: self.status.to_string(),
            to: requested.to_string(),
            reason: reason.to_string(),
        };

        let fully_paid = self.paid.is_positive() && self.balance.is_zero();
        match requested {
            InvoiceStatus::Paid if !fully_paid => {
                return Err(reject("outstanding balance is not zero"));
            }
            InvoiceStatus::Draft | InvoiceStatus::Cancelled if self.paid.is_positive() => {
                return Err(reject("payments have been recorded"));
            }
            InvoiceStatus::Sent | InvoiceStatus::Overdue if fully_paid => {
                return Err(reject("invoice is fully paid"));
            }
            _ => {}
        }

        Ok(InvoiceBalance {
            status: requested,
            ..*self
        })
    }

    fn settle(&self, paid: Money) -> Self {
        let balance = self.total - paid;
        InvoiceBalance {
            total: self.total,
            paid,
            balance,
            status: derive_status(paid, balance, self.status),
        }
    }
}

/// Status as a function of the amounts (see module docs).
pub fn derive_status(paid: Money, balance: Money, current: InvoiceStatus) -> InvoiceStatus {
    match current {
        InvoiceStatus::Cancelled => InvoiceStatus::Cancelled,
        _ if paid.is_positive() && balance.is_zero() => InvoiceStatus::Paid,
        InvoiceStatus::Overdue => InvoiceStatus::Overdue,
        _ if paid.is_positive() => InvoiceStatus::Sent,
        _ => InvoiceStatus::Draft,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
