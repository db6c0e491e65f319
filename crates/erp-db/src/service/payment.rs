//! # Payment Service
//!
//! Every payment write recomputes the parent invoice in the same
//! transaction.
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DRAFT ──pay part──► SENT ──pay rest──► PAID                           │
//! │    ▲                  │  ▲                │                             │
//! │    └──remove all──────┘  └──remove some───┘                             │
//! │                                                                         │
//! │  OVERDUE stays OVERDUE until fully paid.                               │
//! │  CANCELLED accepts no new money.                                       │
//! │  FAILED / REFUNDED payments count as zero.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use ts_rs::TS;

use super::documents::load_document;
use super::ServiceResult;
use crate::pool::Database;
use crate::repository::document::DocumentRecord;
use crate::repository::{generate_id, DocumentRepository, PaymentRepository};
use erp_core::types::effective_amount;
use erp_core::validation::{validate_non_negative_cents, validate_reference};
use erp_core::{
    CoreError, DocumentKind, InvoiceBalance, InvoiceStatus, Money, NewPayment, Payment,
    PaymentUpdate,
};

/// Invoice amounts after a payment write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSettlement {
    pub invoice_id: String,
    pub number: String,
    pub total_cents: i64,
    pub paid_cents: i64,
    pub balance_cents: i64,
    pub status: InvoiceStatus,
}

impl InvoiceSettlement {
    fn new(record: &DocumentRecord, balance: &InvoiceBalance) -> Self {
        InvoiceSettlement {
            invoice_id: record.id.clone(),
            number: record.number.clone(),
            total_cents: balance.total.cents(),
            paid_cents: balance.paid.cents(),
            balance_cents: balance.balance.cents(),
            status: balance.status,
        }
    }
}

/// A payment together with the invoice state it produced.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub payment: Payment,
    pub invoice: InvoiceSettlement,
}

pub struct PaymentService<'a> {
    db: &'a Database,
}

impl<'a> PaymentService<'a> {
    pub fn new(db: &'a Database) -> Self {
        PaymentService { db }
    }

    /// Records a payment against an invoice.
    ///
    /// ## Returns
    /// * `Err(CoreError::Overpayment)` - amount exceeds the outstanding balance
    /// * `Err(CoreError::InvoiceNotPayable)` - invoice is CANCELLED
    pub async fn create(&self, req: NewPayment) -> ServiceResult<PaymentReceipt> {
        debug!(invoice_id = %req.invoice_id, amount = req.amount_cents, "create payment");
        validate_reference("invoiceId", &req.invoice_id)?;
        validate_non_negative_cents("amountCents", req.amount_cents)?;

        let now = Utc::now();
        let payment = Payment {
            id: generate_id(),
            invoice_id: req.invoice_id.clone(),
            amount_cents: req.amount_cents,
            payment_date: req.payment_date.unwrap_or(now),
            method: req.method,
            reference: req.reference,
            status: req.status.unwrap_or_default(),
            notes: req.notes,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        let record = load_document(&mut tx, DocumentKind::Invoice, &req.invoice_id).await?;
        let balance = record.invoice_balance()?;

        let next = balance
            .ensure_payable(&record.number)
            .and_then(|_| balance.apply(payment.effective_amount()))
            .inspect_err(|e| {
                warn!(invoice = %record.number, amount = payment.amount_cents, error = %e, "Payment rejected")
            })?;

        PaymentRepository::new(&mut tx).insert(&payment).await?;
        DocumentRepository::new(&mut tx)
            .update_invoice_balance(&record.id, record.version, &next)
            .await?;
        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            invoice = %record.number,
            amount = payment.amount_cents,
            paid = next.paid.cents(),
            balance = next.balance.cents(),
            status = %next.status,
            "Payment recorded"
        );

        Ok(PaymentReceipt {
            invoice: InvoiceSettlement::new(&record, &next),
            payment,
        })
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Payment> {
        let mut conn = self.db.pool().acquire().await?;
        PaymentRepository::new(&mut conn)
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(id.to_string()).into())
    }

    /// Payments of one invoice, oldest first.
    pub async fn list_for_invoice(&self, invoice_id: &str) -> ServiceResult<Vec<Payment>> {
        let mut conn = self.db.pool().acquire().await?;
        let record = load_document(&mut conn, DocumentKind::Invoice, invoice_id).await?;
        Ok(PaymentRepository::new(&mut conn)
            .list_for_invoice(&record.id)
            .await?)
    }

    /// Edits a payment. The invoice moves by the difference between the old
    /// and new effective amounts, which covers status changes between active
    /// and inactive.
    pub async fn update(&self, id: &str, req: PaymentUpdate) -> ServiceResult<PaymentReceipt> {
        debug!(id = %id, "update payment");
        if let Some(amount) = req.amount_cents {
            validate_non_negative_cents("amountCents", amount)?;
        }

        let mut tx = self.db.begin().await?;
        let mut payment = PaymentRepository::new(&mut tx)
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(id.to_string()))?;
        let record = load_document(&mut tx, DocumentKind::Invoice, &payment.invoice_id).await?;
        let balance = record.invoice_balance()?;

        let old = payment.effective_amount();
        apply_update(&mut payment, req);
        let new = effective_amount(payment.amount(), payment.status);

        let next = check_amend(&balance, &record.number, old, new)
            .inspect_err(|e| warn!(payment_id = %id, invoice = %record.number, error = %e, "Payment update rejected"))?;

        let payment = PaymentRepository::new(&mut tx).update(&payment).await?;
        DocumentRepository::new(&mut tx)
            .update_invoice_balance(&record.id, record.version, &next)
            .await?;
        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            invoice = %record.number,
            amount = payment.amount_cents,
            status = ?payment.status,
            paid = next.paid.cents(),
            balance = next.balance.cents(),
            "Payment updated"
        );

        Ok(PaymentReceipt {
            invoice: InvoiceSettlement::new(&record, &next),
            payment,
        })
    }

    /// Deletes a payment and takes its amount back off the invoice.
    pub async fn delete(&self, id: &str) -> ServiceResult<InvoiceSettlement> {
        let mut tx = self.db.begin().await?;
        let payment = PaymentRepository::new(&mut tx)
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::PaymentNotFound(id.to_string()))?;
        let record = load_document(&mut tx, DocumentKind::Invoice, &payment.invoice_id).await?;

        let next = record.invoice_balance()?.reverse(payment.effective_amount())?;

        PaymentRepository::new(&mut tx).delete(&payment.id).await?;
        DocumentRepository::new(&mut tx)
            .update_invoice_balance(&record.id, record.version, &next)
            .await?;
        tx.commit().await?;

        info!(
            payment_id = %id,
            invoice = %record.number,
            paid = next.paid.cents(),
            balance = next.balance.cents(),
            status = %next.status,
            "Payment deleted"
        );

        Ok(InvoiceSettlement::new(&record, &next))
    }
}

fn apply_update(payment: &mut Payment, req: PaymentUpdate) {
    if let Some(amount) = req.amount_cents {
        payment.amount_cents = amount;
    }
    if let Some(date) = req.payment_date {
        payment.payment_date = date;
    }
    if let Some(method) = req.method {
        payment.method = method;
    }
    if let Some(reference) = req.reference {
        payment.reference = Some(reference);
    }
    if let Some(status) = req.status {
        payment.status = status;
    }
    if let Some(notes) = req.notes {
        payment.notes = Some(notes);
    }
}

/// A cancelled invoice may lose money but not gain it.
fn check_amend(
    balance: &InvoiceBalance,
    number: &str,
    old: Money,
    new: Money,
) -> erp_core::CoreResult<InvoiceBalance> {
    if new > old {
        balance.ensure_payable(number)?;
    }
    balance.amend(old, new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::{erp_with_catalog, line, Catalog};
    use crate::service::{Erp, ServiceError};
    use erp_core::{DocumentDraft, InvoiceUpdate, NewInvoice, PaymentMethod, PaymentStatus};

    async fn invoice_of(erp: &Erp, fx: &Catalog, total_cents: i64) -> String {
        erp.invoices()
            .create(NewInvoice {
                draft: DocumentDraft {
                    customer_id: fx.customer_id.clone(),
                    user_id: "u1".to_string(),
                    items: vec![line(&fx.widget, 1, total_cents)],
                    ..Default::default()
                },
                due_date: None,
            })
            .await
            .unwrap()
            .header
            .id
    }

    fn pay(invoice_id: &str, amount_cents: i64) -> NewPayment {
        NewPayment {
            invoice_id: invoice_id.to_string(),
            amount_cents,
            method: PaymentMethod::Cash,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 10000).await;

        let first = erp.payments().create(pay(&invoice_id, 2500)).await.unwrap();
        assert_eq!(first.invoice.paid_cents, 2500);
        assert_eq!(first.invoice.balance_cents, 7500);
        assert_eq!(first.invoice.status, InvoiceStatus::Sent);
        assert_eq!(first.payment.status, PaymentStatus::Completed);

        let second = erp.payments().create(pay(&invoice_id, 7500)).await.unwrap();
        assert_eq!(second.invoice.balance_cents, 0);
        assert_eq!(second.invoice.status, InvoiceStatus::Paid);

        let invoice = erp.invoices().get(&invoice_id).await.unwrap();
        assert_eq!(invoice.payments.len(), 2);
        assert_eq!(invoice.paid_cents, 10000);
    }

    #[tokio::test]
    async fn test_overpayment_leaves_invoice_unchanged() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 1000).await;

        let err = erp.payments().create(pay(&invoice_id, 1001)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::Overpayment { .. })));

        let invoice = erp.invoices().get(&invoice_id).await.unwrap();
        assert_eq!(invoice.paid_cents, 0);
        assert_eq!(invoice.balance_cents, 1000);
        assert!(invoice.payments.is_empty());
        assert_eq!(invoice.header.version, 0);
    }

    #[tokio::test]
    async fn test_unknown_invoice() {
        let (erp, _) = erp_with_catalog().await;
        let err = erp.payments().create(pay("nope", 100)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::DocumentNotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancelled_invoice_rejects_payments() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 1000).await;

        erp.invoices()
            .update(
                &invoice_id,
                InvoiceUpdate {
                    status: Some(InvoiceStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = erp.payments().create(pay(&invoice_id, 100)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InvoiceNotPayable { .. })));
    }

    #[tokio::test]
    async fn test_update_amount_and_status() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 10000).await;
        let receipt = erp.payments().create(pay(&invoice_id, 4000)).await.unwrap();

        let raised = erp
            .payments()
            .update(
                &receipt.payment.id,
                PaymentUpdate {
                    amount_cents: Some(10000),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(raised.invoice.paid_cents, 10000);
        assert_eq!(raised.invoice.status, InvoiceStatus::Paid);

        let err = erp
            .payments()
            .update(
                &receipt.payment.id,
                PaymentUpdate {
                    amount_cents: Some(10001),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::BalanceWouldBeNegative { .. })
        ));

        let failed = erp
            .payments()
            .update(
                &receipt.payment.id,
                PaymentUpdate {
                    status: Some(PaymentStatus::Failed),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(failed.invoice.paid_cents, 0);
        assert_eq!(failed.invoice.balance_cents, 10000);
        assert_eq!(failed.invoice.status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn test_update_to_huge_amount_is_rejected() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 10000).await;
        let first = erp.payments().create(pay(&invoice_id, 4000)).await.unwrap();
        erp.payments().create(pay(&invoice_id, 4000)).await.unwrap();

        let err = erp
            .payments()
            .update(
                &first.payment.id,
                PaymentUpdate {
                    amount_cents: Some(i64::MAX),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::AmountOverflow { .. })));

        let invoice = erp.invoices().get(&invoice_id).await.unwrap();
        assert_eq!(invoice.paid_cents, 8000);
        assert_eq!(invoice.balance_cents, 2000);
        assert_eq!(erp.payments().get(&first.payment.id).await.unwrap().amount_cents, 4000);
    }

    #[tokio::test]
    async fn test_delete_reverses_amount() {
        let (erp, fx) = erp_with_catalog().await;
        let invoice_id = invoice_of(&erp, &fx, 10000).await;
        let a = erp.payments().create(pay(&invoice_id, 6000)).await.unwrap();
        erp.payments().create(pay(&invoice_id, 4000)).await.unwrap();

        let settlement = erp.payments().delete(&a.payment.id).await.unwrap();
        assert_eq!(settlement.paid_cents, 4000);
        assert_eq!(settlement.balance_cents, 6000);
        assert_eq!(settlement.status, InvoiceStatus::Sent);

        let err = erp.payments().get(&a.payment.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::PaymentNotFound(_))));
        assert_eq!(erp.payments().list_for_invoice(&invoice_id).await.unwrap().len(), 1);
    }
}
