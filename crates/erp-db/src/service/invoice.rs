//! # Invoice Service
//!
//! Invoices add payment state to the shared document header. The stored
//! `paid_cents` always equals the sum of active payments, and
//! `balance_cents = total_cents - paid_cents`.
//!
//! ## Re-totalling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INV-0007  total 105.00  paid 40.00  balance 65.00  SENT                │
//! │                                                                         │
//! │  update { discountCents: 2500 }                                        │
//! │     → total 85.00   paid 40.00  balance 45.00  SENT    ✅              │
//! │                                                                         │
//! │  update { items: [...] }  → total 30.00                                │
//! │     → total 30.00 < paid 40.00                        ❌ rejected      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, info, warn};

use super::documents::{self, apply_changes, insert_document, load_document, prepare_document};
use super::{EngineSettings, Page, ServiceResult};
use crate::pool::Database;
use crate::repository::{DocumentRepository, PaymentRepository};
use erp_core::{CoreError, DocumentKind, Invoice, InvoiceStatus, InvoiceUpdate, Money, NewInvoice};

const KIND: DocumentKind = DocumentKind::Invoice;

pub struct InvoiceService<'a> {
    db: &'a Database,
    settings: EngineSettings,
}

impl<'a> InvoiceService<'a> {
    pub fn new(db: &'a Database, settings: EngineSettings) -> Self {
        InvoiceService { db, settings }
    }

    /// Creates a DRAFT invoice with nothing paid.
    pub async fn create(&self, req: NewInvoice) -> ServiceResult<Invoice> {
        debug!(customer_id = %req.draft.customer_id, lines = req.draft.items.len(), "create invoice");
        documents::validate_draft(&req.draft, &self.settings)?;

        let mut tx = self.db.begin().await?;
        let mut prepared =
            prepare_document(&mut tx, KIND, &req.draft, InvoiceStatus::Draft.as_str()).await?;
        prepared.record.due_date = req.due_date;
        let items = insert_document(&mut tx, &prepared).await?;
        tx.commit().await?;

        let invoice = prepared.record.into_invoice(items, Vec::new())?;
        info!(
            id = %invoice.header.id,
            number = %invoice.header.number,
            total = invoice.header.total_cents,
            "Invoice created"
        );
        Ok(invoice)
    }

    /// The invoice with its lines and payments.
    pub async fn get(&self, id: &str) -> ServiceResult<Invoice> {
        let mut conn = self.db.pool().acquire().await?;
        let record = load_document(&mut conn, KIND, id).await?;
        let items = DocumentRepository::new(&mut conn).get_items(&record.id).await?;
        let payments = PaymentRepository::new(&mut conn)
            .list_for_invoice(&record.id)
            .await?;
        Ok(record.into_invoice(items, payments)?)
    }

    /// Newest first, each with its lines and payments.
    pub async fn list(&self, limit: u32, offset: u32) -> ServiceResult<Page<Invoice>> {
        let mut conn = self.db.pool().acquire().await?;

        let mut repo = DocumentRepository::new(&mut conn);
        let total = repo.count(KIND).await?;
        let records = repo.list(KIND, limit, offset).await?;

        let mut invoices = Vec::with_capacity(records.len());
        for record in records {
            let items = DocumentRepository::new(&mut conn).get_items(&record.id).await?;
            let payments = PaymentRepository::new(&mut conn)
                .list_for_invoice(&record.id)
                .await?;
            invoices.push(record.into_invoice(items, payments)?);
        }

        Ok(Page {
            items: invoices,
            total,
            limit,
            offset,
        })
    }

    /// Applies header edits. A new total keeps the recorded payments, so
    /// `balance = new total - paid`; a total below `paid` is rejected. A
    /// requested status is checked against the amounts.
    pub async fn update(&self, id: &str, req: InvoiceUpdate) -> ServiceResult<Invoice> {
        debug!(id = %id, "update invoice");

        let mut tx = self.db.begin().await?;
        let mut record = load_document(&mut tx, KIND, id).await?;
        let before = record.invoice_balance()?;

        let applied = apply_changes(&mut tx, &mut record, &req.changes, &self.settings).await?;

        let mut balance = before;
        if req.changes.touches_totals() {
            balance = before
                .retotal(Money::from_cents(record.total_cents))
                .inspect_err(|e| warn!(id = %id, error = %e, "Invoice re-total rejected"))?;
        }
        if let Some(status) = req.status {
            balance = balance
                .with_requested_status(status)
                .inspect_err(|e| warn!(id = %id, error = %e, "Invoice status change rejected"))?;
        }
        record.set_invoice_balance(&balance);

        if let Some(due_date) = req.due_date {
            record.due_date = Some(due_date);
        }

        let record = DocumentRepository::new(&mut tx).update_header(&record).await?;
        let items = match applied.replaced {
            Some((items, _)) => items,
            None => DocumentRepository::new(&mut tx).get_items(&record.id).await?,
        };
        let payments = PaymentRepository::new(&mut tx)
            .list_for_invoice(&record.id)
            .await?;
        tx.commit().await?;

        let invoice = record.into_invoice(items, payments)?;
        info!(
            id = %invoice.header.id,
            number = %invoice.header.number,
            total = invoice.header.total_cents,
            paid = invoice.paid_cents,
            balance = invoice.balance_cents,
            status = %invoice.status,
            "Invoice updated"
        );
        Ok(invoice)
    }

    /// Deletes an invoice that has no payments.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        let record = load_document(&mut tx, KIND, id).await?;

        let payments = PaymentRepository::new(&mut tx).count_for_invoice(id).await?;
        if payments > 0 {
            warn!(id = %id, number = %record.number, payments = payments, "Invoice delete rejected");
            return Err(CoreError::HasDependents {
                entity: "Invoice".to_string(),
                id: record.number.clone(),
                dependents: format!("{} payment(s)", payments),
            }
            .into());
        }

        DocumentRepository::new(&mut tx).delete(&record).await?;
        tx.commit().await?;

        info!(id = %id, number = %record.number, "Invoice deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::{erp_with_catalog, line};
    use crate::service::ServiceError;
    use erp_core::{DocumentChanges, DocumentDraft, LineItemInput, NewPayment, PaymentMethod};

    fn new_invoice(customer_id: &str, items: Vec<LineItemInput>, tax: i64, discount: i64) -> NewInvoice {
        NewInvoice {
            draft: DocumentDraft {
                customer_id: customer_id.to_string(),
                user_id: "u1".to_string(),
                items,
                tax_cents: Some(tax),
                discount_cents: Some(discount),
                ..Default::default()
            },
            due_date: None,
        }
    }

    fn payment(invoice_id: &str, amount_cents: i64) -> NewPayment {
        NewPayment {
            invoice_id: invoice_id.to_string(),
            amount_cents,
            method: PaymentMethod::Card,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_opens_balance() {
        let (erp, fx) = erp_with_catalog().await;

        let invoice = erp
            .invoices()
            .create(new_invoice(&fx.customer_id, vec![line(&fx.widget, 2, 5000)], 1000, 500))
            .await
            .unwrap();

        assert_eq!(invoice.header.number, "INV-0001");
        assert_eq!(invoice.header.subtotal_cents, 10000);
        assert_eq!(invoice.header.total_cents, 10500);
        assert_eq!(invoice.paid_cents, 0);
        assert_eq!(invoice.balance_cents, 10500);
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn test_retotal_keeps_payments() {
        let (erp, fx) = erp_with_catalog().await;

        let invoice = erp
            .invoices()
            .create(new_invoice(&fx.customer_id, vec![line(&fx.widget, 2, 5000)], 1000, 500))
            .await
            .unwrap();
        erp.payments()
            .create(payment(&invoice.header.id, 4000))
            .await
            .unwrap();

        let updated = erp
            .invoices()
            .update(
                &invoice.header.id,
                InvoiceUpdate {
                    changes: DocumentChanges {
                        discount_cents: Some(2500),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.header.total_cents, 8500);
        assert_eq!(updated.paid_cents, 4000);
        assert_eq!(updated.balance_cents, 4500);
        assert_eq!(updated.status, InvoiceStatus::Sent);
        assert_eq!(updated.payments.len(), 1);

        let err = erp
            .invoices()
            .update(
                &invoice.header.id,
                InvoiceUpdate {
                    changes: DocumentChanges {
                        items: Some(vec![line(&fx.gadget, 1, 3000)]),
                        tax_cents: Some(0),
                        discount_cents: Some(0),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::BalanceWouldBeNegative { .. })
        ));

        // rejected update left lines and amounts alone
        let reloaded = erp.invoices().get(&invoice.header.id).await.unwrap();
        assert_eq!(reloaded.header.total_cents, 8500);
        assert_eq!(reloaded.items[0].product_id, fx.widget);
    }

    #[tokio::test]
    async fn test_retotal_to_paid_amount_marks_paid() {
        let (erp, fx) = erp_with_catalog().await;

        let invoice = erp
            .invoices()
            .create(new_invoice(&fx.customer_id, vec![line(&fx.widget, 1, 5000)], 0, 0))
            .await
            .unwrap();
        erp.payments()
            .create(payment(&invoice.header.id, 4000))
            .await
            .unwrap();

        let updated = erp
            .invoices()
            .update(
                &invoice.header.id,
                InvoiceUpdate {
                    changes: DocumentChanges {
                        discount_cents: Some(1000),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.balance_cents, 0);
        assert_eq!(updated.status, InvoiceStatus::Paid);
    }

    #[tokio::test]
    async fn test_manual_status_checked() {
        let (erp, fx) = erp_with_catalog().await;

        let invoice = erp
            .invoices()
            .create(new_invoice(&fx.customer_id, vec![line(&fx.widget, 1, 5000)], 0, 0))
            .await
            .unwrap();

        let err = erp
            .invoices()
            .update(
                &invoice.header.id,
                InvoiceUpdate {
                    status: Some(InvoiceStatus::Paid),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InvalidStatusChange { .. })
        ));

        let sent = erp
            .invoices()
            .update(
                &invoice.header.id,
                InvoiceUpdate {
                    status: Some(InvoiceStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
        assert_eq!(sent.balance_cents, 5000);
    }

    #[tokio::test]
    async fn test_delete_with_payments_rejected() {
        let (erp, fx) = erp_with_catalog().await;

        let invoice = erp
            .invoices()
            .create(new_invoice(&fx.customer_id, vec![line(&fx.widget, 1, 5000)], 0, 0))
            .await
            .unwrap();
        let receipt = erp
            .payments()
            .create(payment(&invoice.header.id, 100))
            .await
            .unwrap();

        let err = erp.invoices().delete(&invoice.header.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::HasDependents { .. })));

        erp.payments().delete(&receipt.payment.id).await.unwrap();
        erp.invoices().delete(&invoice.header.id).await.unwrap();
        assert_eq!(erp.invoices().list(10, 0).await.unwrap().total, 0);
    }
}
