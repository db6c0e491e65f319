//! # Order Service
//!
//! Orders carry lines and totals but no payment state and no stock
//! movement.

use tracing::{debug, info};

use super::documents::{self, apply_changes, insert_document, load_document, prepare_document};
use super::{EngineSettings, Page, ServiceResult};
use crate::pool::Database;
use crate::repository::DocumentRepository;
use erp_core::{DocumentKind, NewOrder, Order, OrderUpdate};

const KIND: DocumentKind = DocumentKind::Order;

pub struct OrderService<'a> {
    db: &'a Database,
    settings: EngineSettings,
}

impl<'a> OrderService<'a> {
    pub fn new(db: &'a Database, settings: EngineSettings) -> Self {
        OrderService { db, settings }
    }

    /// Creates an order with its full line-item set and the next ORD number.
    pub async fn create(&self, req: NewOrder) -> ServiceResult<Order> {
        debug!(customer_id = %req.draft.customer_id, lines = req.draft.items.len(), "create order");
        documents::validate_draft(&req.draft, &self.settings)?;

        let status = req.status.unwrap_or_default();

        let mut tx = self.db.begin().await?;
        let prepared = prepare_document(&mut tx, KIND, &req.draft, status.as_str()).await?;
        let items = insert_document(&mut tx, &prepared).await?;
        tx.commit().await?;

        let order = prepared.record.into_order(items)?;
        info!(
            id = %order.header.id,
            number = %order.header.number,
            total = order.header.total_cents,
            "Order created"
        );
        Ok(order)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Order> {
        let mut conn = self.db.pool().acquire().await?;
        let record = load_document(&mut conn, KIND, id).await?;
        let items = DocumentRepository::new(&mut conn).get_items(&record.id).await?;
        Ok(record.into_order(items)?)
    }

    /// Newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> ServiceResult<Page<Order>> {
        let mut conn = self.db.pool().acquire().await?;
        documents::list_documents(&mut conn, KIND, limit, offset, |record, items| {
            Ok(record.into_order(items)?)
        })
        .await
    }

    /// Applies header edits; replacing `items` recomputes the totals.
    pub async fn update(&self, id: &str, req: OrderUpdate) -> ServiceResult<Order> {
        debug!(id = %id, "update order");

        let mut tx = self.db.begin().await?;
        let mut record = load_document(&mut tx, KIND, id).await?;

        let applied = apply_changes(&mut tx, &mut record, &req.changes, &self.settings).await?;
        if let Some(status) = req.status {
            record.status = status.as_str().to_string();
        }

        let record = DocumentRepository::new(&mut tx).update_header(&record).await?;
        let items = match applied.replaced {
            Some((items, _)) => items,
            None => DocumentRepository::new(&mut tx).get_items(&record.id).await?,
        };
        tx.commit().await?;

        let order = record.into_order(items)?;
        info!(
            id = %order.header.id,
            number = %order.header.number,
            status = %order.status,
            total = order.header.total_cents,
            "Order updated"
        );
        Ok(order)
    }

    /// Deletes the order and its lines.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        let record = load_document(&mut tx, KIND, id).await?;
        DocumentRepository::new(&mut tx).delete(&record).await?;
        tx.commit().await?;

        info!(id = %id, number = %record.number, "Order deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::{erp_with_catalog, line};
    use crate::service::ServiceError;
    use erp_core::{CoreError, DocumentChanges, DocumentDraft, OrderStatus};

    fn draft(customer_id: &str, items: Vec<erp_core::LineItemInput>) -> DocumentDraft {
        DocumentDraft {
            customer_id: customer_id.to_string(),
            user_id: "u1".to_string(),
            items,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sequential_numbers() {
        let (erp, fx) = erp_with_catalog().await;

        for expected in ["ORD-0001", "ORD-0002", "ORD-0003"] {
            let order = erp
                .orders()
                .create(NewOrder {
                    draft: draft(&fx.customer_id, vec![line(&fx.widget, 1, 100)]),
                    status: None,
                })
                .await
                .unwrap();
            assert_eq!(order.header.number, expected);
            assert_eq!(order.status, OrderStatus::Pending);
        }

        let page = erp.orders().list(10, 0).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 3);
    }

    #[tokio::test]
    async fn test_create_computes_totals() {
        let (erp, fx) = erp_with_catalog().await;

        let mut req = draft(
            &fx.customer_id,
            vec![line(&fx.widget, 2, 5000), line(&fx.gadget, 3, 199)],
        );
        req.tax_cents = Some(1000);
        req.discount_cents = Some(500);

        let order = erp
            .orders()
            .create(NewOrder { draft: req, status: None })
            .await
            .unwrap();

        assert_eq!(order.header.subtotal_cents, 10597);
        assert_eq!(order.header.total_cents, 11097);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[1].total_cents, 597);

        let fetched = erp.orders().get(&order.header.id).await.unwrap();
        assert_eq!(fetched.header.number, order.header.number);
        assert_eq!(fetched.header.total_cents, order.header.total_cents);
        assert_eq!(fetched.items.len(), 2);
        assert_eq!(fetched.items[0].sku_snapshot, order.items[0].sku_snapshot);
    }

    #[tokio::test]
    async fn test_unknown_customer_or_product() {
        let (erp, fx) = erp_with_catalog().await;

        let err = erp
            .orders()
            .create(NewOrder {
                draft: draft("ghost", vec![line(&fx.widget, 1, 100)]),
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::CustomerNotFound(_))));

        let err = erp
            .orders()
            .create(NewOrder {
                draft: draft(&fx.customer_id, vec![line("missing", 1, 100)]),
                status: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(_))));

        // failed creates leave no document and burn no number
        let order = erp
            .orders()
            .create(NewOrder {
                draft: draft(&fx.customer_id, vec![line(&fx.widget, 1, 100)]),
                status: None,
            })
            .await
            .unwrap();
        assert_eq!(order.header.number, "ORD-0001");
    }

    #[tokio::test]
    async fn test_negative_total_rejected() {
        let (erp, fx) = erp_with_catalog().await;

        let mut req = draft(&fx.customer_id, vec![line(&fx.widget, 1, 1000)]);
        req.discount_cents = Some(1001);

        let err = erp
            .orders()
            .create(NewOrder { draft: req, status: None })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::NegativeTotal { .. })));
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_keeps_tax() {
        let (erp, fx) = erp_with_catalog().await;

        let mut req = draft(&fx.customer_id, vec![line(&fx.widget, 1, 1000)]);
        req.tax_cents = Some(100);
        let order = erp
            .orders()
            .create(NewOrder { draft: req, status: None })
            .await
            .unwrap();

        let updated = erp
            .orders()
            .update(
                &order.header.id,
                OrderUpdate {
                    changes: DocumentChanges {
                        items: Some(vec![line(&fx.gadget, 4, 250)]),
                        ..Default::default()
                    },
                    status: Some(OrderStatus::Processing),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.header.subtotal_cents, 1000);
        assert_eq!(updated.header.tax_cents, 100);
        assert_eq!(updated.header.total_cents, 1100);
        assert_eq!(updated.status, OrderStatus::Processing);
        assert_eq!(updated.header.version, order.header.version + 1);
        assert_eq!(updated.header.number, order.header.number);
    }

    #[tokio::test]
    async fn test_delete() {
        let (erp, fx) = erp_with_catalog().await;

        let order = erp
            .orders()
            .create(NewOrder {
                draft: draft(&fx.customer_id, vec![line(&fx.widget, 1, 100)]),
                status: None,
            })
            .await
            .unwrap();

        erp.orders().delete(&order.header.id).await.unwrap();

        let err = erp.orders().get(&order.header.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::DocumentNotFound { .. })));
    }
}
