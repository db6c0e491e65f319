//! # Sale Service
//!
//! Sales are the only documents that move stock.
//!
//! ## Stock Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create  [{P, 3}]            P.quantity 10 → 7                         │
//! │  update  [{P, 3}] → [{P, 5}] net delta -2   7 → 5                      │
//! │  delete  [{P, 5}]            P.quantity  5 → 10                        │
//! │                                                                         │
//! │  Lines, header and every quantity change commit together.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::documents::{self, apply_changes, insert_document, load_document, prepare_document};
use super::{EngineSettings, Page, ServiceResult};
use crate::pool::Database;
use crate::repository::{DocumentRepository, ProductRepository};
use erp_core::line_items::quantities_by_product;
use erp_core::{DocumentKind, LineItem, NewSale, Product, Sale, SaleUpdate, StockPlan};

const KIND: DocumentKind = DocumentKind::Sale;

pub struct SaleService<'a> {
    db: &'a Database,
    settings: EngineSettings,
}

impl<'a> SaleService<'a> {
    pub fn new(db: &'a Database, settings: EngineSettings) -> Self {
        SaleService { db, settings }
    }

    /// Creates a sale and takes its quantities out of stock.
    pub async fn create(&self, req: NewSale) -> ServiceResult<Sale> {
        debug!(customer_id = %req.draft.customer_id, lines = req.draft.items.len(), "create sale");
        documents::validate_draft(&req.draft, &self.settings)?;

        let status = req.status.unwrap_or_default();

        let mut tx = self.db.begin().await?;
        let mut prepared = prepare_document(&mut tx, KIND, &req.draft, status.as_str()).await?;
        prepared.record.payment_method = req.payment_method;

        let plan = StockPlan::for_sale_created(&prepared.pricing.priced.quantities());
        self.apply_plan(&mut tx, &plan, &prepared.pricing.products)
            .await?;

        let items = insert_document(&mut tx, &prepared).await?;
        tx.commit().await?;

        let sale = prepared.record.into_sale(items)?;
        info!(
            id = %sale.header.id,
            number = %sale.header.number,
            total = sale.header.total_cents,
            movements = plan.movements().len(),
            "Sale created"
        );
        Ok(sale)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Sale> {
        let mut conn = self.db.pool().acquire().await?;
        let record = load_document(&mut conn, KIND, id).await?;
        let items = DocumentRepository::new(&mut conn).get_items(&record.id).await?;
        Ok(record.into_sale(items)?)
    }

    /// Newest first.
    pub async fn list(&self, limit: u32, offset: u32) -> ServiceResult<Page<Sale>> {
        let mut conn = self.db.pool().acquire().await?;
        documents::list_documents(&mut conn, KIND, limit, offset, |record, items| {
            Ok(record.into_sale(items)?)
        })
        .await
    }

    /// Applies header edits. Replacing `items` restores the old quantities
    /// and takes the new ones, netted per product.
    pub async fn update(&self, id: &str, req: SaleUpdate) -> ServiceResult<Sale> {
        debug!(id = %id, "update sale");

        let mut tx = self.db.begin().await?;
        let mut record = load_document(&mut tx, KIND, id).await?;
        let old_items = DocumentRepository::new(&mut tx).get_items(&record.id).await?;

        let applied = apply_changes(&mut tx, &mut record, &req.changes, &self.settings).await?;
        if let Some(status) = req.status {
            record.status = status.as_str().to_string();
        }
        if let Some(method) = req.payment_method {
            record.payment_method = Some(method);
        }

        let items = match applied.replaced {
            Some((new_items, pricing)) => {
                let plan = StockPlan::for_sale_replaced(
                    &line_quantities(&old_items),
                    &pricing.priced.quantities(),
                );
                self.apply_plan(&mut tx, &plan, &pricing.products).await?;
                new_items
            }
            None => old_items,
        };

        let record = DocumentRepository::new(&mut tx).update_header(&record).await?;
        tx.commit().await?;

        let sale = record.into_sale(items)?;
        info!(
            id = %sale.header.id,
            number = %sale.header.number,
            status = %sale.status,
            total = sale.header.total_cents,
            "Sale updated"
        );
        Ok(sale)
    }

    /// Puts every line back in stock, then deletes the sale.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;
        let record = load_document(&mut tx, KIND, id).await?;
        let items = DocumentRepository::new(&mut tx).get_items(&record.id).await?;

        let plan = StockPlan::for_sale_deleted(&line_quantities(&items));
        self.apply_plan(&mut tx, &plan, &[]).await?;

        DocumentRepository::new(&mut tx).delete(&record).await?;
        tx.commit().await?;

        info!(id = %id, number = %record.number, restored = plan.movements().len(), "Sale deleted");
        Ok(())
    }

    /// Checks the plan against the configured stock policy, then issues one
    /// quantity update per product.
    async fn apply_plan(
        &self,
        conn: &mut SqliteConnection,
        plan: &StockPlan,
        products: &[Product],
    ) -> ServiceResult<()> {
        plan.check_availability(self.settings.stock_policy, |id| {
            products.iter().find(|p| p.id == id)
        })
        .inspect_err(|e| warn!(error = %e, "Sale rejected"))?;

        let mut repo = ProductRepository::new(conn);
        for movement in plan.movements() {
            repo.adjust_quantity(&movement.product_id, movement.delta).await?;
        }
        Ok(())
    }
}

fn line_quantities(items: &[LineItem]) -> Vec<(String, i64)> {
    quantities_by_product(items.iter().map(|i| (i.product_id.as_str(), i.quantity)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::{erp_with_catalog, erp_with_policy, line, Catalog};
    use crate::service::{Erp, ServiceError};
    use erp_core::{CoreError, DocumentChanges, DocumentDraft, LineItemInput, StockPolicy};

    fn new_sale(fx: &Catalog, items: Vec<LineItemInput>) -> NewSale {
        NewSale {
            draft: DocumentDraft {
                customer_id: fx.customer_id.clone(),
                user_id: "u1".to_string(),
                items,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    async fn on_hand(erp: &Erp, product_id: &str) -> i64 {
        erp.products().get(product_id).await.unwrap().quantity
    }

    #[tokio::test]
    async fn test_create_and_delete_move_stock() {
        let (erp, fx) = erp_with_catalog().await;

        let sale = erp
            .sales()
            .create(new_sale(&fx, vec![line(&fx.widget, 3, 5000)]))
            .await
            .unwrap();
        assert_eq!(sale.header.number, "SAL-0001");
        assert_eq!(on_hand(&erp, &fx.widget).await, 7);

        erp.sales().delete(&sale.header.id).await.unwrap();
        assert_eq!(on_hand(&erp, &fx.widget).await, 10);
    }

    #[tokio::test]
    async fn test_update_nets_stock_per_product() {
        let (erp, fx) = erp_with_catalog().await;

        let sale = erp
            .sales()
            .create(new_sale(&fx, vec![line(&fx.widget, 3, 5000)]))
            .await
            .unwrap();

        erp.sales()
            .update(
                &sale.header.id,
                SaleUpdate {
                    changes: DocumentChanges {
                        items: Some(vec![line(&fx.widget, 5, 5000), line(&fx.gadget, 2, 199)]),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(on_hand(&erp, &fx.widget).await, 5);
        assert_eq!(on_hand(&erp, &fx.gadget).await, 3);
    }

    #[tokio::test]
    async fn test_negative_stock_allowed_by_default() {
        let (erp, fx) = erp_with_catalog().await;

        erp.sales()
            .create(new_sale(&fx, vec![line(&fx.gadget, 8, 199)]))
            .await
            .unwrap();
        assert_eq!(on_hand(&erp, &fx.gadget).await, -3);
    }

    #[tokio::test]
    async fn test_reject_negative_policy_rolls_back() {
        let (erp, fx) = erp_with_policy(StockPolicy::RejectNegative).await;

        let err = erp
            .sales()
            .create(new_sale(
                &fx,
                vec![line(&fx.widget, 1, 5000), line(&fx.gadget, 8, 199)],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InsufficientStock { .. })));

        assert_eq!(on_hand(&erp, &fx.widget).await, 10);
        assert_eq!(on_hand(&erp, &fx.gadget).await, 5);
        assert_eq!(erp.sales().list(10, 0).await.unwrap().total, 0);
    }

    fn replace_items(items: Vec<LineItemInput>) -> SaleUpdate {
        SaleUpdate {
            changes: DocumentChanges {
                items: Some(items),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_reject_negative_update_within_stock() {
        let (erp, fx) = erp_with_policy(StockPolicy::RejectNegative).await;

        let sale = erp
            .sales()
            .create(new_sale(&fx, vec![line(&fx.widget, 3, 5000)]))
            .await
            .unwrap();
        assert_eq!(on_hand(&erp, &fx.widget).await, 7);

        // old lines are restored before the new ones are taken
        let updated = erp
            .sales()
            .update(&sale.header.id, replace_items(vec![line(&fx.widget, 10, 5000)]))
            .await
            .unwrap();
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].quantity, 10);
        assert_eq!(on_hand(&erp, &fx.widget).await, 0);
    }

    #[tokio::test]
    async fn test_reject_negative_update_rolls_back() {
        let (erp, fx) = erp_with_policy(StockPolicy::RejectNegative).await;

        let sale = erp
            .sales()
            .create(new_sale(&fx, vec![line(&fx.widget, 3, 5000)]))
            .await
            .unwrap();

        let err = erp
            .sales()
            .update(
                &sale.header.id,
                replace_items(vec![line(&fx.widget, 11, 5000), line(&fx.gadget, 1, 199)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::InsufficientStock { .. })));

        let stored = erp.sales().get(&sale.header.id).await.unwrap();
        assert_eq!(stored.header.version, sale.header.version);
        assert_eq!(stored.header.total_cents, sale.header.total_cents);
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].product_id, fx.widget);
        assert_eq!(stored.items[0].quantity, 3);
        assert_eq!(on_hand(&erp, &fx.widget).await, 7);
        assert_eq!(on_hand(&erp, &fx.gadget).await, 5);
    }

    #[tokio::test]
    async fn test_update_then_delete_restores_stock() {
        let (erp, fx) = erp_with_catalog().await;

        let sale = erp
            .sales()
            .create(new_sale(&fx, vec![line(&fx.widget, 3, 5000)]))
            .await
            .unwrap();
        erp.sales()
            .update(
                &sale.header.id,
                replace_items(vec![line(&fx.widget, 5, 5000), line(&fx.gadget, 2, 199)]),
            )
            .await
            .unwrap();
        assert_eq!(on_hand(&erp, &fx.widget).await, 5);
        assert_eq!(on_hand(&erp, &fx.gadget).await, 3);

        erp.sales().delete(&sale.header.id).await.unwrap();
        assert_eq!(on_hand(&erp, &fx.widget).await, 10);
        assert_eq!(on_hand(&erp, &fx.gadget).await, 5);
    }
}
