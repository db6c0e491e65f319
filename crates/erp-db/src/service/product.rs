//! # Product Service
//!
//! Catalog maintenance. On-hand quantity is set once at creation; after
//! that only the sale lifecycle moves it.

use chrono::Utc;
use tracing::{debug, info};

use super::{Page, ServiceError, ServiceResult};
use crate::error::DbError;
use crate::pool::Database;
use crate::repository::{generate_id, ProductRepository};
use erp_core::validation::{
    validate_name, validate_non_negative_cents, validate_sku, validate_stock_level,
};
use erp_core::{CoreError, NewProduct, Product, ProductUpdate};

pub struct ProductService<'a> {
    db: &'a Database,
}

impl<'a> ProductService<'a> {
    pub fn new(db: &'a Database) -> Self {
        ProductService { db }
    }

    /// Creates a product. A duplicate SKU surfaces as a conflict.
    pub async fn create(&self, req: NewProduct) -> ServiceResult<Product> {
        debug!(sku = %req.sku, "create product");

        validate_sku(&req.sku)?;
        validate_name("name", &req.name)?;
        validate_non_negative_cents("priceCents", req.price_cents)?;
        if let Some(cost) = req.cost_cents {
            validate_non_negative_cents("costCents", cost)?;
        }
        validate_stock_level("quantity", req.quantity)?;
        validate_stock_level("minStock", req.min_stock)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            sku: req.sku.trim().to_string(),
            name: req.name.trim().to_string(),
            description: req.description,
            price_cents: req.price_cents,
            cost_cents: req.cost_cents,
            quantity: req.quantity,
            min_stock: req.min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn).insert(&product).await?;

        info!(id = %product.id, sku = %product.sku, quantity = product.quantity, "Product created");
        Ok(product)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Product> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn)
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    pub async fn get_by_sku(&self, sku: &str) -> ServiceResult<Product> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn)
            .get_by_sku(sku)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(sku.to_string()).into())
    }

    /// Sorted by name. `total` counts active products only.
    pub async fn list(
        &self,
        include_inactive: bool,
        limit: u32,
        offset: u32,
    ) -> ServiceResult<Page<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        let mut repo = ProductRepository::new(&mut conn);
        let items = repo.list(include_inactive, limit, offset).await?;
        let total = repo.count().await?;

        Ok(Page {
            items,
            total,
            limit,
            offset,
        })
    }

    /// Active products at or below their reorder threshold.
    pub async fn low_stock(&self, limit: u32) -> ServiceResult<Vec<Product>> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(ProductRepository::new(&mut conn).list_low_stock(limit).await?)
    }

    pub async fn update(&self, id: &str, req: ProductUpdate) -> ServiceResult<Product> {
        debug!(id = %id, "update product");

        let mut tx = self.db.begin().await?;
        let mut repo = ProductRepository::new(&mut tx);
        let mut product = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()))?;

        if let Some(sku) = req.sku {
            validate_sku(&sku)?;
            product.sku = sku.trim().to_string();
        }
        if let Some(name) = req.name {
            validate_name("name", &name)?;
            product.name = name.trim().to_string();
        }
        if let Some(description) = req.description {
            product.description = Some(description);
        }
        if let Some(price) = req.price_cents {
            validate_non_negative_cents("priceCents", price)?;
            product.price_cents = price;
        }
        if let Some(cost) = req.cost_cents {
            validate_non_negative_cents("costCents", cost)?;
            product.cost_cents = Some(cost);
        }
        if let Some(min_stock) = req.min_stock {
            validate_stock_level("minStock", min_stock)?;
            product.min_stock = min_stock;
        }
        if let Some(active) = req.is_active {
            product.is_active = active;
        }

        let product = repo.update(&product).await?;
        tx.commit().await?;

        info!(id = %product.id, sku = %product.sku, version = product.version, "Product updated");
        Ok(product)
    }

    /// Deactivates the product. Lines already referencing it keep working.
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        let mut conn = self.db.pool().acquire().await?;
        ProductRepository::new(&mut conn)
            .soft_delete(id)
            .await
            .map_err(|e| -> ServiceError {
                match e {
                    DbError::NotFound { .. } => CoreError::ProductNotFound(id.to_string()).into(),
                    other => other.into(),
                }
            })?;

        info!(id = %id, "Product deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests_support::erp_with_catalog;
    use erp_core::ErrorKind;

    fn new_product(sku: &str) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: "Bolt M6".to_string(),
            price_cents: 25,
            quantity: 400,
            min_stock: 50,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let (erp, _) = erp_with_catalog().await;

        let product = erp.products().create(new_product("BOLT-M6")).await.unwrap();
        assert_eq!(erp.products().get_by_sku("BOLT-M6").await.unwrap().id, product.id);

        let err = erp.products().create(new_product("BOLT-M6")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conflict));

        let err = erp.products().get("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (erp, _) = erp_with_catalog().await;

        let mut bad = new_product("BOLT-M8");
        bad.price_cents = -1;
        let err = erp.products().create(bad).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));

        let err = erp.products().create(new_product("")).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
    }

    #[tokio::test]
    async fn test_update_leaves_quantity_alone() {
        let (erp, fx) = erp_with_catalog().await;

        let updated = erp
            .products()
            .update(
                &fx.widget,
                ProductUpdate {
                    price_cents: Some(5500),
                    min_stock: Some(12),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 5500);
        assert_eq!(updated.quantity, 10);
        assert_eq!(updated.version, 1);

        let low = erp.products().low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, fx.widget);
    }

    #[tokio::test]
    async fn test_delete_deactivates() {
        let (erp, fx) = erp_with_catalog().await;

        erp.products().delete(&fx.gadget).await.unwrap();

        let page = erp.products().list(false, 10, 0).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(!erp.products().get(&fx.gadget).await.unwrap().is_active);

        let err = erp.products().delete("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::Core(CoreError::ProductNotFound(_))));
    }
}
