//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD with optimistic locking on `version`
//! - Stock adjustments (sale path only)
//! - Low-stock listing
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Absolute: UPDATE products SET quantity = 7 WHERE id = ?         │
//! │  ✅ Delta:    UPDATE products SET quantity = quantity - 3           │
//! │                                                                     │
//! │  A delta never overwrites a concurrent sale's decrement.            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use erp_core::Product;

const SELECT_PRODUCT: &str = r#"
    SELECT
        id, sku, name, description,
        price_cents, cost_cents,
        quantity, min_stock, is_active,
        created_at, updated_at, version
    FROM products
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let mut conn = db.pool().acquire().await?;
/// let product = ProductRepository::new(&mut conn).get_by_sku("WIDGET-01").await?;
/// ```
pub struct ProductRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ProductRepository<'c> {
    /// Creates a new ProductRepository on a connection or transaction.
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        ProductRepository { conn }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (active or not)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE id = ?1", SELECT_PRODUCT);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&mut self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("{} WHERE sku = ?1", SELECT_PRODUCT);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(product)
    }

    /// Loads every product in `ids` that exists. Missing ids are simply absent
    /// from the result; the caller decides whether that is an error.
    pub async fn get_many(&mut self, ids: &[String]) -> DbResult<Vec<Product>> {
        debug!(count = ids.len(), "Loading products");

        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if products.iter().any(|p: &Product| &p.id == id) {
                continue;
            }
            if let Some(product) = self.get_by_id(id).await? {
                products.push(product);
            }
        }

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&mut self, product: &Product) -> DbResult<()> {
        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description,
                price_cents, cost_cents,
                quantity, min_stock, is_active,
                created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.quantity)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.version)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Writes every editable field of `product` if its version still matches.
    /// Quantity is not written here; see [`Self::adjust_quantity`].
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product (version bumped)
    /// * `Err(DbError::Conflict)` - Someone else updated it first
    pub async fn update(&mut self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, version = product.version, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?3,
                name = ?4,
                description = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                min_stock = ?8,
                is_active = ?9,
                updated_at = ?10,
                version = version + 1
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&product.id)
        .bind(product.version)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(&product.id).await);
        }

        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Adds `delta` to on-hand quantity (negative for sales, positive for
    /// restores).
    pub async fn adjust_quantity(&mut self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = delta, "Adjusting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                quantity = quantity + ?2,
                updated_at = ?3,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Existing line items keep referencing it.
    pub async fn soft_delete(&mut self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                is_active = 0,
                updated_at = ?2,
                version = version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists products sorted by name.
    pub async fn list(
        &mut self,
        include_inactive: bool,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Product>> {
        let sql = format!(
            "{} WHERE (?1 OR is_active = 1) ORDER BY name, sku LIMIT ?2 OFFSET ?3",
            SELECT_PRODUCT
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(include_inactive)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(products)
    }

    /// Active products at or below their reorder threshold, lowest stock first.
    pub async fn list_low_stock(&mut self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "{} WHERE is_active = 1 AND quantity <= min_stock ORDER BY quantity, name LIMIT ?1",
            SELECT_PRODUCT
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(products)
    }

    /// Counts active products.
    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    async fn missing_or_conflict(&mut self, id: &str) -> DbError {
        match self.get_by_id(id).await {
            Ok(Some(_)) => DbError::conflict("Product", id),
            Ok(None) => DbError::not_found("Product", id),
            Err(e) => e,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
