//! # Customer Repository
//!
//! Documents reference customers by id; email is unique.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use erp_core::Customer;

const SELECT_CUSTOMER: &str = r#"
    SELECT id, name, email, phone, address, company_id, created_at, updated_at
    FROM customers
"#;

pub struct CustomerRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CustomerRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        CustomerRepository { conn }
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Customer>> {
        let sql = format!("{} WHERE id = ?1", SELECT_CUSTOMER);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(customer)
    }

    pub async fn get_by_email(&mut self, email: &str) -> DbResult<Option<Customer>> {
        let sql = format!("{} WHERE email = ?1", SELECT_CUSTOMER);
        let customer = sqlx::query_as::<_, Customer>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(customer)
    }

    pub async fn exists(&mut self, id: &str) -> DbResult<bool> {
        let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE id = ?1")
            .bind(id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(found > 0)
    }

    /// Inserts a customer.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - email already registered
    pub async fn insert(&mut self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone, address, company_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.company_id)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&mut *self.conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: customer.email.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    pub async fn list(&mut self, limit: u32, offset: u32) -> DbResult<Vec<Customer>> {
        let sql = format!("{} ORDER BY name, email LIMIT ?1 OFFSET ?2", SELECT_CUSTOMER);
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(customers)
    }

    pub async fn count(&mut self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }
}
