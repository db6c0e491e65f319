//! # Payment Repository
//!
//! Payments belong to one invoice. The invoice's paid amount is kept in
//! step by the payment service, which writes both rows in one transaction.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use erp_core::Payment;

const SELECT_PAYMENT: &str = r#"
    SELECT
        id, invoice_id, amount_cents, payment_date, method, reference,
        status, notes, created_at, updated_at
    FROM payments
"#;

pub struct PaymentRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> PaymentRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        PaymentRepository { conn }
    }

    pub async fn get_by_id(&mut self, id: &str) -> DbResult<Option<Payment>> {
        let sql = format!("{} WHERE id = ?1", SELECT_PAYMENT);
        let payment = sqlx::query_as::<_, Payment>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(payment)
    }

    /// Payments of one invoice in the order they were made.
    pub async fn list_for_invoice(&mut self, invoice_id: &str) -> DbResult<Vec<Payment>> {
        let sql = format!(
            "{} WHERE invoice_id = ?1 ORDER BY payment_date, created_at",
            SELECT_PAYMENT
        );
        let payments = sqlx::query_as::<_, Payment>(&sql)
            .bind(invoice_id)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(payments)
    }

    /// Σ amount over PENDING and COMPLETED payments.
    pub async fn sum_active_for_invoice(&mut self, invoice_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount_cents), 0)
            FROM payments
            WHERE invoice_id = ?1 AND status IN ('PENDING', 'COMPLETED')
            "#,
        )
        .bind(invoice_id)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(sum)
    }

    pub async fn count_for_invoice(&mut self, invoice_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE invoice_id = ?1")
            .bind(invoice_id)
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    pub async fn insert(&mut self, payment: &Payment) -> DbResult<()> {
        debug!(id = %payment.id, invoice_id = %payment.invoice_id, amount = payment.amount_cents, "Inserting payment");

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, invoice_id, amount_cents, payment_date, method, reference,
                status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.invoice_id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(payment.status)
        .bind(&payment.notes)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Writes every editable field and returns the stored payment.
    pub async fn update(&mut self, payment: &Payment) -> DbResult<Payment> {
        debug!(id = %payment.id, "Updating payment");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE payments SET
                amount_cents = ?2,
                payment_date = ?3,
                method = ?4,
                reference = ?5,
                status = ?6,
                notes = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&payment.id)
        .bind(payment.amount_cents)
        .bind(payment.payment_date)
        .bind(payment.method)
        .bind(&payment.reference)
        .bind(payment.status)
        .bind(&payment.notes)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", &payment.id));
        }

        Ok(Payment {
            updated_at: now,
            ..payment.clone()
        })
    }

    pub async fn delete(&mut self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting payment");

        let result = sqlx::query("DELETE FROM payments WHERE id = ?1")
            .bind(id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Payment", id));
        }

        Ok(())
    }
}
