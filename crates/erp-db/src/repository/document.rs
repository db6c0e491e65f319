//! # Document Repository
//!
//! Orders, invoices and sales share the `documents` table and its
//! `line_items`.
//!
//! ## Document Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Document Lifecycle                                │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                           │
//! │     └── insert_header()  → documents row, version 0                    │
//! │     └── insert_items()   → line_items rows, position 0..N              │
//! │                                                                         │
//! │  2. UPDATE (one transaction)                                           │
//! │     └── replace_items()  → delete all lines, insert the new set        │
//! │     └── update_header()  → WHERE id = ? AND version = ?                │
//! │                                                                         │
//! │  3. PAYMENT CHANGE (invoice, same transaction as the payment write)    │
//! │     └── update_invoice_balance() → paid / balance / status             │
//! │                                                                         │
//! │  4. DELETE                                                              │
//! │     └── delete()         → line items go with it (ON DELETE CASCADE)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::generate_id;
use erp_core::line_items::PricedLine;
use erp_core::{
    DocumentHeader, DocumentKind, DocumentTotals, Invoice, InvoiceBalance, InvoiceStatus, LineItem,
    Money, Order, OrderStatus, Payment, PaymentMethod, Sale, SaleStatus,
};

const SELECT_DOCUMENT: &str = r#"
    SELECT
        id, kind, number, customer_id, company_id, user_id, date, status,
        subtotal_cents, tax_cents, discount_cents, total_cents,
        paid_cents, balance_cents, due_date, payment_method,
        notes, created_at, updated_at, version
    FROM documents
"#;

// =============================================================================
// Document Record
// =============================================================================

/// One row of `documents`, before it is turned into an Order, Invoice or Sale.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DocumentRecord {
    pub id: String,
    pub kind: String,
    pub number: String,
    pub customer_id: String,
    pub company_id: Option<String>,
    pub user_id: String,
    pub date: DateTime<Utc>,
    pub status: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub paid_cents: Option<i64>,
    pub balance_cents: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

/// Header fields supplied on creation.
#[derive(Debug, Clone)]
pub struct NewDocument<'a> {
    pub kind: DocumentKind,
    pub number: String,
    pub customer_id: &'a str,
    pub company_id: Option<&'a str>,
    pub user_id: &'a str,
    pub date: DateTime<Utc>,
    pub status: &'static str,
    pub totals: DocumentTotals,
    pub notes: Option<&'a str>,
}

impl DocumentRecord {
    /// Builds a version-0 record. Invoices start with nothing paid.
    pub fn create(new: NewDocument<'_>) -> Self {
        let now = Utc::now();
        let is_invoice = new.kind == DocumentKind::Invoice;

        DocumentRecord {
            id: generate_id(),
            kind: new.kind.as_str().to_string(),
            number: new.number,
            customer_id: new.customer_id.to_string(),
            company_id: new.company_id.map(str::to_string),
            user_id: new.user_id.to_string(),
            date: new.date,
            status: new.status.to_string(),
            subtotal_cents: new.totals.subtotal.cents(),
            tax_cents: new.totals.tax.cents(),
            discount_cents: new.totals.discount.cents(),
            total_cents: new.totals.total.cents(),
            paid_cents: is_invoice.then_some(0),
            balance_cents: is_invoice.then(|| new.totals.total.cents()),
            due_date: None,
            payment_method: None,
            notes: new.notes.map(str::to_string),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn document_kind(&self) -> DbResult<DocumentKind> {
        self.kind
            .parse()
            .map_err(|_| DbError::corrupt("documents.kind", &self.kind))
    }

    pub fn totals(&self) -> DocumentTotals {
        self.header().totals()
    }

    pub fn set_totals(&mut self, totals: &DocumentTotals) {
        self.subtotal_cents = totals.subtotal.cents();
        self.tax_cents = totals.tax.cents();
        self.discount_cents = totals.discount.cents();
        self.total_cents = totals.total.cents();
    }

    /// Settlement state of an invoice row.
    pub fn invoice_balance(&self) -> DbResult<InvoiceBalance> {
        let paid = self
            .paid_cents
            .ok_or_else(|| DbError::corrupt("documents.paid_cents", "NULL"))?;
        let balance = self
            .balance_cents
            .ok_or_else(|| DbError::corrupt("documents.balance_cents", "NULL"))?;

        Ok(InvoiceBalance {
            total: Money::from_cents(self.total_cents),
            paid: Money::from_cents(paid),
            balance: Money::from_cents(balance),
            status: self.parse_status::<InvoiceStatus>()?,
        })
    }

    /// Copies an invoice balance (including total and status) onto the row.
    pub fn set_invoice_balance(&mut self, balance: &InvoiceBalance) {
        self.total_cents = balance.total.cents();
        self.paid_cents = Some(balance.paid.cents());
        self.balance_cents = Some(balance.balance.cents());
        self.status = balance.status.as_str().to_string();
    }

    pub fn header(&self) -> DocumentHeader {
        DocumentHeader {
            id: self.id.clone(),
            number: self.number.clone(),
            customer_id: self.customer_id.clone(),
            company_id: self.company_id.clone(),
            user_id: self.user_id.clone(),
            date: self.date,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }

    pub fn into_order(self, items: Vec<LineItem>) -> DbResult<Order> {
        Ok(Order {
            status: self.parse_status::<OrderStatus>()?,
            header: self.header(),
            items,
        })
    }

    pub fn into_invoice(self, items: Vec<LineItem>, payments: Vec<Payment>) -> DbResult<Invoice> {
        let balance = self.invoice_balance()?;
        Ok(Invoice {
            header: self.header(),
            status: balance.status,
            paid_cents: balance.paid.cents(),
            balance_cents: balance.balance.cents(),
            due_date: self.due_date,
            items,
            payments,
        })
    }

    pub fn into_sale(self, items: Vec<LineItem>) -> DbResult<Sale> {
        Ok(Sale {
            status: self.parse_status::<SaleStatus>()?,
            header: self.header(),
            payment_method: self.payment_method,
            items,
        })
    }

    fn parse_status<S: std::str::FromStr>(&self) -> DbResult<S> {
        self.status
            .parse()
            .map_err(|_| DbError::corrupt("documents.status", &self.status))
    }
}

// =============================================================================
// Repository
// =============================================================================

pub struct DocumentRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> DocumentRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        DocumentRepository { conn }
    }

    /// Gets a document of `kind` by id. A document of another kind with the
    /// same id is treated as not found.
    pub async fn get_by_id(
        &mut self,
        kind: DocumentKind,
        id: &str,
    ) -> DbResult<Option<DocumentRecord>> {
        let sql = format!("{} WHERE id = ?1 AND kind = ?2", SELECT_DOCUMENT);
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(id)
            .bind(kind.as_str())
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(record)
    }

    /// Newest first.
    pub async fn list(
        &mut self,
        kind: DocumentKind,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<DocumentRecord>> {
        let sql = format!(
            "{} WHERE kind = ?1 ORDER BY created_at DESC, number DESC LIMIT ?2 OFFSET ?3",
            SELECT_DOCUMENT
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(kind.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.conn)
            .await?;

        Ok(records)
    }

    pub async fn count(&mut self, kind: DocumentKind) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE kind = ?1")
            .bind(kind.as_str())
            .fetch_one(&mut *self.conn)
            .await?;

        Ok(count)
    }

    pub async fn insert_header(&mut self, record: &DocumentRecord) -> DbResult<()> {
        debug!(id = %record.id, number = %record.number, kind = %record.kind, "Inserting document");

        sqlx::query(
            r#"
            INSERT INTO documents (
                id, kind, number, customer_id, company_id, user_id, date, status,
                subtotal_cents, tax_cents, discount_cents, total_cents,
                paid_cents, balance_cents, due_date, payment_method,
                notes, created_at, updated_at, version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.kind)
        .bind(&record.number)
        .bind(&record.customer_id)
        .bind(&record.company_id)
        .bind(&record.user_id)
        .bind(record.date)
        .bind(&record.status)
        .bind(record.subtotal_cents)
        .bind(record.tax_cents)
        .bind(record.discount_cents)
        .bind(record.total_cents)
        .bind(record.paid_cents)
        .bind(record.balance_cents)
        .bind(record.due_date)
        .bind(record.payment_method)
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.version)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    /// Writes every header column of `record` if its version still matches,
    /// and returns the stored row (version bumped).
    pub async fn update_header(&mut self, record: &DocumentRecord) -> DbResult<DocumentRecord> {
        debug!(id = %record.id, version = record.version, "Updating document header");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE documents SET
                customer_id = ?4,
                company_id = ?5,
                date = ?6,
                status = ?7,
                subtotal_cents = ?8,
                tax_cents = ?9,
                discount_cents = ?10,
                total_cents = ?11,
                paid_cents = ?12,
                balance_cents = ?13,
                due_date = ?14,
                payment_method = ?15,
                notes = ?16,
                updated_at = ?17,
                version = version + 1
            WHERE id = ?1 AND kind = ?2 AND version = ?3
            "#,
        )
        .bind(&record.id)
        .bind(&record.kind)
        .bind(record.version)
        .bind(&record.customer_id)
        .bind(&record.company_id)
        .bind(record.date)
        .bind(&record.status)
        .bind(record.subtotal_cents)
        .bind(record.tax_cents)
        .bind(record.discount_cents)
        .bind(record.total_cents)
        .bind(record.paid_cents)
        .bind(record.balance_cents)
        .bind(record.due_date)
        .bind(record.payment_method)
        .bind(&record.notes)
        .bind(now)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(record).await);
        }

        Ok(DocumentRecord {
            updated_at: now,
            version: record.version + 1,
            ..record.clone()
        })
    }

    /// Stores a recomputed invoice balance. `expected_version` guards against
    /// a concurrent payment on the same invoice.
    pub async fn update_invoice_balance(
        &mut self,
        id: &str,
        expected_version: i64,
        balance: &InvoiceBalance,
    ) -> DbResult<i64> {
        debug!(
            id = %id,
            paid = balance.paid.cents(),
            balance = balance.balance.cents(),
            status = %balance.status,
            "Updating invoice balance"
        );

        let result = sqlx::query(
            r#"
            UPDATE documents SET
                paid_cents = ?3,
                balance_cents = ?4,
                status = ?5,
                updated_at = ?6,
                version = version + 1
            WHERE id = ?1 AND kind = 'invoice' AND version = ?2
            "#,
        )
        .bind(id)
        .bind(expected_version)
        .bind(balance.paid.cents())
        .bind(balance.balance.cents())
        .bind(balance.status.as_str())
        .bind(Utc::now())
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match self.get_by_id(DocumentKind::Invoice, id).await {
                Ok(Some(_)) => DbError::conflict("Invoice", id),
                Ok(None) => DbError::not_found("Invoice", id),
                Err(e) => e,
            });
        }

        Ok(expected_version + 1)
    }

    /// Deletes the header; line items cascade.
    pub async fn delete(&mut self, record: &DocumentRecord) -> DbResult<()> {
        debug!(id = %record.id, number = %record.number, "Deleting document");

        let result =
            sqlx::query("DELETE FROM documents WHERE id = ?1 AND kind = ?2 AND version = ?3")
                .bind(&record.id)
                .bind(&record.kind)
                .bind(record.version)
                .execute(&mut *self.conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_conflict(record).await);
        }

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Line items
    // -------------------------------------------------------------------------

    /// Inserts priced lines in order and returns the stored items.
    pub async fn insert_items(
        &mut self,
        document_id: &str,
        lines: &[PricedLine],
    ) -> DbResult<Vec<LineItem>> {
        debug!(document_id = %document_id, count = lines.len(), "Inserting line items");

        let now = Utc::now();
        let mut items = Vec::with_capacity(lines.len());

        for (position, line) in lines.iter().enumerate() {
            let item = LineItem {
                id: generate_id(),
                document_id: document_id.to_string(),
                product_id: line.product_id.clone(),
                sku_snapshot: line.sku.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price.cents(),
                total_cents: line.total.cents(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO line_items (
                    id, document_id, product_id, sku_snapshot, name_snapshot,
                    quantity, unit_price_cents, total_cents, position, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&item.document_id)
            .bind(&item.product_id)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_cents)
            .bind(position as i64)
            .bind(item.created_at)
            .execute(&mut *self.conn)
            .await?;

            items.push(item);
        }

        Ok(items)
    }

    /// Deletes every line of the document and inserts `lines` in their place.
    pub async fn replace_items(
        &mut self,
        document_id: &str,
        lines: &[PricedLine],
    ) -> DbResult<Vec<LineItem>> {
        let removed = self.delete_items(document_id).await?;
        debug!(document_id = %document_id, removed = removed, "Replacing line items");
        self.insert_items(document_id, lines).await
    }

    pub async fn delete_items(&mut self, document_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM line_items WHERE document_id = ?1")
            .bind(document_id)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn get_items(&mut self, document_id: &str) -> DbResult<Vec<LineItem>> {
        let items = sqlx::query_as::<_, LineItem>(
            r#"
            SELECT
                id, document_id, product_id, sku_snapshot, name_snapshot,
                quantity, unit_price_cents, total_cents, created_at
            FROM line_items
            WHERE document_id = ?1
            ORDER BY position
            "#,
        )
        .bind(document_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(items)
    }

    async fn missing_or_conflict(&mut self, record: &DocumentRecord) -> DbError {
        let kind = match record.document_kind() {
            Ok(kind) => kind,
            Err(e) => return e,
        };
        match self.get_by_id(kind, &record.id).await {
            Ok(Some(_)) => DbError::conflict(kind.to_string(), &record.id),
            Ok(None) => DbError::not_found(kind.to_string(), &record.id),
            Err(e) => e,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CustomerRepository, ProductRepository};
    use crate::testing::{customer_fixture, memory_db, product_fixture};
    use erp_core::line_items::price_lines;
    use erp_core::LineItemInput;

    async fn seed(conn: &mut SqliteConnection) -> (String, erp_core::Product) {
        let customer = customer_fixture("docs@acme.io");
        CustomerRepository::new(&mut *conn).insert(&customer).await.unwrap();
        let product = product_fixture("DOC-A", 5000, 10);
        ProductRepository::new(&mut *conn).insert(&product).await.unwrap();
        (customer.id, product)
    }

    fn new_invoice<'a>(customer_id: &'a str, totals: DocumentTotals) -> NewDocument<'a> {
        NewDocument {
            kind: DocumentKind::Invoice,
            number: "INV-0001".to_string(),
            customer_id,
            company_id: None,
            user_id: "u1",
            date: Utc::now(),
            status: DocumentKind::Invoice.default_status(),
            totals,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_insert_header_and_items_round_trip() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let (customer_id, product) = seed(&mut conn).await;

        let priced = price_lines(&[LineItemInput::new(&product.id, 2, 5000)], |id| {
            (id == product.id).then_some(&product)
        })
        .unwrap();
        let totals = DocumentTotals::compute(priced.subtotal, Some(1000), Some(500)).unwrap();
        let record = DocumentRecord::create(new_invoice(&customer_id, totals));

        let mut repo = DocumentRepository::new(&mut conn);
        repo.insert_header(&record).await.unwrap();
        let items = repo.insert_items(&record.id, &priced.lines).await.unwrap();
        assert_eq!(items.len(), 1);

        let stored = repo
            .get_by_id(DocumentKind::Invoice, &record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.number, record.number);
        assert_eq!(stored.total_cents, record.total_cents);
        assert_eq!(stored.version, 0);
        assert!(repo.get_by_id(DocumentKind::Order, &record.id).await.unwrap().is_none());

        let invoice = stored
            .into_invoice(repo.get_items(&record.id).await.unwrap(), vec![])
            .unwrap();
        assert_eq!(invoice.header.total_cents, 10500);
        assert_eq!(invoice.paid_cents, 0);
        assert_eq!(invoice.balance_cents, 10500);
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.items[0].sku_snapshot, "DOC-A");
        assert_eq!(invoice.items[0].total_cents, 10000);
    }

    #[tokio::test]
    async fn test_update_header_version_check() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let (customer_id, _) = seed(&mut conn).await;

        let totals = DocumentTotals::compute(Money::from_cents(100), None, None).unwrap();
        let record = DocumentRecord::create(new_invoice(&customer_id, totals));
        let mut repo = DocumentRepository::new(&mut conn);
        repo.insert_header(&record).await.unwrap();

        let mut edited = record.clone();
        edited.notes = Some("net 30".to_string());
        let stored = repo.update_header(&edited).await.unwrap();
        assert_eq!(stored.version, 1);

        let err = repo.update_header(&edited).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));

        let balance = stored.invoice_balance().unwrap().apply(Money::from_cents(40)).unwrap();
        let version = repo
            .update_invoice_balance(&stored.id, stored.version, &balance)
            .await
            .unwrap();
        assert_eq!(version, 2);

        let reloaded = repo
            .get_by_id(DocumentKind::Invoice, &stored.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.paid_cents, Some(40));
        assert_eq!(reloaded.balance_cents, Some(60));
        assert_eq!(reloaded.status, "SENT");
    }

    #[tokio::test]
    async fn test_replace_and_delete_cascade() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let (customer_id, product) = seed(&mut conn).await;

        let lines = |qty| {
            price_lines(&[LineItemInput::new(&product.id, qty, 100)], |id| {
                (id == product.id).then_some(&product)
            })
            .unwrap()
        };

        let first = lines(1);
        let totals = DocumentTotals::compute(first.subtotal, None, None).unwrap();
        let record = DocumentRecord::create(new_invoice(&customer_id, totals));
        let mut repo = DocumentRepository::new(&mut conn);
        repo.insert_header(&record).await.unwrap();
        repo.insert_items(&record.id, &first.lines).await.unwrap();

        let replaced = repo.replace_items(&record.id, &lines(4).lines).await.unwrap();
        assert_eq!(replaced.len(), 1);
        let items = repo.get_items(&record.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 4);

        repo.delete(&record).await.unwrap();
        assert!(repo.get_items(&record.id).await.unwrap().is_empty());
        assert_eq!(repo.count(DocumentKind::Invoice).await.unwrap(), 0);
    }
}
