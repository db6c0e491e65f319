//! # Sequence Repository
//!
//! One counter row per document kind.
//!
//! ```text
//! INSERT INTO document_sequences (kind, last_value) VALUES ('order', 1)
//! ON CONFLICT (kind) DO UPDATE SET last_value = last_value + 1
//! RETURNING last_value
//! ```
//!
//! The increment runs inside the transaction that inserts the document. If
//! that transaction rolls back, so does the counter, and the number is
//! reused by the next document.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use erp_core::DocumentKind;

pub struct SequenceRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SequenceRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        SequenceRepository { conn }
    }

    /// Increments and returns the counter for `kind` (first value is 1).
    pub async fn next_value(&mut self, kind: DocumentKind) -> DbResult<i64> {
        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_sequences (kind, last_value) VALUES (?1, 1)
            ON CONFLICT (kind) DO UPDATE SET last_value = last_value + 1
            RETURNING last_value
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(&mut *self.conn)
        .await?;

        debug!(kind = %kind, value = value, "Allocated sequence value");
        Ok(value)
    }

    /// Last value handed out for `kind` (0 when none yet).
    pub async fn current_value(&mut self, kind: DocumentKind) -> DbResult<i64> {
        let value: Option<i64> =
            sqlx::query_scalar("SELECT last_value FROM document_sequences WHERE kind = ?1")
                .bind(kind.as_str())
                .fetch_optional(&mut *self.conn)
                .await?;

        Ok(value.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::memory_db;

    #[tokio::test]
    async fn test_counters_are_per_kind() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let mut repo = SequenceRepository::new(&mut conn);

        assert_eq!(repo.current_value(DocumentKind::Order).await.unwrap(), 0);
        assert_eq!(repo.next_value(DocumentKind::Order).await.unwrap(), 1);
        assert_eq!(repo.next_value(DocumentKind::Order).await.unwrap(), 2);
        assert_eq!(repo.next_value(DocumentKind::Invoice).await.unwrap(), 1);
        assert_eq!(repo.current_value(DocumentKind::Order).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_rolled_back_increment_is_reused() {
        let db = memory_db().await;

        {
            let mut tx = db.begin().await.unwrap();
            assert_eq!(
                SequenceRepository::new(&mut tx)
                    .next_value(DocumentKind::Sale)
                    .await
                    .unwrap(),
                1
            );
            // dropped without commit
        }

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(
            SequenceRepository::new(&mut conn)
                .next_value(DocumentKind::Sale)
                .await
                .unwrap(),
            1
        );
    }
}
