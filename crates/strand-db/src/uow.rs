//! # Unit of Work
//!
//! One store transaction per ledger-affecting operation, passed explicitly
//! to every repository write.
//!
//! ## Lock First, Read Second
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Sale A                           Sale B                                │
//! │  ──────                           ──────                                │
//! │  BEGIN                            BEGIN                                 │
//! │  UPDATE unit_of_work_lock  ✓      UPDATE unit_of_work_lock  … waits    │
//! │  read balance: 500 g                                   (busy_timeout)  │
//! │  OUT 300 g, balance 200 g                                               │
//! │  COMMIT                           ✓ lock acquired                       │
//! │                                   read balance: 200 g                   │
//! │                                   OUT 300 g → InsufficientStock         │
//! │                                   ROLLBACK                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A plain `BEGIN` in SQLite is deferred: two transactions could both read
//! 500 g before either writes. Writing the lock row first takes the
//! RESERVED lock up front, so the availability check and the deduction
//! happen under the same lock.
//!
//! Dropping a unit of work without [`UnitOfWork::commit`] rolls it back.

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, error};

use crate::error::{DbError, DbResult};

/// An open write transaction holding the store's write lock.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
}

impl UnitOfWork {
    /// Begins a transaction and claims the write lock.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        sqlx::query("UPDATE unit_of_work_lock SET claimed_at = ?1 WHERE id = 1")
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        debug!("Unit of work started");
        Ok(UnitOfWork { tx })
    }

    /// Connection of this transaction, for reads that must see its writes.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commits every write of this unit.
    pub async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(|e| {
            error!(error = %e, "Unit of work commit failed");
            DbError::TransactionFailed(e.to_string())
        })?;
        debug!("Unit of work committed");
        Ok(())
    }

    /// Discards every write of this unit.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_dropped_unit_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        {
            let mut uow = db.begin().await.unwrap();
            sqlx::query("INSERT INTO sequences (name, value) VALUES ('probe', 1)")
                .execute(uow.conn())
                .await
                .unwrap();
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sequences WHERE name = 'probe'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_commit_persists() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        sqlx::query("INSERT INTO sequences (name, value) VALUES ('probe', 1)")
            .execute(uow.conn())
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let value: i64 = sqlx::query_scalar("SELECT value FROM sequences WHERE name = 'probe'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(value, 1);
    }
}
