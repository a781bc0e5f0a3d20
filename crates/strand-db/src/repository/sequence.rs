//! # Sequence Repository
//!
//! Named monotonic counters (short codes, yearly order numbers).
//!
//! The increment is a single UPSERT ... RETURNING inside the caller's unit
//! of work: two units can never read the same value, and a rolled-back
//! unit gives its value back. Committed values are never handed out twice,
//! even when the SKU that used them is deleted.

use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::uow::UnitOfWork;

/// Counter behind SKU short codes.
pub const SHORT_CODE_SEQUENCE: &str = "sku_short_code";

/// Counter behind order numbers of a given year.
pub fn order_number_sequence(year: i32) -> String {
    format!("order_number:{}", year)
}

/// Increments `name` and returns the new value (first call returns 1).
pub async fn next_value(uow: &mut UnitOfWork, name: &str) -> DbResult<i64> {
    let value: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sequences (name, value) VALUES (?1, 1)
        ON CONFLICT (name) DO UPDATE SET value = value + 1
        RETURNING value
        "#,
    )
    .bind(name)
    .fetch_one(uow.conn())
    .await?;

    debug!(sequence = name, value, "Sequence advanced");
    Ok(value)
}

/// Last value handed out, 0 if never used.
pub async fn current_value(conn: &mut SqliteConnection, name: &str) -> DbResult<i64> {
    let value: Option<i64> = sqlx::query_scalar("SELECT value FROM sequences WHERE name = ?1")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(value.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_sequence_increments() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert_eq!(next_value(&mut uow, SHORT_CODE_SEQUENCE).await.unwrap(), 1);
        assert_eq!(next_value(&mut uow, SHORT_CODE_SEQUENCE).await.unwrap(), 2);
        assert_eq!(next_value(&mut uow, &order_number_sequence(2025)).await.unwrap(), 1);
        uow.commit().await.unwrap();

        let mut conn = db.connection().await.unwrap();
        assert_eq!(current_value(&mut conn, SHORT_CODE_SEQUENCE).await.unwrap(), 2);
        assert_eq!(current_value(&mut conn, "unused").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rolled_back_value_is_reissued() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert_eq!(next_value(&mut uow, SHORT_CODE_SEQUENCE).await.unwrap(), 1);
        uow.rollback().await.unwrap();

        let mut uow = db.begin().await.unwrap();
        assert_eq!(next_value(&mut uow, SHORT_CODE_SEQUENCE).await.unwrap(), 1);
        uow.commit().await.unwrap();
    }
}
