//! # Stock Ledger Repository
//!
//! Append-only storage of stock movements.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_movements                                                        │
//! │                                                                         │
//! │  append ──► INSERT                    UPDATE / DELETE ──► RAISE(ABORT)  │
//! │                                                                         │
//! │  balance(sku) = Σ grams  where direction = increase                     │
//! │               − Σ grams  where direction = decrease                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Movements are never updated or deleted.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::uow::UnitOfWork;
use strand_core::ledger::{BalanceCheck, MovementMetadata, Transition};
use strand_core::{Money, MovementType, StockDirection, StockMovement};

const MOVEMENT_COLUMNS: &str = r#"
    id, sku_id, movement_type, grams, direction, reason, ref_order_id,
    ref_stock_take_id, location, batch_number, cost_per_gram, created_at
"#;

const SIGNED_SUM: &str = "COALESCE(SUM(CASE direction WHEN 'increase' THEN grams ELSE -grams END), 0)";

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    sku_id: String,
    movement_type: MovementType,
    grams: i64,
    direction: StockDirection,
    reason: Option<String>,
    ref_order_id: Option<String>,
    ref_stock_take_id: Option<String>,
    location: Option<String>,
    batch_number: Option<String>,
    cost_per_gram: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            sku_id: row.sku_id,
            movement_type: row.movement_type,
            grams: row.grams,
            direction: row.direction,
            reason: row.reason,
            ref_order_id: row.ref_order_id,
            ref_stock_take_id: row.ref_stock_take_id,
            location: row.location,
            batch_number: row.batch_number,
            cost_per_gram: row.cost_per_gram.map(Money::from_minor),
            created_at: row.created_at,
        }
    }
}

/// Builds the ledger entry for a decided transition.
pub fn movement_for(
    sku_id: &str,
    transition: &Transition,
    metadata: MovementMetadata,
    now: DateTime<Utc>,
) -> StockMovement {
    StockMovement {
        id: uuid::Uuid::new_v4().to_string(),
        sku_id: sku_id.to_string(),
        movement_type: transition.movement_type,
        grams: transition.grams,
        direction: transition.direction,
        reason: metadata.reason,
        ref_order_id: metadata.ref_order_id,
        ref_stock_take_id: metadata.ref_stock_take_id,
        location: metadata.location,
        batch_number: metadata.batch_number,
        cost_per_gram: metadata.cost_per_gram,
        created_at: now,
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Appends one movement.
pub async fn append(uow: &mut UnitOfWork, movement: &StockMovement) -> DbResult<()> {
    debug!(
        id = %movement.id,
        sku_id = %movement.sku_id,
        movement_type = ?movement.movement_type,
        delta = movement.signed_grams(),
        "Appending stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, sku_id, movement_type, grams, direction, reason, ref_order_id,
            ref_stock_take_id, location, batch_number, cost_per_gram, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.sku_id)
    .bind(movement.movement_type)
    .bind(movement.grams)
    .bind(movement.direction)
    .bind(&movement.reason)
    .bind(&movement.ref_order_id)
    .bind(&movement.ref_stock_take_id)
    .bind(&movement.location)
    .bind(&movement.batch_number)
    .bind(movement.cost_per_gram.map(|c| c.minor()))
    .bind(movement.created_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Ledger balance of a SKU and the number of movements behind it.
pub async fn balance(conn: &mut SqliteConnection, sku_id: &str) -> DbResult<(i64, i64)> {
    let (sum, count): (i64, i64) = sqlx::query_as(&format!(
        "SELECT {}, COUNT(*) FROM stock_movements WHERE sku_id = ?1",
        SIGNED_SUM
    ))
    .bind(sku_id)
    .fetch_one(conn)
    .await?;
    Ok((sum, count))
}

/// Movements of a SKU, oldest first.
pub async fn history(conn: &mut SqliteConnection, sku_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
    let rows: Vec<MovementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM stock_movements WHERE sku_id = ?1 ORDER BY created_at, rowid LIMIT ?2",
        MOVEMENT_COLUMNS
    ))
    .bind(sku_id)
    .bind(limit as i64)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(StockMovement::from).collect())
}

/// Movements recorded for an order.
pub async fn for_order(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<StockMovement>> {
    let rows: Vec<MovementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM stock_movements WHERE ref_order_id = ?1 ORDER BY rowid",
        MOVEMENT_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(StockMovement::from).collect())
}

/// Movements recorded by a stock-take completion.
pub async fn for_stock_take(conn: &mut SqliteConnection, stock_take_id: &str) -> DbResult<Vec<StockMovement>> {
    let rows: Vec<MovementRow> = sqlx::query_as(&format!(
        "SELECT {} FROM stock_movements WHERE ref_stock_take_id = ?1 ORDER BY rowid",
        MOVEMENT_COLUMNS
    ))
    .bind(stock_take_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(StockMovement::from).collect())
}

/// Ledger balance next to the cached one, for every SKU.
pub async fn all_balances(conn: &mut SqliteConnection) -> DbResult<Vec<BalanceCheck>> {
    let rows: Vec<(String, String, i64, Option<i64>)> = sqlx::query_as(&format!(
        r#"
        SELECT s.id, s.code,
               (SELECT {} FROM stock_movements WHERE sku_id = s.id),
               CASE s.sale_mode
                   WHEN 'bulk_by_weight' THEN s.available_grams
                   ELSE CASE WHEN s.in_stock = 1 AND s.sold_out = 0 THEN s.weight_total_grams ELSE 0 END
               END
        FROM skus s
        ORDER BY s.code
        "#,
        SIGNED_SUM
    ))
    .fetch_all(conn)
    .await?;

    rows.into_iter()
        .map(|(sku_id, code, ledger_grams, cached)| {
            let cached_grams = cached.ok_or_else(|| DbError::corrupt("skus", format!("no cached balance for {}", sku_id)))?;
            Ok(BalanceCheck {
                sku_id,
                code,
                ledger_grams,
                cached_grams,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sku;
    use crate::repository::sku::tests::bulk_sku;
    use crate::{Database, DbConfig};
    use strand_core::ledger::{apply, MovementKind};

    #[tokio::test]
    async fn test_append_and_balance() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = bulk_sku("X-1", "M0001", 0);

        let mut uow = db.begin().await.unwrap();
        sku::insert(&mut uow, &item).await.unwrap();

        let t_in = apply(&item.code, &item.stock, MovementKind::In { grams: 500 }).unwrap();
        append(&mut uow, &movement_for(&item.id, &t_in, MovementMetadata::reason("delivery"), Utc::now()))
            .await
            .unwrap();
        let t_out = apply(&item.code, &t_in.next, MovementKind::Out { grams: 120 }).unwrap();
        append(&mut uow, &movement_for(&item.id, &t_out, MovementMetadata::default(), Utc::now()))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut conn = db.connection().await.unwrap();
        assert_eq!(balance(&mut conn, &item.id).await.unwrap(), (380, 2));

        let entries = history(&mut conn, &item.id, 100).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].movement_type, MovementType::In);
        assert_eq!(entries[1].signed_grams(), -120);
        assert_eq!(entries[0].reason.as_deref(), Some("delivery"));
    }

    #[tokio::test]
    async fn test_movements_are_append_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = bulk_sku("X-1", "M0001", 0);

        let mut uow = db.begin().await.unwrap();
        sku::insert(&mut uow, &item).await.unwrap();
        let t = apply(&item.code, &item.stock, MovementKind::In { grams: 100 }).unwrap();
        append(&mut uow, &movement_for(&item.id, &t, MovementMetadata::default(), Utc::now()))
            .await
            .unwrap();

        assert!(sqlx::query("UPDATE stock_movements SET grams = 1")
            .execute(uow.conn())
            .await
            .is_err());
        assert!(sqlx::query("DELETE FROM stock_movements")
            .execute(uow.conn())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_balance_of_unknown_sku_is_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.connection().await.unwrap();
        assert_eq!(balance(&mut conn, "nope").await.unwrap(), (0, 0));
    }
}
