//! # Stock-Take Repository
//!
//! Count sessions and their items. One item per (session, SKU); counting a
//! SKU again replaces the previous count and refreshes its snapshot.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::uow::UnitOfWork;
use strand_core::{StockTake, StockTakeItem, StockTakeStatus};

#[derive(Debug, sqlx::FromRow)]
struct StockTakeRow {
    id: String,
    name: Option<String>,
    status: StockTakeStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl From<StockTakeRow> for StockTake {
    fn from(row: StockTakeRow) -> Self {
        StockTake {
            id: row.id,
            name: row.name,
            status: row.status,
            notes: row.notes,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    stock_take_id: String,
    sku_id: String,
    expected_grams: i64,
    counted_grams: i64,
    location: Option<String>,
    notes: Option<String>,
    counted_at: DateTime<Utc>,
}

impl From<ItemRow> for StockTakeItem {
    fn from(row: ItemRow) -> Self {
        StockTakeItem {
            id: row.id,
            stock_take_id: row.stock_take_id,
            sku_id: row.sku_id,
            expected_grams: row.expected_grams,
            counted_grams: row.counted_grams,
            location: row.location,
            notes: row.notes,
            counted_at: row.counted_at,
        }
    }
}

// =============================================================================
// Sessions
// =============================================================================

pub async fn insert(uow: &mut UnitOfWork, session: &StockTake) -> DbResult<()> {
    debug!(id = %session.id, "Inserting stock-take");

    sqlx::query(
        r#"
        INSERT INTO stock_takes (id, name, status, notes, created_at, started_at, finished_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&session.id)
    .bind(&session.name)
    .bind(session.status)
    .bind(&session.notes)
    .bind(session.created_at)
    .bind(session.started_at)
    .bind(session.finished_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<StockTake>> {
    let row: Option<StockTakeRow> = sqlx::query_as(
        "SELECT id, name, status, notes, created_at, started_at, finished_at FROM stock_takes WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row.map(StockTake::from))
}

/// Most recent sessions first.
pub async fn list(conn: &mut SqliteConnection, limit: u32) -> DbResult<Vec<StockTake>> {
    let rows: Vec<StockTakeRow> = sqlx::query_as(
        r#"
        SELECT id, name, status, notes, created_at, started_at, finished_at
        FROM stock_takes ORDER BY created_at DESC LIMIT ?1
        "#,
    )
    .bind(limit as i64)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(StockTake::from).collect())
}

/// Persists status and timestamps of an already transitioned session.
pub async fn update_status(uow: &mut UnitOfWork, session: &StockTake) -> DbResult<()> {
    debug!(id = %session.id, status = ?session.status, "Updating stock-take status");

    let result = sqlx::query(
        "UPDATE stock_takes SET status = ?2, started_at = ?3, finished_at = ?4 WHERE id = ?1",
    )
    .bind(&session.id)
    .bind(session.status)
    .bind(session.started_at)
    .bind(session.finished_at)
    .execute(uow.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("StockTake", &session.id));
    }
    Ok(())
}

/// Deletes a session and, by cascade, its items.
pub async fn delete(uow: &mut UnitOfWork, id: &str) -> DbResult<()> {
    let result = sqlx::query("DELETE FROM stock_takes WHERE id = ?1")
        .bind(id)
        .execute(uow.conn())
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("StockTake", id));
    }
    Ok(())
}

// =============================================================================
// Items
// =============================================================================

/// Inserts or replaces the count of a SKU within a session.
pub async fn upsert_item(uow: &mut UnitOfWork, item: &StockTakeItem) -> DbResult<()> {
    debug!(
        stock_take_id = %item.stock_take_id,
        sku_id = %item.sku_id,
        expected = item.expected_grams,
        counted = item.counted_grams,
        "Recording count"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_take_items (
            id, stock_take_id, sku_id, expected_grams, counted_grams, location, notes, counted_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT (stock_take_id, sku_id) DO UPDATE SET
            expected_grams = excluded.expected_grams,
            counted_grams = excluded.counted_grams,
            location = excluded.location,
            notes = excluded.notes,
            counted_at = excluded.counted_at
        "#,
    )
    .bind(&item.id)
    .bind(&item.stock_take_id)
    .bind(&item.sku_id)
    .bind(item.expected_grams)
    .bind(item.counted_grams)
    .bind(&item.location)
    .bind(&item.notes)
    .bind(item.counted_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

/// Items of a session in counting order.
pub async fn items(conn: &mut SqliteConnection, stock_take_id: &str) -> DbResult<Vec<StockTakeItem>> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT id, stock_take_id, sku_id, expected_grams, counted_grams, location, notes, counted_at
        FROM stock_take_items WHERE stock_take_id = ?1 ORDER BY counted_at, rowid
        "#,
    )
    .bind(stock_take_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(StockTakeItem::from).collect())
}
