//! # Price Matrix Repository
//!
//! Rows keyed by (category, tier, shade band, length). The matrix is only
//! read when a SKU is created; existing SKUs keep the price they got.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::uow::UnitOfWork;
use strand_core::pricing::PriceKey;
use strand_core::{Category, Money, PriceMatrixEntry, PricePerGram, ShadeBand, Tier};

#[derive(Debug, sqlx::FromRow)]
struct PriceRow {
    category: Category,
    tier: Tier,
    shade_band: String,
    length_cm: i64,
    price_per_gram_czk: i64,
    price_per_gram_eur: i64,
}

impl TryFrom<PriceRow> for PriceMatrixEntry {
    type Error = DbError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        let shade_band: ShadeBand = row
            .shade_band
            .parse()
            .map_err(|e| DbError::corrupt("price_matrix", e))?;
        Ok(PriceMatrixEntry {
            category: row.category,
            tier: row.tier,
            shade_band,
            length_cm: row.length_cm,
            price_per_gram: PricePerGram::new(
                Money::from_minor(row.price_per_gram_czk),
                Money::from_minor(row.price_per_gram_eur),
            ),
        })
    }
}

/// Exact lookup; `None` means the price is unknown.
pub async fn find(conn: &mut SqliteConnection, key: &PriceKey) -> DbResult<Option<PriceMatrixEntry>> {
    let row: Option<PriceRow> = sqlx::query_as(
        r#"
        SELECT category, tier, shade_band, length_cm, price_per_gram_czk, price_per_gram_eur
        FROM price_matrix
        WHERE category = ?1 AND tier = ?2 AND shade_band = ?3 AND length_cm = ?4
        "#,
    )
    .bind(key.category)
    .bind(key.tier)
    .bind(key.shade_band.to_string())
    .bind(key.length_cm)
    .fetch_optional(conn)
    .await?;

    debug!(key = ?key, found = row.is_some(), "Price matrix lookup");
    row.map(PriceMatrixEntry::try_from).transpose()
}

/// All rows, grouped for the admin grid.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<PriceMatrixEntry>> {
    let rows: Vec<PriceRow> = sqlx::query_as(
        r#"
        SELECT category, tier, shade_band, length_cm, price_per_gram_czk, price_per_gram_eur
        FROM price_matrix
        ORDER BY category, tier, shade_band, length_cm
        "#,
    )
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(PriceMatrixEntry::try_from).collect()
}

/// Inserts or replaces the row for the entry's key.
pub async fn upsert(uow: &mut UnitOfWork, entry: &PriceMatrixEntry) -> DbResult<()> {
    info!(
        category = ?entry.category,
        tier = ?entry.tier,
        shade_band = %entry.shade_band,
        length_cm = entry.length_cm,
        czk = entry.price_per_gram.czk.minor(),
        "Upserting price matrix row"
    );

    sqlx::query(
        r#"
        INSERT INTO price_matrix (
            category, tier, shade_band, length_cm, price_per_gram_czk, price_per_gram_eur, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (category, tier, shade_band, length_cm) DO UPDATE SET
            price_per_gram_czk = excluded.price_per_gram_czk,
            price_per_gram_eur = excluded.price_per_gram_eur,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(entry.category)
    .bind(entry.tier)
    .bind(entry.shade_band.to_string())
    .bind(entry.length_cm)
    .bind(entry.price_per_gram.czk.minor())
    .bind(entry.price_per_gram.eur.minor())
    .bind(Utc::now())
    .execute(uow.conn())
    .await?;

    Ok(())
}
