//! # SKU Repository
//!
//! Database operations for the SKU registry and its cached stock projection.
//!
//! ## Stock Columns
//! ```text
//! ┌────────────────────┬──────────────────────┬──────────────────────┐
//! │ column             │ BULK_BY_WEIGHT       │ PIECE_BY_WEIGHT      │
//! ├────────────────────┼──────────────────────┼──────────────────────┤
//! │ available_grams    │ balance              │ NULL                 │
//! │ min_order_grams    │ minimum order        │ NULL                 │
//! │ step_grams         │ order increment      │ NULL                 │
//! │ weight_total_grams │ NULL                 │ piece weight         │
//! │ in_stock           │ NULL                 │ 0 / 1                │
//! │ sold_out           │ NULL                 │ 0 / 1                │
//! └────────────────────┴──────────────────────┴──────────────────────┘
//! ```
//! A CHECK constraint enforces the split; [`update_stock`] is only called
//! next to a ledger append.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::uow::UnitOfWork;
use strand_core::{
    Category, Money, PricePerGram, PriceSource, SaleMode, Shade, ShadeBand, Sku, StockState, Structure, Tier,
};

const SKU_COLUMNS: &str = r#"
    id, code, short_code, name, category, tier, shade, shade_band, structure,
    length_cm, premium_sourcing, sale_mode, price_per_gram_czk, price_per_gram_eur,
    price_source, available_grams, min_order_grams, step_grams, weight_total_grams,
    in_stock, sold_out, is_listed, listing_priority, created_at, updated_at
"#;

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SkuRow {
    id: String,
    code: String,
    short_code: String,
    name: String,
    category: Category,
    tier: Tier,
    shade: i64,
    shade_band: String,
    structure: Structure,
    length_cm: i64,
    premium_sourcing: bool,
    sale_mode: SaleMode,
    price_per_gram_czk: i64,
    price_per_gram_eur: i64,
    price_source: PriceSource,
    available_grams: Option<i64>,
    min_order_grams: Option<i64>,
    step_grams: Option<i64>,
    weight_total_grams: Option<i64>,
    in_stock: Option<bool>,
    sold_out: Option<bool>,
    is_listed: bool,
    listing_priority: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SkuRow> for Sku {
    type Error = DbError;

    fn try_from(row: SkuRow) -> Result<Self, Self::Error> {
        let missing = |column: &str| DbError::corrupt("skus", format!("{} is NULL for {}", column, row.id));

        let stock = match row.sale_mode {
            SaleMode::BulkByWeight => StockState::Bulk {
                available_grams: row.available_grams.ok_or_else(|| missing("available_grams"))?,
                min_order_grams: row.min_order_grams.ok_or_else(|| missing("min_order_grams"))?,
                step_grams: row.step_grams.ok_or_else(|| missing("step_grams"))?,
            },
            SaleMode::PieceByWeight => StockState::Piece {
                weight_total_grams: row.weight_total_grams.ok_or_else(|| missing("weight_total_grams"))?,
                in_stock: row.in_stock.ok_or_else(|| missing("in_stock"))?,
                sold_out: row.sold_out.ok_or_else(|| missing("sold_out"))?,
            },
        };

        let shade = Shade::new(row.shade).map_err(|e| DbError::corrupt("skus", e))?;
        let shade_band: ShadeBand = row.shade_band.parse().map_err(|e| DbError::corrupt("skus", e))?;

        Ok(Sku {
            id: row.id,
            code: row.code,
            short_code: row.short_code,
            name: row.name,
            category: row.category,
            tier: row.tier,
            shade,
            shade_band,
            structure: row.structure,
            length_cm: row.length_cm,
            premium_sourcing: row.premium_sourcing,
            price_per_gram: PricePerGram::new(
                Money::from_minor(row.price_per_gram_czk),
                Money::from_minor(row.price_per_gram_eur),
            ),
            price_source: row.price_source,
            stock,
            is_listed: row.is_listed,
            listing_priority: row.listing_priority,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Nullable stock columns for a projection.
struct StockColumns {
    available_grams: Option<i64>,
    min_order_grams: Option<i64>,
    step_grams: Option<i64>,
    weight_total_grams: Option<i64>,
    in_stock: Option<bool>,
    sold_out: Option<bool>,
}

impl From<&StockState> for StockColumns {
    fn from(state: &StockState) -> Self {
        match *state {
            StockState::Bulk {
                available_grams,
                min_order_grams,
                step_grams,
            } => StockColumns {
                available_grams: Some(available_grams),
                min_order_grams: Some(min_order_grams),
                step_grams: Some(step_grams),
                weight_total_grams: None,
                in_stock: None,
                sold_out: None,
            },
            StockState::Piece {
                weight_total_grams,
                in_stock,
                sold_out,
            } => StockColumns {
                available_grams: None,
                min_order_grams: None,
                step_grams: None,
                weight_total_grams: Some(weight_total_grams),
                in_stock: Some(in_stock),
                sold_out: Some(sold_out),
            },
        }
    }
}

// =============================================================================
// Reads
// =============================================================================

/// Gets a SKU by ID.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sku>> {
    let row: Option<SkuRow> = sqlx::query_as(&format!("SELECT {} FROM skus WHERE id = ?1", SKU_COLUMNS))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.map(Sku::try_from).transpose()
}

/// Gets a SKU by ID or fails with `SkuNotFound`.
pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Sku> {
    find(conn, id)
        .await?
        .ok_or_else(|| strand_core::CoreError::SkuNotFound(id.to_string()).into())
}

/// Gets a SKU by its unique code.
pub async fn find_by_code(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Sku>> {
    let row: Option<SkuRow> = sqlx::query_as(&format!("SELECT {} FROM skus WHERE code = ?1", SKU_COLUMNS))
        .bind(code)
        .fetch_optional(conn)
        .await?;

    row.map(Sku::try_from).transpose()
}

/// Loads every SKU in `ids` with one query. Missing ids are simply absent.
pub async fn find_many(conn: &mut SqliteConnection, ids: &[String]) -> DbResult<Vec<Sku>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {} FROM skus WHERE id IN (", SKU_COLUMNS));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let rows: Vec<SkuRow> = query.build_query_as().fetch_all(conn).await?;
    debug!(requested = ids.len(), found = rows.len(), "Loaded SKUs");

    rows.into_iter().map(Sku::try_from).collect()
}

/// Lists SKUs, listed ones by priority first.
pub async fn list(conn: &mut SqliteConnection, listed_only: bool, limit: u32) -> DbResult<Vec<Sku>> {
    let rows: Vec<SkuRow> = sqlx::query_as(&format!(
        r#"
        SELECT {} FROM skus
        WHERE (?1 = 0 OR is_listed = 1)
        ORDER BY is_listed DESC, listing_priority DESC, code
        LIMIT ?2
        "#,
        SKU_COLUMNS
    ))
    .bind(listed_only)
    .bind(limit as i64)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(Sku::try_from).collect()
}

/// Codes starting with `prefix` (BULK per-day sequence hint).
pub async fn codes_with_prefix(conn: &mut SqliteConnection, prefix: &str) -> DbResult<Vec<String>> {
    let codes: Vec<String> =
        sqlx::query_scalar("SELECT code FROM skus WHERE substr(code, 1, length(?1)) = ?1 ORDER BY code")
            .bind(prefix)
            .fetch_all(conn)
            .await?;
    Ok(codes)
}

/// True if anything in the ledger, orders or stock-takes references the SKU.
pub async fn has_history(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let referenced: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM stock_movements WHERE sku_id = ?1)
            OR EXISTS (SELECT 1 FROM order_items WHERE sku_id = ?1)
            OR EXISTS (SELECT 1 FROM stock_take_items WHERE sku_id = ?1)
        "#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;
    Ok(referenced)
}

// =============================================================================
// Writes
// =============================================================================

/// Inserts a SKU.
///
/// A taken code surfaces as `UniqueViolation { field: "skus.code" }`; the
/// catalog service retries with the next suffix.
pub async fn insert(uow: &mut UnitOfWork, sku: &Sku) -> DbResult<()> {
    debug!(id = %sku.id, code = %sku.code, short_code = %sku.short_code, "Inserting SKU");

    let stock = StockColumns::from(&sku.stock);
    sqlx::query(
        r#"
        INSERT INTO skus (
            id, code, short_code, name, category, tier, shade, shade_band, structure,
            length_cm, premium_sourcing, sale_mode, price_per_gram_czk, price_per_gram_eur,
            price_source, available_grams, min_order_grams, step_grams, weight_total_grams,
            in_stock, sold_out, is_listed, listing_priority, created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19,
            ?20, ?21, ?22, ?23, ?24, ?25
        )
        "#,
    )
    .bind(&sku.id)
    .bind(&sku.code)
    .bind(&sku.short_code)
    .bind(&sku.name)
    .bind(sku.category)
    .bind(sku.tier)
    .bind(i64::from(sku.shade))
    .bind(sku.shade_band.to_string())
    .bind(sku.structure)
    .bind(sku.length_cm)
    .bind(sku.premium_sourcing)
    .bind(sku.sale_mode())
    .bind(sku.price_per_gram.czk.minor())
    .bind(sku.price_per_gram.eur.minor())
    .bind(sku.price_source)
    .bind(stock.available_grams)
    .bind(stock.min_order_grams)
    .bind(stock.step_grams)
    .bind(stock.weight_total_grams)
    .bind(stock.in_stock)
    .bind(stock.sold_out)
    .bind(sku.is_listed)
    .bind(sku.listing_priority)
    .bind(sku.created_at)
    .bind(sku.updated_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

/// Rewrites the cached projection. Call only alongside a ledger append or rebuild.
pub async fn update_stock(uow: &mut UnitOfWork, id: &str, state: &StockState, now: DateTime<Utc>) -> DbResult<()> {
    debug!(id = %id, balance = state.balance_grams(), "Updating stock projection");

    let stock = StockColumns::from(state);
    let result = sqlx::query(
        r#"
        UPDATE skus
        SET available_grams = ?2,
            min_order_grams = ?3,
            step_grams = ?4,
            weight_total_grams = ?5,
            in_stock = ?6,
            sold_out = ?7,
            updated_at = ?8
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(stock.available_grams)
    .bind(stock.min_order_grams)
    .bind(stock.step_grams)
    .bind(stock.weight_total_grams)
    .bind(stock.in_stock)
    .bind(stock.sold_out)
    .bind(now)
    .execute(uow.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sku", id));
    }
    Ok(())
}

/// Replaces the per-gram price.
pub async fn update_price(
    uow: &mut UnitOfWork,
    id: &str,
    price: PricePerGram,
    source: PriceSource,
    now: DateTime<Utc>,
) -> DbResult<()> {
    debug!(id = %id, czk = price.czk.minor(), eur = price.eur.minor(), "Updating price");

    let result = sqlx::query(
        r#"
        UPDATE skus
        SET price_per_gram_czk = ?2, price_per_gram_eur = ?3, price_source = ?4, updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(price.czk.minor())
    .bind(price.eur.minor())
    .bind(source)
    .bind(now)
    .execute(uow.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sku", id));
    }
    Ok(())
}

/// Sets listing visibility and priority.
pub async fn update_listing(
    uow: &mut UnitOfWork,
    id: &str,
    is_listed: bool,
    listing_priority: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE skus SET is_listed = ?2, listing_priority = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(is_listed)
    .bind(listing_priority)
    .bind(now)
    .execute(uow.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sku", id));
    }
    Ok(())
}

/// Hard-deletes a SKU. The short-code counter is untouched.
pub async fn delete(uow: &mut UnitOfWork, id: &str) -> DbResult<()> {
    debug!(id = %id, "Deleting SKU");

    let result = sqlx::query("DELETE FROM skus WHERE id = ?1")
        .bind(id)
        .execute(uow.conn())
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sku", id));
    }
    Ok(())
}

/// Generates a new SKU ID.
pub fn generate_sku_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    /// BULK SKU fixture: undyed standard shade 3, 5 Kč / 0.20 € per gram.
    pub(crate) fn bulk_sku(code: &str, short_code: &str, available_grams: i64) -> Sku {
        let now = Utc::now();
        Sku {
            id: generate_sku_id(),
            code: code.to_string(),
            short_code: short_code.to_string(),
            name: "Standard straight 20 cm, shade 3".to_string(),
            category: Category::Undyed,
            tier: Tier::Standard,
            shade: Shade::new(3).unwrap(),
            shade_band: ShadeBand::new(1, 4),
            structure: Structure::Straight,
            length_cm: 20,
            premium_sourcing: false,
            price_per_gram: PricePerGram::new(Money::from_minor(500), Money::from_minor(20)),
            price_source: PriceSource::Matrix,
            stock: StockState::Bulk {
                available_grams,
                min_order_grams: 50,
                step_grams: 10,
            },
            is_listed: true,
            listing_priority: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sku = bulk_sku("X-NB-STD-O03-SR-20250101-01", "M0001", 0);

        let mut uow = db.begin().await.unwrap();
        insert(&mut uow, &sku).await.unwrap();
        uow.commit().await.unwrap();

        let mut conn = db.connection().await.unwrap();
        let found = find(&mut conn, &sku.id).await.unwrap().unwrap();
        assert_eq!(found.code, sku.code);
        assert_eq!(found.stock, sku.stock);
        assert_eq!(found.shade_band, ShadeBand::new(1, 4));

        let by_code = find_by_code(&mut conn, "X-NB-STD-O03-SR-20250101-01").await.unwrap();
        assert_eq!(by_code.map(|s| s.id), Some(sku.id.clone()));

        assert!(find(&mut conn, "missing").await.unwrap().is_none());
        assert!(matches!(
            get(&mut conn, "missing").await,
            Err(DbError::Domain(strand_core::CoreError::SkuNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_code_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        insert(&mut uow, &bulk_sku("DUP", "M0001", 0)).await.unwrap();
        let err = insert(&mut uow, &bulk_sku("DUP", "M0002", 0)).await.unwrap_err();
        assert!(err.is_unique_violation_on("skus.code"), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_find_many_and_codes_with_prefix() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = bulk_sku("X-NB-STD-O03-SR-20-20250101-01", "M0001", 0);
        let b = bulk_sku("X-NB-STD-O03-SR-20-20250101-02", "M0002", 0);
        let c = bulk_sku("X-NB-STD-O03-SR-20-20250102-01", "M0003", 0);

        let mut uow = db.begin().await.unwrap();
        for sku in [&a, &b, &c] {
            insert(&mut uow, sku).await.unwrap();
        }
        uow.commit().await.unwrap();

        let mut conn = db.connection().await.unwrap();
        let found = find_many(&mut conn, &[a.id.clone(), c.id.clone(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);

        assert_eq!(
            codes_with_prefix(&mut conn, "X-NB-STD-O03-SR-20-20250101-").await.unwrap(),
            vec![a.code.clone(), b.code.clone()]
        );
        assert!(find_many(&mut conn, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_mode_cannot_change() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sku = bulk_sku("X-1", "M0001", 0);

        let mut uow = db.begin().await.unwrap();
        insert(&mut uow, &sku).await.unwrap();
        let result = sqlx::query("UPDATE skus SET sale_mode = 'piece_by_weight' WHERE id = ?1")
            .bind(&sku.id)
            .execute(uow.conn())
            .await;
        assert!(result.is_err());
    }
}
