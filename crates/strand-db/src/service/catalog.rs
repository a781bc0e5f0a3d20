//! # Catalog Service
//!
//! SKU creation, manual stock movements, and ledger repair.
//!
//! ## Creating a SKU
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSku ── catalog::prepare ──► SkuDraft                               │
//! │                                    │                                    │
//! │  BEGIN (write lock) ◄──────────────┘                                    │
//! │    ├── price: override, or price_matrix row, or PriceNotFound          │
//! │    ├── short code: sequence + 1                  (M0042)               │
//! │    ├── code: base, then base-02, base-03 ...     until INSERT succeeds │
//! │    └── opening stock? ── IN movement + projection                      │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A failed code insert only aborts its own statement, so the retry loop
//! stays inside the same unit of work and the short code is not lost.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::{ledger, price_matrix, sequence, sku};
use crate::service::apply_movement;
use crate::uow::UnitOfWork;
use strand_core::catalog::{self, LengthEntry, NewSku, SkuDraft};
use strand_core::codegen::{self, CodeForm, CodeSpec};
use strand_core::ledger::{BalanceCheck, MovementKind, MovementMetadata};
use strand_core::validation::{validate_length_cm, validate_price};
use strand_core::{
    pricing, CatalogSettings, CoreError, CoreResult, PriceMatrixEntry, PricePerGram, PriceSource, Sku,
    StockMovement, StockState, ValidationError,
};

/// Catalog operations over one database.
#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
    settings: CatalogSettings,
}

impl CatalogService {
    pub fn new(db: Database, settings: CatalogSettings) -> Self {
        CatalogService { db, settings }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Creates one SKU, with its opening IN movement when opening stock is given.
    #[instrument(skip(self, input), fields(category = ?input.category, tier = ?input.tier, shade = input.shade, length_cm = input.length_cm))]
    pub async fn create_sku(&self, input: NewSku) -> DbResult<Sku> {
        let draft = catalog::prepare(&input, &self.settings)?;

        let mut uow = self.db.begin().await?;
        let created = self.insert_draft(&mut uow, &draft, Utc::now()).await?;
        uow.commit().await?;

        info!(
            id = %created.id,
            code = %created.code,
            short_code = %created.short_code,
            price_source = ?created.price_source,
            "SKU created"
        );
        Ok(created)
    }

    /// Creates one SKU per length, all or nothing.
    #[instrument(skip(self, base, lengths), fields(count = lengths.len()))]
    pub async fn create_skus_for_lengths(&self, base: NewSku, lengths: Vec<LengthEntry>) -> DbResult<Vec<Sku>> {
        if lengths.is_empty() {
            return Err(ValidationError::Required {
                field: "lengths".to_string(),
            }
            .into());
        }

        let drafts = lengths
            .iter()
            .map(|entry| catalog::prepare(&base.for_length(entry), &self.settings))
            .collect::<CoreResult<Vec<_>>>()?;

        let now = Utc::now();
        let mut uow = self.db.begin().await?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            created.push(self.insert_draft(&mut uow, draft, now).await?);
        }
        uow.commit().await?;

        info!(
            codes = ?created.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(),
            "SKUs created for lengths"
        );
        Ok(created)
    }

    async fn insert_draft(&self, uow: &mut UnitOfWork, draft: &SkuDraft, now: DateTime<Utc>) -> DbResult<Sku> {
        let (price_per_gram, price_source) = match draft.price_override {
            Some(manual) => pricing::resolve(&draft.price_key, None, Some(manual))?,
            None => {
                let row = price_matrix::find(uow.conn(), &draft.price_key).await?;
                pricing::resolve(&draft.price_key, row.as_ref(), None).inspect_err(|_| {
                    warn!(key = ?draft.price_key, "No price matrix entry, SKU not created");
                })?
            }
        };

        let short_value = sequence::next_value(uow, sequence::SHORT_CODE_SEQUENCE).await?;
        let short_code = codegen::format_short_code(&self.settings.short_code_prefix, short_value);

        let base = self.base_code(uow, draft, now).await?;

        let mut created = Sku {
            id: sku::generate_sku_id(),
            code: base.clone(),
            short_code,
            name: draft.name.clone(),
            category: draft.category,
            tier: draft.tier,
            shade: draft.shade,
            shade_band: draft.price_key.shade_band,
            structure: draft.structure,
            length_cm: draft.length_cm,
            premium_sourcing: draft.premium_sourcing,
            price_per_gram,
            price_source,
            stock: draft.initial_stock,
            is_listed: draft.is_listed,
            listing_priority: draft.listing_priority,
            created_at: now,
            updated_at: now,
        };

        self.insert_with_free_code(uow, &mut created, &base).await?;

        if let Some(grams) = draft.opening_stock_grams {
            let (_, next) = apply_movement(
                uow,
                &created,
                MovementKind::In { grams },
                draft.opening_metadata.clone(),
                now,
            )
            .await?;
            created.stock = next;
        }

        Ok(created)
    }

    /// Base code for a draft; BULK codes get the next per-day sequence hint.
    async fn base_code(&self, uow: &mut UnitOfWork, draft: &SkuDraft, now: DateTime<Utc>) -> DbResult<String> {
        let date = now.date_naive();
        let mut spec = CodeSpec {
            category: draft.category,
            premium_sourcing: draft.premium_sourcing,
            tier: draft.tier,
            shade: draft.shade,
            structure: draft.structure,
            length_cm: draft.length_cm,
            form: match draft.initial_stock {
                StockState::Bulk { .. } => CodeForm::Bulk { date, sequence: 1 },
                StockState::Piece {
                    weight_total_grams, ..
                } => CodeForm::Piece {
                    weight_grams: weight_total_grams,
                },
            },
        };

        if let Some(prefix) = codegen::bulk_day_prefix(&spec) {
            let existing = sku::codes_with_prefix(uow.conn(), &prefix).await?;
            spec.form = CodeForm::Bulk {
                date,
                sequence: codegen::next_bulk_sequence(&prefix, existing.iter().map(String::as_str)),
            };
        }

        Ok(codegen::generate_sku_code(&spec))
    }

    /// Inserts `created`, walking the collision suffixes until a code is free.
    async fn insert_with_free_code(&self, uow: &mut UnitOfWork, created: &mut Sku, base: &str) -> DbResult<()> {
        let attempts = self.settings.max_code_attempts.max(1);
        for attempt in 1..=attempts {
            created.code = codegen::candidate(base, attempt);
            match sku::insert(uow, created).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_unique_violation_on("skus.code") => {
                    debug!(code = %created.code, attempt, "SKU code taken, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(base = %base, attempts, "Code space exhausted");
        Err(CoreError::CodeSpaceExhausted {
            base: base.to_string(),
            attempts,
        }
        .into())
    }

    // =========================================================================
    // Price Matrix
    // =========================================================================

    /// Adds or replaces a matrix row. Existing SKUs keep their price.
    pub async fn upsert_price(&self, entry: PriceMatrixEntry) -> DbResult<()> {
        validate_length_cm(entry.length_cm)?;
        validate_price("pricePerGram.czk", entry.price_per_gram.czk)?;
        validate_price("pricePerGram.eur", entry.price_per_gram.eur)?;

        let mut uow = self.db.begin().await?;
        price_matrix::upsert(&mut uow, &entry).await?;
        uow.commit().await
    }

    pub async fn price_matrix(&self) -> DbResult<Vec<PriceMatrixEntry>> {
        let mut conn = self.db.connection().await?;
        price_matrix::list(&mut conn).await
    }

    // =========================================================================
    // Stock Movements
    // =========================================================================

    /// Records a manual IN / OUT / ADJUST and updates the projection with it.
    #[instrument(skip(self, metadata))]
    pub async fn record_movement(
        &self,
        sku_id: &str,
        kind: MovementKind,
        metadata: MovementMetadata,
    ) -> DbResult<StockMovement> {
        // Order and stock-take references are only set by their own flows.
        let metadata = MovementMetadata {
            ref_order_id: None,
            ref_stock_take_id: None,
            ..metadata.normalized()?
        };

        let mut uow = self.db.begin().await?;
        let current = sku::get(uow.conn(), sku_id).await?;
        let (movement, next) = apply_movement(&mut uow, &current, kind, metadata, Utc::now()).await?;
        uow.commit().await?;

        info!(
            sku = %current.code,
            movement_type = ?movement.movement_type,
            delta = movement.signed_grams(),
            balance = next.balance_grams(),
            "Stock movement recorded"
        );
        Ok(movement)
    }

    /// Ledger balance: the signed sum of every movement.
    pub async fn current_balance(&self, sku_id: &str) -> DbResult<i64> {
        let mut conn = self.db.connection().await?;
        sku::get(&mut conn, sku_id).await?;
        let (balance, _) = ledger::balance(&mut conn, sku_id).await?;
        Ok(balance)
    }

    /// Compares the cached projection with the ledger.
    pub async fn verify_balance(&self, sku_id: &str) -> DbResult<BalanceCheck> {
        let mut conn = self.db.connection().await?;
        let current = sku::get(&mut conn, sku_id).await?;
        let (ledger_grams, _) = ledger::balance(&mut conn, sku_id).await?;

        Ok(BalanceCheck {
            sku_id: current.id,
            code: current.code,
            ledger_grams,
            cached_grams: current.stock.balance_grams(),
        })
    }

    /// Rewrites the projection from the ledger. Returns the check as found.
    #[instrument(skip(self))]
    pub async fn rebuild_projection(&self, sku_id: &str) -> DbResult<BalanceCheck> {
        let mut uow = self.db.begin().await?;
        let current = sku::get(uow.conn(), sku_id).await?;
        let (ledger_grams, movements) = ledger::balance(uow.conn(), sku_id).await?;

        let check = BalanceCheck {
            sku_id: current.id.clone(),
            code: current.code.clone(),
            ledger_grams,
            cached_grams: current.stock.balance_grams(),
        };

        let representable = match current.stock {
            StockState::Bulk { .. } => ledger_grams >= 0,
            StockState::Piece {
                weight_total_grams, ..
            } => ledger_grams == 0 || ledger_grams == weight_total_grams,
        };
        if !representable {
            return Err(DbError::corrupt(
                "stock_movements",
                format!("ledger balance {} g is impossible for {}", ledger_grams, current.code),
            ));
        }

        let rebuilt = current.stock.with_balance(ledger_grams, movements > 0);
        if rebuilt != current.stock {
            sku::update_stock(&mut uow, sku_id, &rebuilt, Utc::now()).await?;
            warn!(sku = %current.code, drift = check.drift(), "Stock projection rebuilt from ledger");
        }
        uow.commit().await?;

        Ok(check)
    }

    /// SKUs whose projection disagrees with the ledger.
    pub async fn audit_all(&self) -> DbResult<Vec<BalanceCheck>> {
        let mut conn = self.db.connection().await?;
        let drifted: Vec<BalanceCheck> = ledger::all_balances(&mut conn)
            .await?
            .into_iter()
            .filter(|check| !check.is_consistent())
            .collect();

        if drifted.is_empty() {
            info!("Ledger audit clean");
        } else {
            warn!(count = drifted.len(), "Ledger audit found drifted projections");
        }
        Ok(drifted)
    }

    /// Movements of a SKU, oldest first.
    pub async fn history(&self, sku_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let mut conn = self.db.connection().await?;
        sku::get(&mut conn, sku_id).await?;
        ledger::history(&mut conn, sku_id, limit).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    pub async fn get_sku(&self, sku_id: &str) -> DbResult<Sku> {
        let mut conn = self.db.connection().await?;
        sku::get(&mut conn, sku_id).await
    }

    pub async fn list_skus(&self, listed_only: bool, limit: u32) -> DbResult<Vec<Sku>> {
        let mut conn = self.db.connection().await?;
        sku::list(&mut conn, listed_only, limit).await
    }

    /// Reprices a SKU: a manual price, or the matrix's current row when `None`.
    #[instrument(skip(self))]
    pub async fn update_price(&self, sku_id: &str, price_override: Option<PricePerGram>) -> DbResult<Sku> {
        let mut uow = self.db.begin().await?;
        let mut current = sku::get(uow.conn(), sku_id).await?;

        let key = pricing::PriceKey::new(
            current.category,
            current.tier,
            current.shade,
            current.length_cm,
            current.premium_sourcing,
        );
        let (price, source) = match price_override {
            Some(manual) => pricing::resolve(&key, None, Some(manual))?,
            None => {
                let row = price_matrix::find(uow.conn(), &key).await?;
                pricing::resolve(&key, row.as_ref(), None)?
            }
        };

        let now = Utc::now();
        sku::update_price(&mut uow, sku_id, price, source, now).await?;
        uow.commit().await?;

        info!(sku = %current.code, czk = price.czk.minor(), eur = price.eur.minor(), source = ?source, "SKU repriced");
        current.price_per_gram = price;
        current.price_source = source;
        current.updated_at = now;
        Ok(current)
    }

    pub async fn update_listing(&self, sku_id: &str, is_listed: bool, listing_priority: i64) -> DbResult<Sku> {
        let now = Utc::now();
        let mut uow = self.db.begin().await?;
        let mut current = sku::get(uow.conn(), sku_id).await?;
        sku::update_listing(&mut uow, sku_id, is_listed, listing_priority, now).await?;
        uow.commit().await?;

        current.is_listed = is_listed;
        current.listing_priority = listing_priority;
        current.updated_at = now;
        Ok(current)
    }

    /// Deletes a SKU nothing refers to. Its short code is never handed out again.
    #[instrument(skip(self))]
    pub async fn delete_unused(&self, sku_id: &str) -> DbResult<()> {
        let mut uow = self.db.begin().await?;
        let current = sku::get(uow.conn(), sku_id).await?;
        if sku::has_history(uow.conn(), sku_id).await? {
            return Err(CoreError::SkuInUse(current.code).into());
        }
        sku::delete(&mut uow, sku_id).await?;
        uow.commit().await?;

        info!(sku = %current.code, short_code = %current.short_code, "SKU deleted");
        Ok(())
    }
}

/// Row for the default price a matrix-priced SKU needs, for tests and seeding.
pub fn matrix_row_for(input: &NewSku, price_per_gram: PricePerGram) -> CoreResult<PriceMatrixEntry> {
    let shade = strand_core::Shade::new(input.shade)?;
    Ok(PriceMatrixEntry {
        category: input.category,
        tier: input.tier,
        shade_band: pricing::shade_band(input.category, shade, input.premium_sourcing),
        length_cm: input.length_cm,
        price_per_gram,
    })
}
