//! # SKU Catalog Rules
//!
//! Typed input for SKU creation, its one-time validation, and the derived
//! display name. Price lookup, code reservation and persistence happen in
//! strand-db; everything decided here is pure.
//!
//! ## Creation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSku (raw input)                                                     │
//! │     │  prepare()  ← THIS MODULE                                        │
//! │     ▼                                                                   │
//! │  SkuDraft { shade, price key, initial stock, opening grams, name }     │
//! │     │  strand-db: resolve price, reserve code + short code             │
//! │     ▼                                                                   │
//! │  Sku + optional opening IN movement, one unit of work                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::ledger::MovementMetadata;
use crate::money::Money;
use crate::pricing::PriceKey;
use crate::settings::CatalogSettings;
use crate::types::{Category, PricePerGram, SaleMode, Shade, StockState, Structure, Tier};
use crate::validation::{
    validate_length_cm, validate_non_negative_money, validate_optional_text, validate_piece_weight,
    validate_positive_grams,
};

// =============================================================================
// Input
// =============================================================================

/// Input for `create_sku`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSku {
    pub category: Category,
    pub tier: Tier,
    /// Raw shade, validated into a [`Shade`].
    pub shade: i64,
    pub structure: Structure,
    pub length_cm: i64,
    #[serde(default)]
    pub premium_sourcing: bool,
    pub sale_mode: SaleMode,
    /// Required for PIECE, rejected for BULK.
    pub weight_total_grams: Option<i64>,
    /// BULK only; falls back to [`CatalogSettings::default_min_order_grams`].
    pub min_order_grams: Option<i64>,
    /// BULK only; falls back to [`CatalogSettings::default_step_grams`].
    pub step_grams: Option<i64>,
    pub price_override: Option<PricePerGram>,
    /// Written as an opening IN movement when present.
    pub opening_stock_grams: Option<i64>,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub cost_per_gram: Option<Money>,
    pub is_listed: Option<bool>,
    pub listing_priority: Option<i64>,
}

/// One row of a multi-length creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LengthEntry {
    pub length_cm: i64,
    pub weight_total_grams: Option<i64>,
    pub opening_stock_grams: Option<i64>,
    pub price_override: Option<PricePerGram>,
}

impl NewSku {
    /// Copy of this input for another length.
    ///
    /// Entry fields replace the base's; an absent override or weight keeps the
    /// base value, an absent opening stock means none.
    pub fn for_length(&self, entry: &LengthEntry) -> NewSku {
        NewSku {
            length_cm: entry.length_cm,
            weight_total_grams: entry.weight_total_grams.or(self.weight_total_grams),
            opening_stock_grams: entry.opening_stock_grams,
            price_override: entry.price_override.or(self.price_override),
            ..self.clone()
        }
    }
}

// =============================================================================
// Draft
// =============================================================================

/// Validated creation input, ready for price lookup and persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuDraft {
    pub category: Category,
    pub tier: Tier,
    pub shade: Shade,
    pub structure: Structure,
    pub length_cm: i64,
    pub premium_sourcing: bool,
    pub price_key: PriceKey,
    pub price_override: Option<PricePerGram>,
    /// Stock state before the opening movement.
    pub initial_stock: StockState,
    pub opening_stock_grams: Option<i64>,
    pub opening_metadata: MovementMetadata,
    pub name: String,
    pub is_listed: bool,
    pub listing_priority: i64,
}

impl SkuDraft {
    pub fn sale_mode(&self) -> SaleMode {
        self.initial_stock.sale_mode()
    }
}

/// Validates `input` once, applying catalog defaults.
pub fn prepare(input: &NewSku, settings: &CatalogSettings) -> CoreResult<SkuDraft> {
    let shade = Shade::new(input.shade)?;
    validate_length_cm(input.length_cm)?;

    let initial_stock = match input.sale_mode {
        SaleMode::BulkByWeight => {
            if input.weight_total_grams.is_some() {
                return Err(ValidationError::NotAllowed {
                    field: "weightTotalGrams".to_string(),
                    reason: "only PIECE_BY_WEIGHT SKUs have a fixed weight".to_string(),
                }
                .into());
            }
            let min_order_grams = input
                .min_order_grams
                .unwrap_or(settings.default_min_order_grams);
            let step_grams = input.step_grams.unwrap_or(settings.default_step_grams);
            validate_positive_grams("minOrderGrams", min_order_grams)?;
            validate_positive_grams("stepGrams", step_grams)?;
            StockState::Bulk {
                available_grams: 0,
                min_order_grams,
                step_grams,
            }
        }
        SaleMode::PieceByWeight => {
            let weight = input.weight_total_grams.ok_or_else(|| ValidationError::Required {
                field: "weightTotalGrams".to_string(),
            })?;
            validate_piece_weight(weight)?;
            StockState::Piece {
                weight_total_grams: weight,
                in_stock: false,
                sold_out: false,
            }
        }
    };

    if let Some(opening) = input.opening_stock_grams {
        validate_positive_grams("openingStockGrams", opening)?;
        if let StockState::Piece {
            weight_total_grams, ..
        } = initial_stock
        {
            if opening != weight_total_grams {
                return Err(ValidationError::NotAllowed {
                    field: "openingStockGrams".to_string(),
                    reason: format!("a piece opens with exactly {} g", weight_total_grams),
                }
                .into());
            }
        }
    }

    if let Some(cost) = input.cost_per_gram {
        validate_non_negative_money("costPerGram", cost)?;
    }

    let opening_metadata = MovementMetadata {
        reason: Some("opening stock".to_string()),
        location: validate_optional_text("location", input.location.as_deref())?,
        batch_number: validate_optional_text("batchNumber", input.batch_number.as_deref())?,
        cost_per_gram: input.cost_per_gram,
        ref_order_id: None,
        ref_stock_take_id: None,
    };

    Ok(SkuDraft {
        category: input.category,
        tier: input.tier,
        shade,
        structure: input.structure,
        length_cm: input.length_cm,
        premium_sourcing: input.premium_sourcing,
        price_key: PriceKey::new(
            input.category,
            input.tier,
            shade,
            input.length_cm,
            input.premium_sourcing,
        ),
        price_override: input.price_override,
        name: display_name(
            input.tier,
            shade,
            input.structure,
            input.length_cm,
            input.weight_total_grams.filter(|_| input.sale_mode == SaleMode::PieceByWeight),
        ),
        initial_stock,
        opening_stock_grams: input.opening_stock_grams,
        opening_metadata,
        is_listed: input.is_listed.unwrap_or(true),
        listing_priority: input.listing_priority.unwrap_or(0),
    })
}

/// Storefront name, e.g. `Luxe straight 50 cm, shade 3` or
/// `Luxe straight 50 cm, shade 3, 120 g` for a piece.
pub fn display_name(
    tier: Tier,
    shade: Shade,
    structure: Structure,
    length_cm: i64,
    piece_weight: Option<i64>,
) -> String {
    let mut name = format!(
        "{} {} {} cm, shade {}",
        tier.label(),
        structure.label(),
        length_cm,
        shade.value()
    );
    if let Some(weight) = piece_weight {
        name.push_str(&format!(", {} g", weight));
    }
    name
}
