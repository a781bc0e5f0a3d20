//! # Stock Ledger Rules
//!
//! Pure transition function of the ledger: given a SKU's cached stock state
//! and a requested movement, decide the ledger entry to append and the new
//! projection. The store applies both in one unit of work.
//!
//! ## Movement Rules
//! ```text
//! ┌──────────────┬──────────────────────────────┬──────────────────────────────┐
//! │              │ BULK                         │ PIECE (weight W)             │
//! ├──────────────┼──────────────────────────────┼──────────────────────────────┤
//! │ IN  g        │ available += g               │ only when absent, g == W     │
//! │ OUT g        │ g <= available, else         │ only when present, g == W,   │
//! │              │ InsufficientStock            │ marks sold out               │
//! │ ADJUST → t   │ available = t, delta logged  │ t ∈ {0, W}                   │
//! └──────────────┴──────────────────────────────┴──────────────────────────────┘
//! ```
//! Every entry stores a positive magnitude plus a direction; an ADJUST that
//! changes nothing is rejected rather than logged as a zero entry.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MovementType, StockDirection, StockMovement, StockState};
use crate::validation::{validate_non_negative_grams, validate_optional_text, validate_positive_grams};

// =============================================================================
// Requests
// =============================================================================

/// What the caller wants to happen to the balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum MovementKind {
    In { grams: i64 },
    Out { grams: i64 },
    #[serde(rename_all = "camelCase")]
    Adjust { target_grams: i64 },
}

/// Descriptive fields copied onto the ledger entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MovementMetadata {
    pub reason: Option<String>,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub cost_per_gram: Option<Money>,
    #[serde(skip)]
    pub ref_order_id: Option<String>,
    #[serde(skip)]
    pub ref_stock_take_id: Option<String>,
}

impl MovementMetadata {
    pub fn reason(reason: impl Into<String>) -> Self {
        MovementMetadata {
            reason: Some(reason.into()),
            ..Default::default()
        }
    }

    pub fn for_order(order_id: &str) -> Self {
        MovementMetadata {
            reason: Some("order".to_string()),
            ref_order_id: Some(order_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_stock_take(stock_take_id: &str) -> Self {
        MovementMetadata {
            reason: Some("stock-take".to_string()),
            ref_stock_take_id: Some(stock_take_id.to_string()),
            ..Default::default()
        }
    }

    /// Trims free-text fields and rejects negative costs.
    pub fn normalized(self) -> CoreResult<Self> {
        if let Some(cost) = self.cost_per_gram {
            crate::validation::validate_non_negative_money("costPerGram", cost)?;
        }
        Ok(MovementMetadata {
            reason: validate_optional_text("reason", self.reason.as_deref())?,
            location: validate_optional_text("location", self.location.as_deref())?,
            batch_number: validate_optional_text("batchNumber", self.batch_number.as_deref())?,
            ..self
        })
    }
}

// =============================================================================
// Transition
// =============================================================================

/// Ledger entry to append and the projection to store alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub movement_type: MovementType,
    pub grams: i64,
    pub direction: StockDirection,
    pub next: StockState,
}

impl Transition {
    pub const fn signed_grams(&self) -> i64 {
        match self.direction {
            StockDirection::Increase => self.grams,
            StockDirection::Decrease => -self.grams,
        }
    }
}

fn invalid(sku: &str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidMovement {
        sku: sku.to_string(),
        reason: reason.into(),
    }
}

/// Decides the outcome of `kind` against `state` for the SKU labelled `sku`.
///
/// ## Example
/// ```rust
/// use strand_core::ledger::{apply, MovementKind};
/// use strand_core::types::StockState;
///
/// let state = StockState::Bulk { available_grams: 500, min_order_grams: 50, step_grams: 10 };
/// let t = apply("X-NB", &state, MovementKind::Out { grams: 200 }).unwrap();
/// assert_eq!(t.next.balance_grams(), 300);
///
/// assert!(apply("X-NB", &state, MovementKind::Out { grams: 600 }).is_err());
/// ```
pub fn apply(sku: &str, state: &StockState, kind: MovementKind) -> CoreResult<Transition> {
    match kind {
        MovementKind::In { grams } | MovementKind::Out { grams } => {
            validate_positive_grams("grams", grams)?;
        }
        MovementKind::Adjust { target_grams } => {
            validate_non_negative_grams("targetGrams", target_grams)?;
        }
    }

    match *state {
        StockState::Bulk {
            available_grams,
            min_order_grams,
            step_grams,
        } => {
            let bulk = |available_grams| StockState::Bulk {
                available_grams,
                min_order_grams,
                step_grams,
            };
            match kind {
                MovementKind::In { grams } => {
                    let next = available_grams
                        .checked_add(grams)
                        .ok_or_else(|| ValidationError::TooLarge {
                            field: "grams".to_string(),
                        })?;
                    Ok(Transition {
                        movement_type: MovementType::In,
                        grams,
                        direction: StockDirection::Increase,
                        next: bulk(next),
                    })
                }
                MovementKind::Out { grams } => {
                    if grams > available_grams {
                        return Err(CoreError::InsufficientStock {
                            sku: sku.to_string(),
                            available: available_grams,
                            requested: grams,
                        });
                    }
                    Ok(Transition {
                        movement_type: MovementType::Out,
                        grams,
                        direction: StockDirection::Decrease,
                        next: bulk(available_grams - grams),
                    })
                }
                MovementKind::Adjust { target_grams } => {
                    adjust(sku, available_grams, target_grams, bulk(target_grams))
                }
            }
        }
        StockState::Piece {
            weight_total_grams,
            in_stock,
            sold_out,
        } => {
            let present = in_stock && !sold_out;
            let piece = |present: bool| StockState::Piece {
                weight_total_grams,
                in_stock: present,
                sold_out: !present,
            };
            match kind {
                MovementKind::In { grams } => {
                    if present {
                        return Err(invalid(sku, "piece is already in stock"));
                    }
                    if grams != weight_total_grams {
                        return Err(invalid(
                            sku,
                            format!("piece IN must be exactly {} g", weight_total_grams),
                        ));
                    }
                    Ok(Transition {
                        movement_type: MovementType::In,
                        grams,
                        direction: StockDirection::Increase,
                        next: piece(true),
                    })
                }
                MovementKind::Out { grams } => {
                    if !present {
                        return Err(CoreError::InsufficientStock {
                            sku: sku.to_string(),
                            available: 0,
                            requested: grams,
                        });
                    }
                    if grams != weight_total_grams {
                        return Err(invalid(
                            sku,
                            format!("piece OUT must be exactly {} g", weight_total_grams),
                        ));
                    }
                    Ok(Transition {
                        movement_type: MovementType::Out,
                        grams,
                        direction: StockDirection::Decrease,
                        next: piece(false),
                    })
                }
                MovementKind::Adjust { target_grams } => {
                    if target_grams != 0 && target_grams != weight_total_grams {
                        return Err(invalid(
                            sku,
                            format!("piece can only be adjusted to 0 or {} g", weight_total_grams),
                        ));
                    }
                    adjust(
                        sku,
                        state.balance_grams(),
                        target_grams,
                        piece(target_grams > 0),
                    )
                }
            }
        }
    }
}

fn adjust(sku: &str, current: i64, target: i64, next: StockState) -> CoreResult<Transition> {
    let delta = target - current;
    if delta == 0 {
        return Err(invalid(sku, format!("balance is already {} g", current)));
    }
    Ok(Transition {
        movement_type: MovementType::Adjust,
        grams: delta.abs(),
        direction: if delta > 0 {
            StockDirection::Increase
        } else {
            StockDirection::Decrease
        },
        next,
    })
}

// =============================================================================
// Balance Audit
// =============================================================================

/// Signed sum of a SKU's movements.
pub fn ledger_balance<'a>(movements: impl IntoIterator<Item = &'a StockMovement>) -> i64 {
    movements.into_iter().map(StockMovement::signed_grams).sum()
}

/// Cached projection compared against the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BalanceCheck {
    pub sku_id: String,
    pub code: String,
    pub ledger_grams: i64,
    pub cached_grams: i64,
}

impl BalanceCheck {
    #[inline]
    pub const fn is_consistent(&self) -> bool {
        self.ledger_grams == self.cached_grams
    }

    #[inline]
    pub const fn drift(&self) -> i64 {
        self.cached_grams - self.ledger_grams
    }
}
