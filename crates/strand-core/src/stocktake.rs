//! # Stock-Take Rules
//!
//! Session state machine and count validation.
//!
//! ```text
//!   PLANNED ──► IN_PROGRESS ──► COMPLETED
//!      │             │
//!      └─────┬───────┘
//!            ▼
//!        CANCELLED
//! ```
//! Items can be counted while PLANNED or IN_PROGRESS. Completion emits one
//! ADJUST per item whose count differs from the snapshot.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{StockState, StockTake, StockTakeItem, StockTakeStatus};
use crate::validation::{validate_non_negative_grams, validate_optional_text};

impl StockTakeStatus {
    pub const fn is_terminal(&self) -> bool {
        matches!(self, StockTakeStatus::Completed | StockTakeStatus::Cancelled)
    }

    pub const fn accepts_counts(&self) -> bool {
        matches!(self, StockTakeStatus::Planned | StockTakeStatus::InProgress)
    }

    /// Validates a move to `next`.
    pub fn transition_to(self, next: StockTakeStatus) -> CoreResult<StockTakeStatus> {
        use StockTakeStatus::*;
        match (self, next) {
            (Planned, InProgress) | (InProgress, Completed) | (Planned, Cancelled) | (InProgress, Cancelled) => {
                Ok(next)
            }
            (from, to) => Err(CoreError::InvalidTransition { from, to }),
        }
    }
}

/// Fails unless the session still accepts counts.
pub fn ensure_accepts_counts(session: &StockTake) -> CoreResult<()> {
    if session.status.accepts_counts() {
        Ok(())
    } else {
        Err(CoreError::StockTakeLocked {
            id: session.id.clone(),
            status: session.status,
        })
    }
}

/// Fails if the session was completed; completed counts are ledger history.
pub fn ensure_deletable(session: &StockTake) -> CoreResult<()> {
    if session.status == StockTakeStatus::Completed {
        Err(CoreError::StockTakeLocked {
            id: session.id.clone(),
            status: session.status,
        })
    } else {
        Ok(())
    }
}

/// Input for creating a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewStockTake {
    pub name: Option<String>,
    pub notes: Option<String>,
}

/// One physical count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ItemCount {
    pub sku_id: String,
    pub counted_grams: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl ItemCount {
    /// Validates the count against the SKU it refers to.
    ///
    /// A piece is counted as all (its weight) or nothing.
    pub fn validate(self, sku_code: &str, stock: &StockState) -> CoreResult<ItemCount> {
        validate_non_negative_grams("countedGrams", self.counted_grams)?;
        if let StockState::Piece {
            weight_total_grams, ..
        } = *stock
        {
            if self.counted_grams != 0 && self.counted_grams != weight_total_grams {
                return Err(ValidationError::NotAllowed {
                    field: "countedGrams".to_string(),
                    reason: format!("{} is a piece of {} g; count 0 or {}", sku_code, weight_total_grams, weight_total_grams),
                }
                .into());
            }
        }
        Ok(ItemCount {
            location: validate_optional_text("location", self.location.as_deref())?,
            notes: validate_optional_text("notes", self.notes.as_deref())?,
            ..self
        })
    }
}

/// Items completion must adjust, paired with their target balances.
pub fn adjustments(items: &[StockTakeItem]) -> Vec<(&str, i64)> {
    items
        .iter()
        .filter(|item| item.difference() != 0)
        .map(|item| (item.sku_id.as_str(), item.counted_grams))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use StockTakeStatus::*;

    fn session(status: StockTakeStatus) -> StockTake {
        StockTake {
            id: "st-1".into(),
            name: None,
            status,
            notes: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_transitions() {
        assert_eq!(Planned.transition_to(InProgress).unwrap(), InProgress);
        assert_eq!(InProgress.transition_to(Completed).unwrap(), Completed);
        assert!(Planned.transition_to(Cancelled).is_ok());
        assert!(InProgress.transition_to(Cancelled).is_ok());

        assert!(Planned.transition_to(Completed).is_err());
        assert!(Completed.transition_to(Completed).is_err());
        assert!(Completed.transition_to(Cancelled).is_err());
        assert!(Cancelled.transition_to(InProgress).is_err());
        assert!(InProgress.transition_to(InProgress).is_err());
    }

    #[test]
    fn test_terminal_states_lock_counts() {
        assert!(ensure_accepts_counts(&session(Planned)).is_ok());
        assert!(ensure_accepts_counts(&session(InProgress)).is_ok());
        assert!(matches!(
            ensure_accepts_counts(&session(Completed)),
            Err(CoreError::StockTakeLocked { .. })
        ));
        assert!(ensure_accepts_counts(&session(Cancelled)).is_err());
    }

    #[test]
    fn test_only_completed_sessions_are_kept() {
        assert!(ensure_deletable(&session(Planned)).is_ok());
        assert!(ensure_deletable(&session(Cancelled)).is_ok());
        assert!(ensure_deletable(&session(Completed)).is_err());
    }

    #[test]
    fn test_piece_counts() {
        let piece = StockState::Piece {
            weight_total_grams: 120,
            in_stock: true,
            sold_out: false,
        };
        let count = |g| ItemCount {
            sku_id: "s".into(),
            counted_grams: g,
            location: None,
            notes: None,
        };
        assert!(count(0).validate("P", &piece).is_ok());
        assert!(count(120).validate("P", &piece).is_ok());
        assert!(count(60).validate("P", &piece).is_err());
        assert!(count(-1).validate("P", &piece).is_err());
    }

    #[test]
    fn test_adjustments_skip_matching_counts() {
        let item = |sku: &str, expected, counted| StockTakeItem {
            id: sku.into(),
            stock_take_id: "st-1".into(),
            sku_id: sku.into(),
            expected_grams: expected,
            counted_grams: counted,
            location: None,
            notes: None,
            counted_at: Utc::now(),
        };
        let items = vec![item("a", 300, 280), item("b", 100, 100), item("c", 0, 50)];
        assert_eq!(adjustments(&items), vec![("a", 280), ("c", 50)]);
    }
}
