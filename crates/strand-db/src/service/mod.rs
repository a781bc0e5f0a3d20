//! # Services
//!
//! Business operations that span several repositories. Each public method
//! runs in exactly one [`UnitOfWork`]: it either commits everything it did
//! or nothing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  route handler                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  XxxService::op(input)                                                 │
//! │       ├── validate input (strand-core, no store)                       │
//! │       ├── db.begin()  ◄── write lock                                   │
//! │       ├── repository reads / strand-core decisions / repository writes │
//! │       └── uow.commit()                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`catalog`] - SKU creation, manual movements, ledger repair
//! - [`fulfillment`] - Checkout to committed order
//! - [`stock_take`] - Count sessions and reconciliation

pub mod catalog;
pub mod fulfillment;
pub mod stock_take;

pub use catalog::CatalogService;
pub use fulfillment::FulfillmentService;
pub use stock_take::StockTakeService;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::error::DbResult;
use crate::repository::{ledger, sku};
use crate::uow::UnitOfWork;
use strand_core::ledger::{apply, MovementKind, MovementMetadata};
use strand_core::{CoreError, Sku, StockMovement, StockState};

/// Appends one movement for `sku` and rewrites its projection to match.
///
/// `sku.stock` must be the state read inside `uow`. Returns the entry and
/// the new projection.
pub(crate) async fn apply_movement(
    uow: &mut UnitOfWork,
    sku: &Sku,
    kind: MovementKind,
    metadata: MovementMetadata,
    now: DateTime<Utc>,
) -> DbResult<(StockMovement, StockState)> {
    let transition = apply(&sku.code, &sku.stock, kind).map_err(|err| {
        if let CoreError::InsufficientStock {
            available, requested, ..
        } = &err
        {
            warn!(sku = %sku.code, available, requested, "Movement rejected: insufficient stock");
        } else {
            warn!(sku = %sku.code, error = %err, "Movement rejected");
        }
        err
    })?;

    let movement = ledger::movement_for(&sku.id, &transition, metadata, now);
    ledger::append(uow, &movement).await?;
    sku::update_stock(uow, &sku.id, &transition.next, now).await?;

    Ok((movement, transition.next))
}
