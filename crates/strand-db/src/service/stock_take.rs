//! # Stock-Take Service
//!
//! Physical count sessions reconciled against the ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ──► PLANNED ──start──► IN_PROGRESS ──complete──► COMPLETED      │
//! │                │                   │                                    │
//! │                └──────cancel───────┴──────────────────► CANCELLED       │
//! │                                                                         │
//! │  add_items (PLANNED / IN_PROGRESS):                                     │
//! │      expected = ledger balance now, counted = input                     │
//! │                                                                         │
//! │  complete, one unit of work:                                            │
//! │      every item with counted ≠ expected ──► ADJUST to counted           │
//! │      status COMPLETED                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{ledger, sku, stock_take};
use crate::service::apply_movement;
use crate::uow::UnitOfWork;
use strand_core::ledger::{MovementKind, MovementMetadata};
use strand_core::stocktake::{self, ItemCount, NewStockTake};
use strand_core::validation::validate_optional_text;
use strand_core::{CoreError, StockTake, StockTakeItem, StockTakeStatus, ValidationError};

/// A session with its counted items.
#[derive(Debug, Clone)]
pub struct StockTakeWithItems {
    pub session: StockTake,
    pub items: Vec<StockTakeItem>,
}

#[derive(Debug, Clone)]
pub struct StockTakeService {
    db: Database,
}

impl StockTakeService {
    pub fn new(db: Database) -> Self {
        StockTakeService { db }
    }

    pub async fn create(&self, input: NewStockTake) -> DbResult<StockTake> {
        let session = StockTake {
            id: uuid::Uuid::new_v4().to_string(),
            name: validate_optional_text("name", input.name.as_deref())?,
            status: StockTakeStatus::Planned,
            notes: validate_optional_text("notes", input.notes.as_deref())?,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };

        let mut uow = self.db.begin().await?;
        stock_take::insert(&mut uow, &session).await?;
        uow.commit().await?;

        info!(id = %session.id, "Stock-take planned");
        Ok(session)
    }

    pub async fn get(&self, id: &str) -> DbResult<StockTakeWithItems> {
        let mut conn = self.db.connection().await?;
        let session = stock_take::find(&mut conn, id)
            .await?
            .ok_or_else(|| CoreError::StockTakeNotFound(id.to_string()))?;
        let items = stock_take::items(&mut conn, id).await?;
        Ok(StockTakeWithItems { session, items })
    }

    pub async fn list(&self, limit: u32) -> DbResult<Vec<StockTake>> {
        let mut conn = self.db.connection().await?;
        stock_take::list(&mut conn, limit).await
    }

    /// Moves a session to `next`, running completion when asked to complete.
    pub async fn transition(&self, id: &str, next: StockTakeStatus) -> DbResult<StockTake> {
        match next {
            StockTakeStatus::Completed => self.complete(id).await,
            other => self.change_status(id, other).await,
        }
    }

    pub async fn start(&self, id: &str) -> DbResult<StockTake> {
        self.change_status(id, StockTakeStatus::InProgress).await
    }

    pub async fn cancel(&self, id: &str) -> DbResult<StockTake> {
        self.change_status(id, StockTakeStatus::Cancelled).await
    }

    /// Status changes that write no movements.
    #[instrument(skip(self))]
    async fn change_status(&self, id: &str, next: StockTakeStatus) -> DbResult<StockTake> {
        let mut uow = self.db.begin().await?;
        let mut session = load(&mut uow, id).await?;
        session.status = session.status.transition_to(next)?;

        let now = Utc::now();
        match session.status {
            StockTakeStatus::InProgress => session.started_at = Some(now),
            StockTakeStatus::Cancelled => session.finished_at = Some(now),
            _ => {}
        }

        stock_take::update_status(&mut uow, &session).await?;
        uow.commit().await?;

        info!(id = %session.id, status = ?session.status, "Stock-take status changed");
        Ok(session)
    }

    /// Records counts, snapshotting each SKU's ledger balance as expected.
    #[instrument(skip(self, counts), fields(count = counts.len()))]
    pub async fn add_items(&self, id: &str, counts: Vec<ItemCount>) -> DbResult<Vec<StockTakeItem>> {
        if counts.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        let mut uow = self.db.begin().await?;
        let session = load(&mut uow, id).await?;
        stocktake::ensure_accepts_counts(&session)?;

        let now = Utc::now();
        for count in counts {
            let counted_sku = sku::get(uow.conn(), &count.sku_id).await?;
            let count = count.validate(&counted_sku.code, &counted_sku.stock)?;
            let (expected_grams, _) = ledger::balance(uow.conn(), &counted_sku.id).await?;

            stock_take::upsert_item(
                &mut uow,
                &StockTakeItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    stock_take_id: session.id.clone(),
                    sku_id: counted_sku.id,
                    expected_grams,
                    counted_grams: count.counted_grams,
                    location: count.location,
                    notes: count.notes,
                    counted_at: now,
                },
            )
            .await?;
        }

        let items = stock_take::items(uow.conn(), id).await?;
        uow.commit().await?;
        Ok(items)
    }

    /// Applies every non-zero difference as an ADJUST and closes the session.
    #[instrument(skip(self))]
    pub async fn complete(&self, id: &str) -> DbResult<StockTake> {
        let mut uow = self.db.begin().await?;
        let mut session = load(&mut uow, id).await?;
        session.status = session.status.transition_to(StockTakeStatus::Completed)?;

        let now = Utc::now();
        let items = stock_take::items(uow.conn(), id).await?;
        let mut adjusted = 0usize;

        for (sku_id, target_grams) in stocktake::adjustments(&items) {
            let current = sku::get(uow.conn(), sku_id).await?;
            // Stock may have moved since the count was snapshotted.
            if current.stock.balance_grams() == target_grams {
                debug!(sku = %current.code, target_grams, "Already at counted balance");
                continue;
            }
            apply_movement(
                &mut uow,
                &current,
                MovementKind::Adjust { target_grams },
                MovementMetadata::for_stock_take(id),
                now,
            )
            .await?;
            adjusted += 1;
        }

        session.finished_at = Some(now);
        stock_take::update_status(&mut uow, &session).await?;
        uow.commit().await?;

        info!(id = %session.id, items = items.len(), adjusted, "Stock-take completed");
        Ok(session)
    }

    /// Deletes a session that was never completed.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut uow = self.db.begin().await?;
        let session = load(&mut uow, id).await?;
        stocktake::ensure_deletable(&session)?;
        stock_take::delete(&mut uow, id).await?;
        uow.commit().await?;

        info!(id = %id, "Stock-take deleted");
        Ok(())
    }
}

async fn load(uow: &mut UnitOfWork, id: &str) -> DbResult<StockTake> {
    stock_take::find(uow.conn(), id)
        .await?
        .ok_or_else(|| CoreError::StockTakeNotFound(id.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::service::catalog::tests::{bulk_input, service as catalog_service};
    use crate::service::CatalogService;
    use strand_core::catalog::NewSku;
    use strand_core::MovementType;

    async fn setup(opening: i64) -> (CatalogService, StockTakeService, String) {
        let catalog = catalog_service().await;
        let counted = catalog
            .create_sku(NewSku {
                opening_stock_grams: Some(opening),
                ..bulk_input(20)
            })
            .await
            .unwrap();
        let stock_takes = StockTakeService::new(catalog.database().clone());
        (catalog, stock_takes, counted.id)
    }

    fn count(sku_id: &str, grams: i64) -> ItemCount {
        ItemCount {
            sku_id: sku_id.to_string(),
            counted_grams: grams,
            location: Some("shelf A".to_string()),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_count_and_complete_adjusts_balance() {
        let (catalog, stock_takes, sku_id) = setup(300).await;

        let session = stock_takes.create(NewStockTake::default()).await.unwrap();
        assert_eq!(session.status, StockTakeStatus::Planned);

        let items = stock_takes.add_items(&session.id, vec![count(&sku_id, 280)]).await.unwrap();
        assert_eq!(items[0].expected_grams, 300);
        assert_eq!(items[0].difference(), -20);

        stock_takes.start(&session.id).await.unwrap();
        let done = stock_takes.complete(&session.id).await.unwrap();
        assert_eq!(done.status, StockTakeStatus::Completed);
        assert!(done.finished_at.is_some());

        assert_eq!(catalog.current_balance(&sku_id).await.unwrap(), 280);
        let last = catalog.history(&sku_id, 10).await.unwrap().pop().unwrap();
        assert_eq!(last.movement_type, MovementType::Adjust);
        assert_eq!(last.signed_grams(), -20);
        assert_eq!(last.ref_stock_take_id.as_deref(), Some(session.id.as_str()));

        // Completing twice is rejected and changes nothing.
        let err = stock_takes.complete(&session.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransition { .. })));
        assert_eq!(catalog.current_balance(&sku_id).await.unwrap(), 280);
    }

    #[tokio::test]
    async fn test_complete_requires_in_progress() {
        let (_, stock_takes, sku_id) = setup(300).await;
        let session = stock_takes.create(NewStockTake::default()).await.unwrap();
        stock_takes.add_items(&session.id, vec![count(&sku_id, 100)]).await.unwrap();

        let err = stock_takes.complete(&session.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_recount_replaces_and_resnapshots() {
        let (catalog, stock_takes, sku_id) = setup(300).await;
        let session = stock_takes.create(NewStockTake::default()).await.unwrap();

        stock_takes.add_items(&session.id, vec![count(&sku_id, 250)]).await.unwrap();
        catalog
            .record_movement(&sku_id, MovementKind::In { grams: 100 }, MovementMetadata::default())
            .await
            .unwrap();
        let items = stock_takes.add_items(&session.id, vec![count(&sku_id, 390)]).await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].expected_grams, 400);
        assert_eq!(items[0].difference(), -10);
    }

    #[tokio::test]
    async fn test_stock_moved_to_count_is_not_adjusted() {
        let (catalog, stock_takes, sku_id) = setup(300).await;
        let session = stock_takes.create(NewStockTake::default()).await.unwrap();
        stock_takes.add_items(&session.id, vec![count(&sku_id, 280)]).await.unwrap();
        stock_takes.start(&session.id).await.unwrap();

        catalog
            .record_movement(&sku_id, MovementKind::Out { grams: 20 }, MovementMetadata::default())
            .await
            .unwrap();
        stock_takes.complete(&session.id).await.unwrap();

        let entries = catalog.history(&sku_id, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(catalog.current_balance(&sku_id).await.unwrap(), 280);
    }

    #[tokio::test]
    async fn test_locked_sessions() {
        let (_, stock_takes, sku_id) = setup(300).await;
        let session = stock_takes.create(NewStockTake::default()).await.unwrap();
        stock_takes.start(&session.id).await.unwrap();
        stock_takes.complete(&session.id).await.unwrap();

        let err = stock_takes.add_items(&session.id, vec![count(&sku_id, 1)]).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StockTakeLocked { .. })));

        let err = stock_takes.delete(&session.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::StockTakeLocked { .. })));

        let cancelled = stock_takes.create(NewStockTake::default()).await.unwrap();
        stock_takes
            .transition(&cancelled.id, StockTakeStatus::Cancelled)
            .await
            .unwrap();
        stock_takes.delete(&cancelled.id).await.unwrap();
        assert!(matches!(
            stock_takes.get(&cancelled.id).await,
            Err(DbError::Domain(CoreError::StockTakeNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_unknown_sku_count_rejected() {
        let (_, stock_takes, _) = setup(300).await;
        let session = stock_takes.create(NewStockTake::default()).await.unwrap();

        let err = stock_takes.add_items(&session.id, vec![count("ghost", 1)]).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SkuNotFound(_))));
        assert!(stock_takes.get(&session.id).await.unwrap().items.is_empty());
    }
}
