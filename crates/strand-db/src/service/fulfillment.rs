//! # Fulfillment Service
//!
//! Turns a checkout request into a committed, stock-backed order.
//!
//! ## One Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.validate()                       (no store access)            │
//! │                                                                         │
//! │  BEGIN ── write lock ───────────────────────────────────────────┐      │
//! │    1. load every referenced SKU (one query)    SkuNotFound      │      │
//! │    2. price lines, shipping, discount                           │      │
//! │    3. re-check stock, summed per SKU           InsufficientStock│      │
//! │    4. INSERT order                                               │      │
//! │    5. OUT movement + projection per line       ref_order_id     │      │
//! │    6. INSERT order_items (frozen snapshots)                     │      │
//! │    7. INSERT order_history                                       │      │
//! │  COMMIT ────────────────────────────────────────────────────────┘      │
//! │                                                                         │
//! │  caller: notify (best effort, after commit)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any error between BEGIN and COMMIT drops the unit of work, which rolls
//! every statement back.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use tracing::{debug, info, instrument};

use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::{order, sequence, sku};
use crate::service::apply_movement;
use strand_core::checkout::{self, CheckoutRequest};
use strand_core::codegen::format_order_number;
use strand_core::ledger::{MovementKind, MovementMetadata};
use strand_core::{CoreError, FulfillmentSettings, Order, OrderHistoryEntry, OrderItem, Sku};

#[derive(Debug, Clone)]
pub struct FulfillmentService {
    db: Database,
    settings: FulfillmentSettings,
}

impl FulfillmentService {
    pub fn new(db: Database, settings: FulfillmentSettings) -> Self {
        FulfillmentService { db, settings }
    }

    /// Prices, stock-checks and records an order, all or nothing.
    #[instrument(skip(self, request), fields(lines = request.items.len(), currency = ?request.currency))]
    pub async fn fulfill_order(&self, request: CheckoutRequest) -> DbResult<Order> {
        let request = request.validate(&self.settings)?;
        let sku_ids = request.sku_ids();

        let mut uow = self.db.begin().await?;

        let mut skus: HashMap<String, Sku> = sku::find_many(uow.conn(), &sku_ids)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        if let Some(missing) = sku_ids.iter().find(|id| !skus.contains_key(*id)) {
            return Err(CoreError::SkuNotFound(missing.clone()).into());
        }

        let quote = checkout::quote(&request, &skus, &self.settings)?;
        checkout::check_availability(&quote.lines, &skus)?;

        let now = Utc::now();
        let order_id = uuid::Uuid::new_v4().to_string();
        let number = sequence::next_value(&mut uow, &sequence::order_number_sequence(now.year())).await?;
        let status = request.payment.status.order_status();

        let items: Vec<OrderItem> = quote
            .lines
            .iter()
            .map(|line| OrderItem {
                id: uuid::Uuid::new_v4().to_string(),
                order_id: order_id.clone(),
                sku_id: line.sku_id.clone(),
                sku_code: line.sku_code.clone(),
                name: line.name.clone(),
                sale_mode: line.sale_mode,
                grams: line.grams,
                quantity: line.quantity,
                price_per_gram: line.price_per_gram,
                ending: line.ending.clone(),
                assembly_fee_type: line.assembly_fee_type,
                assembly_fee_amount: line.assembly_fee_amount,
                assembly_fee_total: line.assembly_fee_total,
                line_total: line.line_total,
            })
            .collect();

        let placed = Order {
            id: order_id,
            order_number: format_order_number(now.year(), number),
            status,
            customer: request.customer,
            shipping: request.shipping,
            payment: request.payment,
            currency: request.currency,
            channel: request.channel,
            notes: request.notes,
            subtotal: quote.subtotal,
            shipping_cost: quote.shipping_cost,
            discount_amount: quote.discount_amount,
            total: quote.total,
            items,
            created_at: now,
        };

        order::insert_order(&mut uow, &placed).await?;

        for line in &quote.lines {
            let current = skus
                .get_mut(&line.sku_id)
                .ok_or_else(|| CoreError::SkuNotFound(line.sku_id.clone()))?;
            let (movement, next) = apply_movement(
                &mut uow,
                current,
                MovementKind::Out {
                    grams: line.stock_grams,
                },
                MovementMetadata::for_order(&placed.id),
                now,
            )
            .await?;
            debug!(sku = %current.code, grams = movement.grams, remaining = next.balance_grams(), "Line deducted");
            // Later lines of the same SKU see this deduction.
            current.stock = next;
        }

        for (position, item) in placed.items.iter().enumerate() {
            order::insert_item(&mut uow, item, position).await?;
        }

        order::append_history(
            &mut uow,
            &OrderHistoryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                order_id: placed.id.clone(),
                status,
                note: Some(format!("Order created via {:?}", placed.channel)),
                created_at: now,
            },
        )
        .await?;

        uow.commit().await?;

        info!(
            order_id = %placed.id,
            order_number = %placed.order_number,
            total = %placed.total.display_in(placed.currency),
            status = ?placed.status,
            "Order committed"
        );
        Ok(placed)
    }

    /// Gets a stored order with its items.
    pub async fn get_order(&self, order_id: &str) -> DbResult<Order> {
        let mut conn = self.db.connection().await?;
        order::find(&mut conn, order_id)
            .await?
            .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()).into())
    }

    pub async fn order_history(&self, order_id: &str) -> DbResult<Vec<OrderHistoryEntry>> {
        let mut conn = self.db.connection().await?;
        order::history(&mut conn, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::ledger;
    use crate::service::catalog::tests::{bulk_input, piece_input, service as catalog_service};
    use crate::service::CatalogService;
    use strand_core::catalog::NewSku;
    use strand_core::checkout::CheckoutLine;
    use strand_core::{
        AssemblyFeeType, Currency, Customer, DeliveryMethod, Money, OrderChannel, OrderStatus, PaymentIntent,
        PaymentMethod, PaymentStatus, SaleMode, ShippingAddress,
    };

    async fn setup() -> (CatalogService, FulfillmentService) {
        let catalog = catalog_service().await;
        let fulfillment = FulfillmentService::new(catalog.database().clone(), FulfillmentSettings::default());
        (catalog, fulfillment)
    }

    fn bulk_line(sku_id: &str, grams: i64) -> CheckoutLine {
        CheckoutLine {
            sku_id: sku_id.to_string(),
            sale_mode: SaleMode::BulkByWeight,
            grams: Some(grams),
            quantity: None,
            ending: None,
            assembly_fee_type: None,
            assembly_fee_amount: None,
        }
    }

    fn request(items: Vec<CheckoutLine>) -> CheckoutRequest {
        CheckoutRequest {
            customer: Customer {
                email: "jana@example.cz".to_string(),
                first_name: "Jana".to_string(),
                last_name: "Nováková".to_string(),
                phone: None,
            },
            shipping: ShippingAddress {
                delivery_method: DeliveryMethod::PickupPoint,
                pickup_point: Some("Z-BOX Praha 4".to_string()),
                street: None,
                city: None,
                postal_code: None,
                country: Some("CZ".to_string()),
            },
            items,
            payment: PaymentIntent {
                method: PaymentMethod::BankTransfer,
                status: PaymentStatus::Pending,
                paid_at: None,
            },
            currency: Currency::Czk,
            channel: OrderChannel::Web,
            notes: None,
            discount_amount: None,
        }
    }

    async fn stocked(catalog: &CatalogService, grams: i64) -> Sku {
        catalog
            .create_sku(NewSku {
                opening_stock_grams: Some(grams),
                ..bulk_input(20)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_order_deducts_stock() {
        let (catalog, fulfillment) = setup().await;
        let item = stocked(&catalog, 500).await;

        let placed = fulfillment.fulfill_order(request(vec![bulk_line(&item.id, 200)])).await.unwrap();

        // 200 g × 5 Kč + 89 Kč pickup point
        assert_eq!(placed.subtotal, Money::from_major_minor(1000, 0));
        assert_eq!(placed.total, Money::from_major_minor(1089, 0));
        assert_eq!(placed.status, OrderStatus::Pending);
        assert!(placed.order_number.ends_with("-000001"));

        assert_eq!(catalog.current_balance(&item.id).await.unwrap(), 300);
        assert!(catalog.verify_balance(&item.id).await.unwrap().is_consistent());

        let stored = fulfillment.get_order(&placed.id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].sku_code, item.code);

        let mut conn = catalog.database().connection().await.unwrap();
        let movements = ledger::for_order(&mut conn, &placed.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].signed_grams(), -200);
        drop(conn);

        assert_eq!(fulfillment.order_history(&placed.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lines_of_same_sku_are_summed() {
        let (catalog, fulfillment) = setup().await;
        let item = stocked(&catalog, 300).await;

        let err = fulfillment
            .fulfill_order(request(vec![bulk_line(&item.id, 200), bulk_line(&item.id, 200)]))
            .await
            .unwrap_err();
        assert_eq!(err.as_domain().and_then(CoreError::shortfall), Some(100));
        assert_eq!(catalog.current_balance(&item.id).await.unwrap(), 300);

        let placed = fulfillment
            .fulfill_order(request(vec![bulk_line(&item.id, 100), bulk_line(&item.id, 200)]))
            .await
            .unwrap();
        assert_eq!(placed.items.len(), 2);
        assert_eq!(catalog.current_balance(&item.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_sku_persists_nothing() {
        let (catalog, fulfillment) = setup().await;
        let item = stocked(&catalog, 500).await;

        let err = fulfillment
            .fulfill_order(request(vec![bulk_line(&item.id, 100), bulk_line("ghost", 100)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SkuNotFound(ref id)) if id == "ghost"));

        let mut conn = catalog.database().connection().await.unwrap();
        assert_eq!(order::count(&mut conn).await.unwrap(), 0);
        drop(conn);
        assert_eq!(catalog.current_balance(&item.id).await.unwrap(), 500);
    }

    #[tokio::test]
    async fn test_piece_sells_once_with_fee() {
        let (catalog, fulfillment) = setup().await;
        let piece = catalog
            .create_sku(NewSku {
                opening_stock_grams: Some(120),
                ..piece_input(120)
            })
            .await
            .unwrap();

        let line = CheckoutLine {
            sku_id: piece.id.clone(),
            sale_mode: SaleMode::PieceByWeight,
            grams: None,
            quantity: Some(1),
            ending: Some("keratin".to_string()),
            assembly_fee_type: Some(AssemblyFeeType::Flat),
            assembly_fee_amount: Some(Money::from_major_minor(300, 0)),
        };
        let mut paid = request(vec![line.clone()]);
        paid.payment.status = PaymentStatus::Paid;

        let placed = fulfillment.fulfill_order(paid).await.unwrap();
        // 120 g × 5 Kč + 300 Kč fee
        assert_eq!(placed.subtotal, Money::from_major_minor(900, 0));
        assert_eq!(placed.status, OrderStatus::Paid);
        assert_eq!(placed.items[0].ending.as_deref(), Some("keratin"));

        let sold = catalog.get_sku(&piece.id).await.unwrap();
        assert_eq!(sold.stock.balance_grams(), 0);

        let err = fulfillment.fulfill_order(request(vec![line])).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
    }

    #[tokio::test]
    async fn test_validation_runs_before_store() {
        let (_, fulfillment) = setup().await;

        let mut no_pickup = request(vec![bulk_line("any", 100)]);
        no_pickup.shipping.pickup_point = None;
        let err = fulfillment.fulfill_order(no_pickup).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = fulfillment.fulfill_order(request(Vec::new())).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_missing_order() {
        let (_, fulfillment) = setup().await;
        let err = fulfillment.get_order("nope").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::OrderNotFound(_))));
    }
}
