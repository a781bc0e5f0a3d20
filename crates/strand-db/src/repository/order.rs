//! # Order Repository
//!
//! Orders, their frozen line items, and the status history.
//!
//! ## Order Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  orders                                                                 │
//! │  ├── id, order_number (2025-000042), status                            │
//! │  ├── customer / shipping / payment columns                             │
//! │  ├── currency, subtotal, shipping_cost, discount_amount, total         │
//! │  │                                                                      │
//! │  ├── order_items (ordered by position)                                 │
//! │  │   ├── sku_code, name, price_per_gram   ◄── frozen at sale           │
//! │  │   └── grams / quantity, assembly fee, line_total                    │
//! │  │                                                                      │
//! │  └── order_history (append-only)                                       │
//! │      └── pending → paid ...                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::DbResult;
use crate::uow::UnitOfWork;
use strand_core::{
    AssemblyFeeType, Currency, Customer, DeliveryMethod, Money, Order, OrderChannel, OrderHistoryEntry, OrderItem,
    OrderStatus, PaymentIntent, PaymentMethod, PaymentStatus, SaleMode, ShippingAddress,
};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    order_number: String,
    status: OrderStatus,
    email: String,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    delivery_method: DeliveryMethod,
    pickup_point: Option<String>,
    street: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    paid_at: Option<DateTime<Utc>>,
    currency: Currency,
    channel: OrderChannel,
    notes: Option<String>,
    subtotal: i64,
    shipping_cost: i64,
    discount_amount: i64,
    total: i64,
    created_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Order {
        Order {
            id: self.id,
            order_number: self.order_number,
            status: self.status,
            customer: Customer {
                email: self.email,
                first_name: self.first_name,
                last_name: self.last_name,
                phone: self.phone,
            },
            shipping: ShippingAddress {
                delivery_method: self.delivery_method,
                pickup_point: self.pickup_point,
                street: self.street,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
            },
            payment: PaymentIntent {
                method: self.payment_method,
                status: self.payment_status,
                paid_at: self.paid_at,
            },
            currency: self.currency,
            channel: self.channel,
            notes: self.notes,
            subtotal: Money::from_minor(self.subtotal),
            shipping_cost: Money::from_minor(self.shipping_cost),
            discount_amount: Money::from_minor(self.discount_amount),
            total: Money::from_minor(self.total),
            items,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    sku_id: String,
    sku_code: String,
    name: String,
    sale_mode: SaleMode,
    grams: Option<i64>,
    quantity: Option<i64>,
    price_per_gram: i64,
    ending: Option<String>,
    assembly_fee_type: Option<AssemblyFeeType>,
    assembly_fee_amount: i64,
    assembly_fee_total: i64,
    line_total: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            sku_id: row.sku_id,
            sku_code: row.sku_code,
            name: row.name,
            sale_mode: row.sale_mode,
            grams: row.grams,
            quantity: row.quantity,
            price_per_gram: Money::from_minor(row.price_per_gram),
            ending: row.ending,
            assembly_fee_type: row.assembly_fee_type,
            assembly_fee_amount: Money::from_minor(row.assembly_fee_amount),
            assembly_fee_total: Money::from_minor(row.assembly_fee_total),
            line_total: Money::from_minor(row.line_total),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: String,
    order_id: String,
    status: OrderStatus,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for OrderHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        OrderHistoryEntry {
            id: row.id,
            order_id: row.order_id,
            status: row.status,
            note: row.note,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Inserts the order header. Items go through [`insert_item`].
pub async fn insert_order(uow: &mut UnitOfWork, order: &Order) -> DbResult<()> {
    debug!(id = %order.id, order_number = %order.order_number, total = order.total.minor(), "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, status,
            email, first_name, last_name, phone,
            delivery_method, pickup_point, street, city, postal_code, country,
            payment_method, payment_status, paid_at,
            currency, channel, notes,
            subtotal, shipping_cost, discount_amount, total,
            created_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6, ?7,
            ?8, ?9, ?10, ?11, ?12, ?13,
            ?14, ?15, ?16,
            ?17, ?18, ?19,
            ?20, ?21, ?22, ?23,
            ?24
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(order.status)
    .bind(&order.customer.email)
    .bind(&order.customer.first_name)
    .bind(&order.customer.last_name)
    .bind(&order.customer.phone)
    .bind(order.shipping.delivery_method)
    .bind(&order.shipping.pickup_point)
    .bind(&order.shipping.street)
    .bind(&order.shipping.city)
    .bind(&order.shipping.postal_code)
    .bind(&order.shipping.country)
    .bind(order.payment.method)
    .bind(order.payment.status)
    .bind(order.payment.paid_at)
    .bind(order.currency)
    .bind(order.channel)
    .bind(&order.notes)
    .bind(order.subtotal.minor())
    .bind(order.shipping_cost.minor())
    .bind(order.discount_amount.minor())
    .bind(order.total.minor())
    .bind(order.created_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

/// Inserts one line item at `position` (0-based, request order).
pub async fn insert_item(uow: &mut UnitOfWork, item: &OrderItem, position: usize) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, sku_id, sku_code, name, sale_mode, grams, quantity,
            price_per_gram, ending, assembly_fee_type, assembly_fee_amount,
            assembly_fee_total, line_total, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.sku_id)
    .bind(&item.sku_code)
    .bind(&item.name)
    .bind(item.sale_mode)
    .bind(item.grams)
    .bind(item.quantity)
    .bind(item.price_per_gram.minor())
    .bind(&item.ending)
    .bind(item.assembly_fee_type)
    .bind(item.assembly_fee_amount.minor())
    .bind(item.assembly_fee_total.minor())
    .bind(item.line_total.minor())
    .bind(position as i64)
    .execute(uow.conn())
    .await?;

    Ok(())
}

/// Appends a status history entry.
pub async fn append_history(uow: &mut UnitOfWork, entry: &OrderHistoryEntry) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO order_history (id, order_id, status, note, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(&entry.id)
    .bind(&entry.order_id)
    .bind(entry.status)
    .bind(&entry.note)
    .bind(entry.created_at)
    .execute(uow.conn())
    .await?;

    Ok(())
}

// =============================================================================
// Reads
// =============================================================================

/// Gets an order with its items in request order.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(
        r#"
        SELECT id, order_number, status,
               email, first_name, last_name, phone,
               delivery_method, pickup_point, street, city, postal_code, country,
               payment_method, payment_status, paid_at,
               currency, channel, notes,
               subtotal, shipping_cost, discount_amount, total,
               created_at
        FROM orders WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items: Vec<OrderItemRow> = sqlx::query_as(
        r#"
        SELECT id, order_id, sku_id, sku_code, name, sale_mode, grams, quantity,
               price_per_gram, ending, assembly_fee_type, assembly_fee_amount,
               assembly_fee_total, line_total
        FROM order_items WHERE order_id = ?1 ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_order(items.into_iter().map(OrderItem::from).collect())))
}

/// Status history of an order, oldest first.
pub async fn history(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderHistoryEntry>> {
    let rows: Vec<HistoryRow> = sqlx::query_as(
        "SELECT id, order_id, status, note, created_at FROM order_history WHERE order_id = ?1 ORDER BY created_at, rowid",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(OrderHistoryEntry::from).collect())
}

/// Number of orders, for the health endpoint and tests.
pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(conn).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sku;
    use crate::repository::sku::tests::bulk_sku;
    use crate::{Database, DbConfig};

    fn order(id: &str) -> Order {
        Order {
            id: id.to_string(),
            order_number: "2025-000001".to_string(),
            status: OrderStatus::Pending,
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
            payment: PaymentIntent {
                method: PaymentMethod::BankTransfer,
                status: PaymentStatus::Pending,
                paid_at: None,
            },
            currency: Currency::Czk,
            channel: OrderChannel::Web,
            notes: None,
            subtotal: Money::from_minor(50_000),
            shipping_cost: Money::from_minor(8_900),
            discount_amount: Money::zero(),
            total: Money::from_minor(58_900),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_order_round_trip_keeps_item_order() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let a = bulk_sku("X-A", "M0001", 0);
        let b = bulk_sku("X-B", "M0002", 0);
        let header = order("o-1");

        let mut uow = db.begin().await.unwrap();
        sku::insert(&mut uow, &a).await.unwrap();
        sku::insert(&mut uow, &b).await.unwrap();
        insert_order(&mut uow, &header).await.unwrap();
        for (position, item) in [&b, &a].into_iter().enumerate() {
            let line = OrderItem {
                id: format!("i-{}", position),
                order_id: header.id.clone(),
                sku_id: item.id.clone(),
                sku_code: item.code.clone(),
                name: item.name.clone(),
                sale_mode: SaleMode::BulkByWeight,
                grams: Some(50),
                quantity: None,
                price_per_gram: Money::from_minor(500),
                ending: None,
                assembly_fee_type: None,
                assembly_fee_amount: Money::zero(),
                assembly_fee_total: Money::zero(),
                line_total: Money::from_minor(25_000),
            };
            insert_item(&mut uow, &line, position).await.unwrap();
        }
        append_history(
            &mut uow,
            &OrderHistoryEntry {
                id: "h-1".to_string(),
                order_id: header.id.clone(),
                status: OrderStatus::Pending,
                note: Some("created".to_string()),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        uow.commit().await.unwrap();

        let mut conn = db.connection().await.unwrap();
        let loaded = find(&mut conn, "o-1").await.unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].sku_code, "X-B");
        assert_eq!(loaded.items[1].sku_code, "X-A");
        assert_eq!(loaded.shipping.pickup_point.as_deref(), Some("Z-BOX Praha 4"));
        assert_eq!(loaded.total.minor(), 58_900);

        assert_eq!(history(&mut conn, "o-1").await.unwrap().len(), 1);
        assert!(find(&mut conn, "missing").await.unwrap().is_none());
        assert_eq!(count(&mut conn).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_order_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut uow = db.begin().await.unwrap();
        insert_order(&mut uow, &order("o-1")).await.unwrap();
        let err = insert_order(&mut uow, &order("o-2")).await.unwrap_err();
        assert!(err.is_unique_violation_on("orders.order_number"), "got {:?}", err);
    }
}
