//! Checkout and order lookup.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use strand_core::checkout::CheckoutRequest;
use strand_core::{DeliveryMethod, Money, Order, OrderHistoryEntry, OrderStatus};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::notify::OrderConfirmation;
use crate::state::AppState;

/// Response of a successful checkout.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPlaced {
    pub order_id: String,
    pub order_number: String,
    pub email: String,
    pub total: Money,
    pub status: OrderStatus,
    pub delivery_method: DeliveryMethod,
    pub has_pickup_point: bool,
}

impl From<&Order> for OrderPlaced {
    fn from(order: &Order) -> Self {
        OrderPlaced {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            email: order.customer.email.clone(),
            total: order.total,
            status: order.status,
            delivery_method: order.shipping.delivery_method,
            has_pickup_point: order.shipping.pickup_point.is_some(),
        }
    }
}

/// `POST /api/orders`
///
/// The confirmation is queued only once the order has committed.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OrderPlaced>)> {
    let Json(request) = payload?;
    debug!(lines = request.items.len(), "Checkout received");

    let order = state
        .fulfillment
        .fulfill_order(request)
        .await
        .map_err(ApiError::referenced)?;

    state.notifier.notify(OrderConfirmation::from(&order));
    Ok((StatusCode::CREATED, Json(OrderPlaced::from(&order))))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    Ok(Json(state.fulfillment.get_order(&id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<OrderHistoryEntry>>> {
    Ok(Json(state.fulfillment.order_history(&id).await?))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    use crate::routes::tests::{app, send};

    async fn stocked_sku(app: &axum::Router, grams: i64) -> String {
        let (status, _) = send(
            app,
            Method::PUT,
            "/api/price-matrix",
            Some(json!({
                "category": "UNDYED",
                "tier": "STANDARD",
                "shadeBand": "1-4",
                "lengthCm": 20,
                "pricePerGram": { "czk": 500, "eur": 20 }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, created) = send(
            app,
            Method::POST,
            "/api/skus",
            Some(json!({
                "category": "UNDYED",
                "tier": "STANDARD",
                "shade": 3,
                "structure": "STRAIGHT",
                "lengthCm": 20,
                "saleMode": "BULK_BY_WEIGHT",
                "openingStockGrams": grams
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        created["id"].as_str().unwrap().to_string()
    }

    fn checkout(sku_id: &str, grams: i64, pickup_point: Option<&str>) -> Value {
        json!({
            "customer": { "email": "lucie@example.cz", "firstName": "Lucie", "lastName": "Dvořáková" },
            "shipping": { "deliveryMethod": "PICKUP_POINT", "pickupPoint": pickup_point, "country": "CZ" },
            "items": [{ "skuId": sku_id, "saleMode": "BULK_BY_WEIGHT", "grams": grams }],
            "payment": { "method": "BANK_TRANSFER" },
            "currency": "CZK"
        })
    }

    #[tokio::test]
    async fn test_checkout_commits_order() {
        let (app, _) = app().await;
        let sku_id = stocked_sku(&app, 500).await;

        let (status, placed) = send(&app, Method::POST, "/api/orders", Some(checkout(&sku_id, 200, Some("Z-BOX Praha 7")))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(placed["email"], "lucie@example.cz");
        assert_eq!(placed["total"], 108_900);
        assert_eq!(placed["status"], "pending");
        assert_eq!(placed["deliveryMethod"], "PICKUP_POINT");
        assert_eq!(placed["hasPickupPoint"], true);

        let order_id = placed["orderId"].as_str().unwrap();
        let (status, order) = send(&app, Method::GET, &format!("/api/orders/{}", order_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(order["items"][0]["grams"], 200);

        let (_, history) = send(&app, Method::GET, &format!("/api/orders/{}/history", order_id), None).await;
        assert_eq!(history.as_array().unwrap().len(), 1);

        let (_, report) = send(&app, Method::GET, &format!("/api/skus/{}/balance", sku_id), None).await;
        assert_eq!(report["ledgerGrams"], 300);
    }

    #[tokio::test]
    async fn test_checkout_failures_are_400() {
        let (app, _) = app().await;
        let sku_id = stocked_sku(&app, 100).await;

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(checkout(&sku_id, 300, Some("Z-BOX")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INSUFFICIENT_STOCK");

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(checkout("no-such-sku", 100, Some("Z-BOX")))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "SKU_NOT_FOUND");

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(checkout(&sku_id, 100, None))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        // Nothing was deducted by the failed attempts
        let (_, report) = send(&app, Method::GET, &format!("/api/skus/{}/balance", sku_id), None).await;
        assert_eq!(report["ledgerGrams"], 100);
    }

    #[tokio::test]
    async fn test_oversized_fee_is_400() {
        let (app, _) = app().await;
        let sku_id = stocked_sku(&app, 500).await;

        let mut body = checkout(&sku_id, 100, Some("Z-BOX"));
        body["items"][0]["assemblyFeeType"] = json!("PER_UNIT");
        body["items"][0]["assemblyFeeAmount"] = json!(i64::MAX / 10);

        let (status, body) = send(&app, Method::POST, "/api/orders", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (_, report) = send(&app, Method::GET, &format!("/api/skus/{}/balance", sku_id), None).await;
        assert_eq!(report["ledgerGrams"], 500);
    }

    #[tokio::test]
    async fn test_unknown_order_is_404() {
        let (app, _) = app().await;
        let (status, body) = send(&app, Method::GET, "/api/orders/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }
}
