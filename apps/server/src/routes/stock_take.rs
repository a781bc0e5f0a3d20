//! Stock-take sessions.
//!
//! `PATCH /api/stock-takes/{id}` takes exactly one of `status` or `items`;
//! `{"status": "COMPLETED"}` reconciles the ledger to the counts.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use strand_core::stocktake::{ItemCount, NewStockTake};
use strand_core::{StockTake, StockTakeItem, StockTakeStatus};
use strand_db::StockTakeWithItems;

use crate::error::{ApiError, ApiResult};
use crate::routes::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTakePatch {
    pub status: Option<StockTakeStatus>,
    pub items: Option<Vec<ItemCount>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: StockTakeItem,
    pub difference_grams: i64,
}

/// A session with its items and their differences.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockTakeView {
    #[serde(flatten)]
    pub session: StockTake,
    pub items: Vec<ItemView>,
    pub total_difference_grams: i64,
}

impl From<StockTakeWithItems> for StockTakeView {
    fn from(loaded: StockTakeWithItems) -> Self {
        let items: Vec<ItemView> = loaded
            .items
            .into_iter()
            .map(|item| ItemView {
                difference_grams: item.difference(),
                item,
            })
            .collect();
        StockTakeView {
            total_difference_grams: items.iter().map(|i| i.difference_grams).sum(),
            session: loaded.session,
            items,
        }
    }
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewStockTake>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StockTake>)> {
    let Json(input) = payload?;
    let session = state.stock_takes.create(input).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn list(State(state): State<AppState>, Query(page): Query<Page>) -> ApiResult<Json<Vec<StockTake>>> {
    Ok(Json(state.stock_takes.list(page.limit()).await?))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<StockTakeView>> {
    Ok(Json(state.stock_takes.get(&id).await?.into()))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StockTakePatch>, JsonRejection>,
) -> ApiResult<Json<StockTakeView>> {
    let Json(patch) = payload?;

    match (patch.status, patch.items) {
        (Some(status), None) => {
            state.stock_takes.transition(&id, status).await?;
        }
        (None, Some(items)) => {
            state
                .stock_takes
                .add_items(&id, items)
                .await
                .map_err(ApiError::referenced)?;
        }
        _ => return Err(ApiError::validation("expected exactly one of 'status' or 'items'")),
    }

    Ok(Json(state.stock_takes.get(&id).await?.into()))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.stock_takes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::routes::tests::{app, send};

    async fn sku_with(app: &axum::Router, grams: i64) -> String {
        send(
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
        let (_, created) = send(
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
        created["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_count_and_complete() {
        let (app, _) = app().await;
        let sku_id = sku_with(&app, 300).await;

        let (status, session) = send(&app, Method::POST, "/api/stock-takes", Some(json!({ "name": "Shelf A" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["status"], "PLANNED");
        let uri = format!("/api/stock-takes/{}", session["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "IN_PROGRESS" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, view) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "items": [{ "skuId": sku_id, "countedGrams": 280, "location": "A1" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["items"][0]["expectedGrams"], 300);
        assert_eq!(view["items"][0]["differenceGrams"], -20);
        assert_eq!(view["totalDifferenceGrams"], -20);

        let (status, view) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "COMPLETED" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["status"], "COMPLETED");

        let (_, report) = send(&app, Method::GET, &format!("/api/skus/{}/balance", sku_id), None).await;
        assert_eq!(report["ledgerGrams"], 280);

        // Completing again and deleting are both refused
        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "COMPLETED" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, report) = send(&app, Method::GET, &format!("/api/skus/{}/balance", sku_id), None).await;
        assert_eq!(report["ledgerGrams"], 280);
    }

    #[tokio::test]
    async fn test_patch_needs_one_field() {
        let (app, _) = app().await;
        let (_, session) = send(&app, Method::POST, "/api/stock-takes", Some(json!({}))).await;
        let uri = format!("/api/stock-takes/{}", session["id"].as_str().unwrap());

        let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "items": [{ "skuId": "ghost", "countedGrams": 10 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "SKU_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cancelled_session_can_be_deleted() {
        let (app, _) = app().await;
        let (_, session) = send(&app, Method::POST, "/api/stock-takes", Some(json!({ "name": "Trial" }))).await;
        let uri = format!("/api/stock-takes/{}", session["id"].as_str().unwrap());

        let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({ "status": "CANCELLED" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
