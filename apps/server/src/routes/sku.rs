//! SKU catalog, manual movements and ledger maintenance.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use strand_core::catalog::{LengthEntry, NewSku};
use strand_core::ledger::{BalanceCheck, MovementKind, MovementMetadata};
use strand_core::{PriceMatrixEntry, PricePerGram, PriceSource, Sku, StockMovement};

use crate::error::ApiResult;
use crate::routes::{Page, DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;

// =============================================================================
// DTOs
// =============================================================================

/// Response of SKU creation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuCreated {
    pub id: String,
    pub code: String,
    pub short_code: String,
    pub name: String,
    pub price_per_gram: PricePerGram,
    pub price_source: PriceSource,
}

impl From<Sku> for SkuCreated {
    fn from(sku: Sku) -> Self {
        SkuCreated {
            id: sku.id,
            code: sku.code,
            short_code: sku.short_code,
            name: sku.name,
            price_per_gram: sku.price_per_gram,
            price_source: sku.price_source,
        }
    }
}

/// `POST /api/skus/lengths`. `base.lengthCm` is replaced by each entry's.
#[derive(Debug, Deserialize)]
pub struct CreateLengthsRequest {
    pub base: NewSku,
    pub lengths: Vec<LengthEntry>,
}

/// `POST /api/skus/{id}/movements`: `{"type": "IN", "grams": 500, "reason": ...}`.
#[derive(Debug, Deserialize)]
pub struct MovementRequest {
    #[serde(flatten)]
    pub kind: MovementKind,
    #[serde(flatten)]
    pub metadata: MovementMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceUpdate {
    /// `null` reprices from the matrix.
    #[serde(default)]
    pub price_per_gram: Option<PricePerGram>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    pub is_listed: bool,
    pub listing_priority: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub listed: Option<bool>,
    pub limit: Option<u32>,
}

/// Ledger balance against the cached projection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    #[serde(flatten)]
    pub check: BalanceCheck,
    pub consistent: bool,
    pub drift: i64,
}

impl From<BalanceCheck> for BalanceReport {
    fn from(check: BalanceCheck) -> Self {
        BalanceReport {
            consistent: check.is_consistent(),
            drift: check.drift(),
            check,
        }
    }
}

// =============================================================================
// Catalog
// =============================================================================

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewSku>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SkuCreated>)> {
    let Json(input) = payload?;
    let sku = state.catalog.create_sku(input).await?;
    Ok((StatusCode::CREATED, Json(sku.into())))
}

pub async fn create_lengths(
    State(state): State<AppState>,
    payload: Result<Json<CreateLengthsRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<SkuCreated>>)> {
    let Json(request) = payload?;
    let created = state
        .catalog
        .create_skus_for_lengths(request.base, request.lengths)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into_iter().map(SkuCreated::from).collect())))
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Json<Vec<Sku>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let skus = state.catalog.list_skus(query.listed.unwrap_or(false), limit).await?;
    Ok(Json(skus))
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Sku>> {
    Ok(Json(state.catalog.get_sku(&id).await?))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.catalog.delete_unused(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<PriceUpdate>, JsonRejection>,
) -> ApiResult<Json<Sku>> {
    let Json(update) = payload?;
    Ok(Json(state.catalog.update_price(&id, update.price_per_gram).await?))
}

pub async fn update_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ListingUpdate>, JsonRejection>,
) -> ApiResult<Json<Sku>> {
    let Json(update) = payload?;
    let priority = match update.listing_priority {
        Some(priority) => priority,
        None => state.catalog.get_sku(&id).await?.listing_priority,
    };
    Ok(Json(state.catalog.update_listing(&id, update.is_listed, priority).await?))
}

// =============================================================================
// Ledger
// =============================================================================

pub async fn record_movement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MovementRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<StockMovement>)> {
    let Json(request) = payload?;
    let movement = state
        .catalog
        .record_movement(&id, request.kind, request.metadata)
        .await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    Ok(Json(state.catalog.history(&id, page.limit()).await?))
}

pub async fn balance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<BalanceReport>> {
    Ok(Json(state.catalog.verify_balance(&id).await?.into()))
}

/// Returns the check as found before the rewrite.
pub async fn rebuild(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<BalanceReport>> {
    Ok(Json(state.catalog.rebuild_projection(&id).await?.into()))
}

pub async fn audit(State(state): State<AppState>) -> ApiResult<Json<Vec<BalanceReport>>> {
    let drifted = state.catalog.audit_all().await?;
    Ok(Json(drifted.into_iter().map(BalanceReport::from).collect()))
}

// =============================================================================
// Price Matrix
// =============================================================================

pub async fn price_matrix(State(state): State<AppState>) -> ApiResult<Json<Vec<PriceMatrixEntry>>> {
    Ok(Json(state.catalog.price_matrix().await?))
}

pub async fn upsert_price(
    State(state): State<AppState>,
    payload: Result<Json<PriceMatrixEntry>, JsonRejection>,
) -> ApiResult<Json<PriceMatrixEntry>> {
    let Json(entry) = payload?;
    state.catalog.upsert_price(entry.clone()).await?;
    Ok(Json(entry))
}
