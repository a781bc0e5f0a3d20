//! # HTTP Routes
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET    /health                                                         │
//! │                                                                         │
//! │  POST   /api/skus                      create one SKU                  │
//! │  GET    /api/skus                      list (?listed=true&limit=N)      │
//! │  POST   /api/skus/lengths              create one SKU per length       │
//! │  GET    /api/skus/{id}                                                  │
//! │  DELETE /api/skus/{id}                 only without history            │
//! │  PUT    /api/skus/{id}/price           override, or null to reprice    │
//! │  PUT    /api/skus/{id}/listing                                          │
//! │  POST   /api/skus/{id}/movements       manual IN / OUT / ADJUST        │
//! │  GET    /api/skus/{id}/movements       history (?limit=N)               │
//! │  GET    /api/skus/{id}/balance         ledger vs cached projection     │
//! │  POST   /api/skus/{id}/rebuild         rewrite projection from ledger  │
//! │  GET    /api/price-matrix                                               │
//! │  PUT    /api/price-matrix              upsert one row                  │
//! │  GET    /api/ledger/audit              drifted SKUs                    │
//! │                                                                         │
//! │  POST   /api/orders                    checkout                        │
//! │  GET    /api/orders/{id}                                                │
//! │  GET    /api/orders/{id}/history                                        │
//! │                                                                         │
//! │  POST   /api/stock-takes                                                │
//! │  GET    /api/stock-takes               list (?limit=N)                  │
//! │  GET    /api/stock-takes/{id}          session, items, differences     │
//! │  PATCH  /api/stock-takes/{id}          {status} or {items}             │
//! │  DELETE /api/stock-takes/{id}                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod order;
pub mod sku;
pub mod stock_take;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Default page size of list endpoints.
pub(crate) const DEFAULT_LIMIT: u32 = 100;

/// Largest page a list endpoint returns.
pub(crate) const MAX_LIMIT: u32 = 1000;

/// `?limit=N` for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct Page {
    pub limit: Option<u32>,
}

impl Page {
    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/skus", post(sku::create).get(sku::list))
        .route("/api/skus/lengths", post(sku::create_lengths))
        .route("/api/skus/{id}", get(sku::get_one).delete(sku::delete))
        .route("/api/skus/{id}/price", put(sku::update_price))
        .route("/api/skus/{id}/listing", put(sku::update_listing))
        .route("/api/skus/{id}/movements", post(sku::record_movement).get(sku::history))
        .route("/api/skus/{id}/balance", get(sku::balance))
        .route("/api/skus/{id}/rebuild", post(sku::rebuild))
        .route("/api/price-matrix", get(sku::price_matrix).put(sku::upsert_price))
        .route("/api/ledger/audit", get(sku::audit))
        .route("/api/orders", post(order::create))
        .route("/api/orders/{id}", get(order::get_one))
        .route("/api/orders/{id}/history", get(order::history))
        .route("/api/stock-takes", post(stock_take::create).get(stock_take::list))
        .route(
            "/api/stock-takes/{id}",
            get(stock_take::get_one)
                .patch(stock_take::update)
                .delete(stock_take::delete),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "status": "unavailable" })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::Value;
    use strand_db::{Database, DbConfig};
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::notify::Notifier;

    pub(crate) async fn app() -> (Router, AppState) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(db, &ServerConfig::default(), Notifier::disabled());
        (router(state.clone()), state)
    }

    /// Sends one request and returns the status with the decoded JSON body
    /// (`Value::Null` when empty).
    pub(crate) async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app().await;
        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[test]
    fn test_page_limit_clamped() {
        assert_eq!(Page::default().limit(), DEFAULT_LIMIT);
        assert_eq!(Page { limit: Some(0) }.limit(), 1);
        assert_eq!(Page { limit: Some(50_000) }.limit(), MAX_LIMIT);
    }
}
