//! Shared handler state.

use strand_db::{CatalogService, Database, FulfillmentService, StockTakeService};

use crate::config::ServerConfig;
use crate::notify::Notifier;

/// Everything a handler can reach. Every field is a cheap clone over the
/// same pool.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub catalog: CatalogService,
    pub fulfillment: FulfillmentService,
    pub stock_takes: StockTakeService,
    pub notifier: Notifier,
}

impl AppState {
    pub fn new(db: Database, config: &ServerConfig, notifier: Notifier) -> Self {
        AppState {
            catalog: CatalogService::new(db.clone(), config.catalog.clone()),
            fulfillment: FulfillmentService::new(db.clone(), config.fulfillment.clone()),
            stock_takes: StockTakeService::new(db.clone()),
            notifier,
            db,
        }
    }
}
