//! # strand-db: Storage Layer for Strand
//!
//! SQLite persistence for the inventory ledger, the SKU catalog, orders and
//! stock-takes, plus the services that run each business operation in one
//! unit of work.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Strand Data Flow                                 │
//! │                                                                         │
//! │  HTTP handler (POST /api/orders)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     strand-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌────────────────────┐   │   │
//! │  │   │   Services   │  │ Repositories │  │  Database / Uow    │   │   │
//! │  │   │              │  │              │  │                    │   │   │
//! │  │   │ Catalog      │─►│ sku, ledger  │─►│ SqlitePool (WAL)   │   │   │
//! │  │   │ Fulfillment  │  │ order, price │  │ UnitOfWork         │   │   │
//! │  │   │ StockTake    │  │ stock_take   │  │ migrations         │   │   │
//! │  │   └──────┬───────┘  └──────────────┘  └────────────────────┘   │   │
//! │  │          │ rules                                                │   │
//! │  │          ▼                                                      │   │
//! │  │   strand-core (pricing, ledger, checkout, stocktake)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/strand/strand.db                               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`uow`] - Unit of work (one write transaction holding the lock)
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Per-table SQL
//! - [`service`] - Business operations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strand_db::{CatalogService, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("strand.db")).await?;
//! let catalog = CatalogService::new(db.clone(), CatalogSettings::default());
//!
//! let sku = catalog.create_sku(input).await?;
//! catalog.record_movement(&sku.id, MovementKind::In { grams: 500 }, metadata).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;
pub mod uow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use uow::UnitOfWork;

pub use service::stock_take::StockTakeWithItems;
pub use service::{CatalogService, FulfillmentService, StockTakeService};
