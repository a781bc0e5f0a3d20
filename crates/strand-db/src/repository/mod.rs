//! # Repository Module
//!
//! SQL for each table family, as free functions.
//!
//! ## Calling Convention
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Reads                                Writes                           │
//! │  ─────                                ──────                           │
//! │  fn find(conn: &mut SqliteConnection) fn insert(uow: &mut UnitOfWork)  │
//! │                                                                         │
//! │  outside a unit:  &mut *db.connection().await?                         │
//! │  inside a unit:   uow.conn()        ◄── sees the unit's own writes     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! A write can only be issued through a [`UnitOfWork`](crate::UnitOfWork),
//! so every ledger append and its projection update share one transaction.
//!
//! ## Available Repositories
//!
//! - [`sku`] - SKU registry and cached stock projection
//! - [`ledger`] - Append-only stock movements and balances
//! - [`price_matrix`] - Per-gram prices by attributes
//! - [`order`] - Orders, items, status history
//! - [`stock_take`] - Count sessions and items
//! - [`sequence`] - Short-code and order-number counters

pub mod ledger;
pub mod order;
pub mod price_matrix;
pub mod sequence;
pub mod sku;
pub mod stock_take;
