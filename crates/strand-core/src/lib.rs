//! # strand-core: Pure Inventory Logic for Strand
//!
//! This crate is the **heart** of Strand. It holds every inventory and
//! checkout rule as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Strand Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Admin UI / Storefront (external)                   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP/JSON                              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  strand-server (axum routes)                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               strand-db (units of work, services)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls                                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ strand-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ codegen │ │ pricing │ │ catalog │ │ ledger  │ │checkout │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Sku, StockMovement, Order, StockTake, ...)
//! - [`money`] - Money in integer minor units, the two currencies
//! - [`error`] - Domain error types and [`ErrorKind`]
//! - [`validation`] - Field validators
//! - [`codegen`] - SKU codes, short codes, order numbers
//! - [`pricing`] - Shade bands and price resolution
//! - [`catalog`] - SKU creation input and drafts
//! - [`ledger`] - Movement rules and balance checks
//! - [`checkout`] - Cart pricing and stock re-check
//! - [`stocktake`] - Count session state machine
//! - [`settings`] - Catalog and fulfillment settings
//!
//! ## Example Usage
//!
//! ```rust
//! use strand_core::ledger::{apply, MovementKind};
//! use strand_core::money::Money;
//! use strand_core::types::StockState;
//!
//! let state = StockState::Bulk { available_grams: 500, min_order_grams: 50, step_grams: 10 };
//! let sale = apply("X-NB-STD-O03-SR-20-20250101-01", &state, MovementKind::Out { grams: 200 }).unwrap();
//! assert_eq!(sale.next.balance_grams(), 300);
//!
//! // 5 Kč per gram × 200 g
//! assert_eq!(Money::from_minor(500).multiply_quantity(200).minor(), 100_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod checkout;
pub mod codegen;
pub mod error;
pub mod ledger;
pub mod money;
pub mod pricing;
pub mod settings;
pub mod stocktake;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use strand_core::Money` instead of
// `use strand_core::money::Money`

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{Currency, Money};
pub use settings::{CatalogSettings, FulfillmentSettings};
pub use types::*;
