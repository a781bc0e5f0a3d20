//! # Domain Types
//!
//! Core domain types used throughout Strand.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sku        │   │  StockMovement  │   │     Order       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  sku_id (FK)    │   │  id (UUID)      │       │
//! │  │  code (unique)  │   │  type IN/OUT/ADJ│──►│  order_number   │       │
//! │  │  short_code     │   │  grams, direction│  │  total          │       │
//! │  │  stock: State   │   │  ref_order_id   │   │  items[]        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockState    │   │ PriceMatrixEntry│   │   StockTake     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Bulk {grams}   │   │  cat/tier/band/ │   │  PLANNED →      │       │
//! │  │  Piece {weight, │   │  length → CZK,  │   │  IN_PROGRESS →  │       │
//! │  │   in_stock}     │   │  EUR per gram   │   │  COMPLETED      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every SKU has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - `code` / `short_code`: human-readable, printed on labels, never reused

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, Money};

// =============================================================================
// Descriptive Enums
// =============================================================================

/// Whether the hair was coloured after sourcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Undyed,
    Dyed,
}

/// Quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Standard,
    Luxe,
    Platinum,
}

impl Tier {
    pub const fn label(&self) -> &'static str {
        match self {
            Tier::Standard => "Standard",
            Tier::Luxe => "Luxe",
            Tier::Platinum => "Platinum",
        }
    }
}

/// Hair structure (texture).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Structure {
    Straight,
    Wavy,
    Curly,
}

impl Structure {
    pub const fn label(&self) -> &'static str {
        match self {
            Structure::Straight => "straight",
            Structure::Wavy => "wavy",
            Structure::Curly => "curly",
        }
    }
}

// =============================================================================
// Shade & Shade Band
// =============================================================================

/// Hair shade on the 1 (darkest) to 10 (lightest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(try_from = "i64", into = "i64")]
pub struct Shade(u8);

impl Shade {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 10;

    /// Creates a shade, rejecting values outside 1-10.
    pub fn new(value: i64) -> CoreResult<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Shade(value as u8))
        } else {
            Err(CoreError::InvalidShade(value))
        }
    }

    #[inline]
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Shade {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Shade::new(value)
    }
}

impl From<Shade> for i64 {
    fn from(shade: Shade) -> i64 {
        shade.0 as i64
    }
}

/// Inclusive range of shades sharing one price-matrix row, stored as `"5-10"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShadeBand {
    pub from: u8,
    pub to: u8,
}

impl ShadeBand {
    pub const fn new(from: u8, to: u8) -> Self {
        ShadeBand { from, to }
    }

    pub fn contains(&self, shade: Shade) -> bool {
        (self.from..=self.to).contains(&shade.value())
    }
}

impl fmt::Display for ShadeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

impl FromStr for ShadeBand {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "shadeBand".to_string(),
            reason: format!("expected FROM-TO, got '{}'", s),
        };
        let (from, to) = s.trim().split_once('-').ok_or_else(invalid)?;
        let from: u8 = from.trim().parse().map_err(|_| invalid())?;
        let to: u8 = to.trim().parse().map_err(|_| invalid())?;
        if from == 0 || from > to || to as i64 > Shade::MAX {
            return Err(invalid());
        }
        Ok(ShadeBand { from, to })
    }
}

impl TryFrom<String> for ShadeBand {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShadeBand> for String {
    fn from(band: ShadeBand) -> String {
        band.to_string()
    }
}

// =============================================================================
// Pricing Types
// =============================================================================

/// Price per gram in both storefront currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricePerGram {
    pub czk: Money,
    pub eur: Money,
}

impl PricePerGram {
    pub const fn new(czk: Money, eur: Money) -> Self {
        PricePerGram { czk, eur }
    }

    /// Selects the price for the order currency.
    #[inline]
    pub const fn in_currency(&self, currency: Currency) -> Money {
        match currency {
            Currency::Czk => self.czk,
            Currency::Eur => self.eur,
        }
    }
}

/// Where a SKU's price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    /// Resolved from the price matrix.
    Matrix,
    /// Entered manually, trusted as-is.
    Override,
}

/// A price matrix row: (category, tier, shade band, length) → price per gram.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PriceMatrixEntry {
    pub category: Category,
    pub tier: Tier,
    #[ts(as = "String")]
    pub shade_band: ShadeBand,
    pub length_cm: i64,
    pub price_per_gram: PricePerGram,
}

// =============================================================================
// Sale Mode & Stock State
// =============================================================================

/// How stock of a SKU is sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleMode {
    /// Continuous weight, customer picks the grams.
    BulkByWeight,
    /// One physical unit of fixed weight.
    PieceByWeight,
}

/// Cached stock projection of a SKU.
///
/// Exactly one representation exists per SKU, chosen by its sale mode. The
/// ledger owns the truth; this is rewritten only together with a movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "saleMode")]
pub enum StockState {
    #[serde(rename = "BULK_BY_WEIGHT", rename_all = "camelCase")]
    Bulk {
        available_grams: i64,
        min_order_grams: i64,
        step_grams: i64,
    },
    #[serde(rename = "PIECE_BY_WEIGHT", rename_all = "camelCase")]
    Piece {
        weight_total_grams: i64,
        in_stock: bool,
        sold_out: bool,
    },
}

impl StockState {
    pub const fn sale_mode(&self) -> SaleMode {
        match self {
            StockState::Bulk { .. } => SaleMode::BulkByWeight,
            StockState::Piece { .. } => SaleMode::PieceByWeight,
        }
    }

    /// Grams the projection claims are on hand.
    ///
    /// A PIECE is either entirely present (its full weight) or absent.
    pub const fn balance_grams(&self) -> i64 {
        match *self {
            StockState::Bulk {
                available_grams, ..
            } => available_grams,
            StockState::Piece {
                weight_total_grams,
                in_stock,
                sold_out,
            } => {
                if in_stock && !sold_out {
                    weight_total_grams
                } else {
                    0
                }
            }
        }
    }

    /// Projection implied by a ledger balance, used to rebuild the cache.
    ///
    /// `has_history` distinguishes a piece that was sold (sold out) from one
    /// that never arrived.
    pub fn with_balance(&self, balance: i64, has_history: bool) -> StockState {
        match *self {
            StockState::Bulk {
                min_order_grams,
                step_grams,
                ..
            } => StockState::Bulk {
                available_grams: balance,
                min_order_grams,
                step_grams,
            },
            StockState::Piece {
                weight_total_grams, ..
            } => {
                let in_stock = balance > 0;
                StockState::Piece {
                    weight_total_grams,
                    in_stock,
                    sold_out: !in_stock && has_history,
                }
            }
        }
    }
}

// =============================================================================
// Sku
// =============================================================================

/// A sellable catalog unit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Format-encoded unique code, e.g. `X-NB-STD-O03-SR-20-20250101-01`.
    pub code: String,

    /// Sequential label code, e.g. `M0001`. Never reused.
    pub short_code: String,

    /// Display name derived from tier, shade, structure and length.
    pub name: String,

    pub category: Category,
    pub tier: Tier,
    pub shade: Shade,
    #[ts(as = "String")]
    pub shade_band: ShadeBand,
    pub structure: Structure,
    pub length_cm: i64,
    pub premium_sourcing: bool,

    pub price_per_gram: PricePerGram,
    pub price_source: PriceSource,

    /// Cached balance, tagged with the sale mode.
    pub stock: StockState,

    pub is_listed: bool,
    pub listing_priority: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sku {
    #[inline]
    pub const fn sale_mode(&self) -> SaleMode {
        self.stock.sale_mode()
    }

    /// Piece weight, `None` for BULK SKUs.
    pub const fn piece_weight(&self) -> Option<i64> {
        match self.stock {
            StockState::Piece {
                weight_total_grams, ..
            } => Some(weight_total_grams),
            StockState::Bulk { .. } => None,
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Ledger entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
    Adjust,
}

/// Sign of a movement's delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockDirection {
    Increase,
    Decrease,
}

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub sku_id: String,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    /// Magnitude, always positive.
    pub grams: i64,
    pub direction: StockDirection,
    pub reason: Option<String>,
    pub ref_order_id: Option<String>,
    pub ref_stock_take_id: Option<String>,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub cost_per_gram: Option<Money>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Delta this movement applies to the balance.
    #[inline]
    pub const fn signed_grams(&self) -> i64 {
        match self.direction {
            StockDirection::Increase => self.grams,
            StockDirection::Decrease => -self.grams,
        }
    }
}

// =============================================================================
// Order Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    BankTransfer,
    CashOnDelivery,
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    /// Order status implied by the payment at checkout.
    pub const fn order_status(&self) -> OrderStatus {
        match self {
            PaymentStatus::Paid => OrderStatus::Paid,
            PaymentStatus::Pending => OrderStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    /// Home delivery, needs a street address.
    Courier,
    /// Parcel locker or partner shop, needs a pickup point.
    PickupPoint,
    /// Collected at the studio.
    PersonalPickup,
}

/// How an extension's assembly (ending) fee is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssemblyFeeType {
    /// Fixed amount per line.
    Flat,
    /// Amount per gram (BULK) or per piece (PIECE).
    PerUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChannel {
    #[default]
    Web,
    Admin,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub delivery_method: DeliveryMethod,
    pub pickup_point: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub method: PaymentMethod,
    #[serde(default)]
    pub status: PaymentStatus,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// A customer order, priced once at creation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    /// Human-readable, sequential per year: `2025-000042`.
    pub order_number: String,
    pub status: OrderStatus,
    pub customer: Customer,
    pub shipping: ShippingAddress,
    pub payment: PaymentIntent,
    pub currency: Currency,
    pub channel: OrderChannel,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub items: Vec<OrderItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item in an order.
/// Uses snapshot pattern to freeze SKU data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub sku_id: String,
    /// SKU code at time of sale (frozen).
    pub sku_code: String,
    /// SKU name at time of sale (frozen).
    pub name: String,
    pub sale_mode: SaleMode,
    pub grams: Option<i64>,
    pub quantity: Option<i64>,
    /// Per-gram price in the order currency at time of sale (frozen).
    pub price_per_gram: Money,
    pub ending: Option<String>,
    pub assembly_fee_type: Option<AssemblyFeeType>,
    pub assembly_fee_amount: Money,
    pub assembly_fee_total: Money,
    pub line_total: Money,
}

/// Append-only audit record of order status changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderHistoryEntry {
    pub id: String,
    pub order_id: String,
    pub status: OrderStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock-Take
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockTakeStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

/// A physical count session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockTake {
    pub id: String,
    pub name: Option<String>,
    pub status: StockTakeStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub started_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// One counted SKU within a session.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockTakeItem {
    pub id: String,
    pub stock_take_id: String,
    pub sku_id: String,
    /// Ledger balance when the item was (last) added.
    pub expected_grams: i64,
    pub counted_grams: i64,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub counted_at: DateTime<Utc>,
}

impl StockTakeItem {
    /// Counted minus expected; negative means missing stock.
    #[inline]
    pub const fn difference(&self) -> i64 {
        self.counted_grams - self.expected_grams
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
