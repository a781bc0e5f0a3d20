//! # Checkout
//!
//! Typed checkout request, its validation, line pricing, and the stock
//! re-check that runs inside the fulfillment unit of work.
//!
//! ## Pricing a Cart
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BULK line   = price/g × grams            + fee (FLAT | PER_UNIT×g)    │
//! │  PIECE line  = price/g × weight × qty     + fee (FLAT | PER_UNIT×qty)  │
//! │                                                                         │
//! │  subtotal    = Σ line totals                                           │
//! │  total       = subtotal + shipping(method, currency) − discount, ≥ 0   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Re-check
//! BULK requests are summed per SKU across lines before comparing with the
//! cached balance, so two lines of 200 g against 300 g fail as one request
//! of 400 g. A PIECE can be sold once, in quantity 1.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Currency, Money};
use crate::settings::FulfillmentSettings;
use crate::types::{
    AssemblyFeeType, Customer, DeliveryMethod, OrderChannel, PaymentIntent, SaleMode, ShippingAddress, Sku,
    StockState,
};
use crate::validation::{
    validate_email, validate_non_negative_money, validate_optional_text, validate_positive_grams,
    validate_required,
};

// =============================================================================
// Request
// =============================================================================

/// One cart line as submitted by the storefront or admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    pub sku_id: String,
    pub sale_mode: SaleMode,
    /// BULK: grams to buy.
    pub grams: Option<i64>,
    /// PIECE: number of pieces, defaults to 1.
    pub quantity: Option<i64>,
    /// Selected ending / add-on (keratin, tape, ...).
    pub ending: Option<String>,
    pub assembly_fee_type: Option<AssemblyFeeType>,
    pub assembly_fee_amount: Option<Money>,
}

/// Input for `fulfill_order`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub shipping: ShippingAddress,
    pub items: Vec<CheckoutLine>,
    pub payment: PaymentIntent,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub channel: OrderChannel,
    pub notes: Option<String>,
    pub discount_amount: Option<Money>,
}

impl CheckoutRequest {
    /// Checks everything that doesn't need the store, and normalizes text.
    pub fn validate(mut self, settings: &FulfillmentSettings) -> CoreResult<CheckoutRequest> {
        self.customer = Customer {
            email: validate_email(&self.customer.email)?,
            first_name: validate_required("customer.firstName", &self.customer.first_name)?,
            last_name: validate_required("customer.lastName", &self.customer.last_name)?,
            phone: validate_optional_text("customer.phone", self.customer.phone.as_deref())?,
        };

        let shipping = &self.shipping;
        let pickup_point = validate_optional_text("shipping.pickupPoint", shipping.pickup_point.as_deref())?;
        match shipping.delivery_method {
            DeliveryMethod::PickupPoint if pickup_point.is_none() => {
                return Err(ValidationError::Required {
                    field: "shipping.pickupPoint".to_string(),
                }
                .into());
            }
            DeliveryMethod::Courier => {
                validate_required("shipping.street", shipping.street.as_deref().unwrap_or(""))?;
                validate_required("shipping.city", shipping.city.as_deref().unwrap_or(""))?;
                validate_required("shipping.postalCode", shipping.postal_code.as_deref().unwrap_or(""))?;
            }
            _ => {}
        }
        self.shipping.pickup_point = pickup_point;

        if settings
            .shipping_cost(self.shipping.delivery_method, self.currency)
            .is_none()
        {
            return Err(ValidationError::NotAllowed {
                field: "shipping.deliveryMethod".to_string(),
                reason: format!("{:?} is not offered", self.shipping.delivery_method),
            }
            .into());
        }

        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }
        if self.items.len() > settings.max_order_lines {
            return Err(ValidationError::OutOfRange {
                field: "items".to_string(),
                min: 1,
                max: settings.max_order_lines as i64,
            }
            .into());
        }

        for line in &mut self.items {
            validate_required("items.skuId", &line.sku_id)?;
            match line.sale_mode {
                SaleMode::BulkByWeight => {
                    let grams = line.grams.ok_or_else(|| ValidationError::Required {
                        field: "items.grams".to_string(),
                    })?;
                    validate_positive_grams("items.grams", grams)?;
                    line.quantity = None;
                }
                SaleMode::PieceByWeight => {
                    let quantity = line.quantity.unwrap_or(1);
                    if quantity <= 0 {
                        return Err(ValidationError::MustBePositive {
                            field: "items.quantity".to_string(),
                        }
                        .into());
                    }
                    line.quantity = Some(quantity);
                    line.grams = None;
                }
            }
            if let Some(fee) = line.assembly_fee_amount {
                validate_non_negative_money("items.assemblyFeeAmount", fee)?;
            }
            line.ending = validate_optional_text("items.ending", line.ending.as_deref())?;
        }

        if let Some(discount) = self.discount_amount {
            validate_non_negative_money("discountAmount", discount)?;
        }
        self.notes = validate_optional_text("notes", self.notes.as_deref())?;

        Ok(self)
    }

    /// Distinct SKU ids referenced by the cart, in first-seen order.
    pub fn sku_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::with_capacity(self.items.len());
        for line in &self.items {
            if !ids.contains(&line.sku_id) {
                ids.push(line.sku_id.clone());
            }
        }
        ids
    }
}

// =============================================================================
// Quote
// =============================================================================

/// A cart line priced against the current SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub sku_id: String,
    pub sku_code: String,
    pub name: String,
    pub sale_mode: SaleMode,
    pub grams: Option<i64>,
    pub quantity: Option<i64>,
    pub price_per_gram: Money,
    /// Grams the line takes out of stock.
    pub stock_grams: i64,
    pub ending: Option<String>,
    pub assembly_fee_type: Option<AssemblyFeeType>,
    pub assembly_fee_amount: Money,
    pub assembly_fee_total: Money,
    pub line_total: Money,
}

/// Fully priced cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub lines: Vec<PricedLine>,
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub discount_amount: Money,
    pub total: Money,
}

/// Prices one line.
pub fn price_line(sku: &Sku, line: &CheckoutLine, currency: Currency) -> CoreResult<PricedLine> {
    if sku.sale_mode() != line.sale_mode {
        return Err(ValidationError::NotAllowed {
            field: "items.saleMode".to_string(),
            reason: format!("{} is sold as {:?}", sku.code, sku.sale_mode()),
        }
        .into());
    }

    let price_per_gram = sku.price_per_gram.in_currency(currency);
    let (units, stock_grams) = match sku.stock {
        StockState::Bulk {
            min_order_grams,
            step_grams,
            ..
        } => {
            let grams = line.grams.unwrap_or(0);
            if grams < min_order_grams || grams % step_grams != 0 {
                return Err(ValidationError::NotAllowed {
                    field: "items.grams".to_string(),
                    reason: format!(
                        "{} is sold from {} g in steps of {} g",
                        sku.code, min_order_grams, step_grams
                    ),
                }
                .into());
            }
            (grams, grams)
        }
        StockState::Piece {
            weight_total_grams, ..
        } => {
            let quantity = line.quantity.unwrap_or(1);
            let grams = weight_total_grams
                .checked_mul(quantity)
                .ok_or_else(|| too_large("items.quantity"))?;
            (quantity, grams)
        }
    };

    let fee_amount = line.assembly_fee_amount.unwrap_or_default();
    let assembly_fee_total = match line.assembly_fee_type {
        Some(AssemblyFeeType::Flat) => fee_amount,
        Some(AssemblyFeeType::PerUnit) => fee_amount
            .checked_multiply_quantity(units)
            .ok_or_else(|| too_large("items.assemblyFeeAmount"))?,
        None => Money::zero(),
    };
    let line_total = price_per_gram
        .checked_multiply_quantity(stock_grams)
        .and_then(|goods| goods.checked_add(assembly_fee_total))
        .ok_or_else(|| too_large("items"))?;

    Ok(PricedLine {
        sku_id: sku.id.clone(),
        sku_code: sku.code.clone(),
        name: sku.name.clone(),
        sale_mode: line.sale_mode,
        grams: line.grams.filter(|_| line.sale_mode == SaleMode::BulkByWeight),
        quantity: line.quantity.filter(|_| line.sale_mode == SaleMode::PieceByWeight),
        price_per_gram,
        stock_grams,
        ending: line.ending.clone(),
        assembly_fee_type: line.assembly_fee_type,
        assembly_fee_amount: fee_amount,
        assembly_fee_total,
        line_total,
    })
}

/// Prices a validated request against the SKUs loaded for it.
///
/// Fails with `SkuNotFound` for the first line whose SKU is missing.
pub fn quote(
    request: &CheckoutRequest,
    skus: &HashMap<String, Sku>,
    settings: &FulfillmentSettings,
) -> CoreResult<Quote> {
    let lines = request
        .items
        .iter()
        .map(|line| {
            let sku = skus
                .get(&line.sku_id)
                .ok_or_else(|| CoreError::SkuNotFound(line.sku_id.clone()))?;
            price_line(sku, line, request.currency)
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let subtotal = Money::checked_sum(lines.iter().map(|l| l.line_total)).ok_or_else(|| too_large("items"))?;
    let shipping_cost = settings
        .shipping_cost(request.shipping.delivery_method, request.currency)
        .ok_or_else(|| ValidationError::NotAllowed {
            field: "shipping.deliveryMethod".to_string(),
            reason: format!("{:?} is not offered", request.shipping.delivery_method),
        })?;
    let discount_amount = request.discount_amount.unwrap_or_default();
    let total = subtotal
        .checked_add(shipping_cost)
        .ok_or_else(|| too_large("items"))?
        .saturating_sub_to_zero(discount_amount);

    Ok(Quote {
        lines,
        subtotal,
        shipping_cost,
        discount_amount,
        total,
    })
}

fn too_large(field: &str) -> CoreError {
    ValidationError::TooLarge {
        field: field.to_string(),
    }
    .into()
}

/// Confirms every priced line is covered by the SKUs' cached stock.
pub fn check_availability(lines: &[PricedLine], skus: &HashMap<String, Sku>) -> CoreResult<()> {
    let mut requested: HashMap<&str, i64> = HashMap::new();

    for line in lines {
        let sku = skus
            .get(&line.sku_id)
            .ok_or_else(|| CoreError::SkuNotFound(line.sku_id.clone()))?;
        let total = requested.entry(sku.id.as_str()).or_insert(0);
        *total = total.saturating_add(line.stock_grams);

        let available = sku.stock.balance_grams();
        let ok = match sku.stock {
            StockState::Bulk { .. } => *total <= available,
            StockState::Piece {
                weight_total_grams, ..
            } => available > 0 && *total == weight_total_grams,
        };
        if !ok {
            return Err(CoreError::InsufficientStock {
                sku: sku.code.clone(),
                available,
                requested: *total,
            });
        }
    }

    Ok(())
}
