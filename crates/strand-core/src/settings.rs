//! # Settings
//!
//! Explicit knobs for catalog creation and fulfillment.
//!
//! Every default lives in a `default_*` function so the server's TOML loader
//! and the tests agree on one value. Nothing here has hidden side effects:
//! for example an opening movement is written because the caller supplied
//! opening stock, never because a flag was left unset.

use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};
use crate::types::DeliveryMethod;

// =============================================================================
// Catalog Settings
// =============================================================================

/// Settings consulted by SKU creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// Prefix of sequential short codes (`M` → `M0001`).
    #[serde(default = "default_short_code_prefix")]
    pub short_code_prefix: String,

    /// How many `-NN` suffixes to try before giving up on a code.
    #[serde(default = "default_max_code_attempts")]
    pub max_code_attempts: u32,

    /// Minimum order for BULK SKUs created without one.
    #[serde(default = "default_min_order_grams")]
    pub default_min_order_grams: i64,

    /// Order increment for BULK SKUs created without one.
    #[serde(default = "default_step_grams")]
    pub default_step_grams: i64,
}

fn default_short_code_prefix() -> String {
    "M".to_string()
}

fn default_max_code_attempts() -> u32 {
    50
}

fn default_min_order_grams() -> i64 {
    50
}

fn default_step_grams() -> i64 {
    10
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            short_code_prefix: default_short_code_prefix(),
            max_code_attempts: default_max_code_attempts(),
            default_min_order_grams: default_min_order_grams(),
            default_step_grams: default_step_grams(),
        }
    }
}

// =============================================================================
// Fulfillment Settings
// =============================================================================

/// Shipping price of one delivery method in both currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub delivery_method: DeliveryMethod,
    pub czk: Money,
    pub eur: Money,
}

/// Settings consulted by checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentSettings {
    /// Shipping table. A method missing here cannot be ordered.
    #[serde(default = "default_shipping_rates")]
    pub shipping_rates: Vec<ShippingRate>,

    /// Upper bound on lines per order.
    #[serde(default = "default_max_order_lines")]
    pub max_order_lines: usize,
}

fn default_shipping_rates() -> Vec<ShippingRate> {
    vec![
        ShippingRate {
            delivery_method: DeliveryMethod::Courier,
            czk: Money::from_minor(149_00),
            eur: Money::from_minor(6_50),
        },
        ShippingRate {
            delivery_method: DeliveryMethod::PickupPoint,
            czk: Money::from_minor(89_00),
            eur: Money::from_minor(3_90),
        },
        ShippingRate {
            delivery_method: DeliveryMethod::PersonalPickup,
            czk: Money::zero(),
            eur: Money::zero(),
        },
    ]
}

fn default_max_order_lines() -> usize {
    50
}

impl Default for FulfillmentSettings {
    fn default() -> Self {
        Self {
            shipping_rates: default_shipping_rates(),
            max_order_lines: default_max_order_lines(),
        }
    }
}

impl FulfillmentSettings {
    /// Shipping cost for a delivery method, `None` if the method isn't offered.
    pub fn shipping_cost(&self, method: DeliveryMethod, currency: Currency) -> Option<Money> {
        self.shipping_rates
            .iter()
            .find(|rate| rate.delivery_method == method)
            .map(|rate| match currency {
                Currency::Czk => rate.czk,
                Currency::Eur => rate.eur,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_defaults() {
        let settings = CatalogSettings::default();
        assert_eq!(settings.short_code_prefix, "M");
        assert_eq!(settings.max_code_attempts, 50);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: CatalogSettings =
            serde_json::from_str(r#"{"short_code_prefix": "S"}"#).unwrap();
        assert_eq!(settings.short_code_prefix, "S");
        assert_eq!(settings.default_step_grams, 10);
    }

    #[test]
    fn test_shipping_lookup() {
        let settings = FulfillmentSettings::default();
        assert_eq!(
            settings.shipping_cost(DeliveryMethod::Courier, Currency::Czk),
            Some(Money::from_minor(149_00))
        );
        assert_eq!(
            settings.shipping_cost(DeliveryMethod::PersonalPickup, Currency::Eur),
            Some(Money::zero())
        );

        let courier_only = FulfillmentSettings {
            shipping_rates: vec![ShippingRate {
                delivery_method: DeliveryMethod::Courier,
                czk: Money::from_minor(100),
                eur: Money::from_minor(4),
            }],
            ..FulfillmentSettings::default()
        };
        assert_eq!(
            courier_only.shipping_cost(DeliveryMethod::PickupPoint, Currency::Czk),
            None
        );
    }
}
