//! # Price Resolver
//!
//! Maps a SKU's descriptive attributes to a per-gram price.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  manual override? ──yes──► use it as-is (PriceSource::Override)        │
//! │        │                                                                │
//! │        no                                                               │
//! │        ▼                                                                │
//! │  shade ──► shade band                                                   │
//! │     undyed, standard sourcing:  1-4 │ 5-7 │ 8-10                        │
//! │     dyed or premium sourcing:   5-10                                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  (category, tier, band, length) ──► matrix row ──► PriceSource::Matrix │
//! │        │                                                                │
//! │        └── no row ──► PriceNotFound (never invent a price)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lookup itself is done by the store; this module builds the key and
//! decides between override, row and error.

use crate::error::{CoreError, CoreResult};
use crate::types::{Category, PriceMatrixEntry, PricePerGram, PriceSource, Shade, ShadeBand, Tier};
use crate::validation::validate_price;

/// Shade band a shade prices under.
pub fn shade_band(category: Category, shade: Shade, premium_sourcing: bool) -> ShadeBand {
    if category == Category::Dyed || premium_sourcing {
        return ShadeBand::new(5, 10);
    }
    match shade.value() {
        1..=4 => ShadeBand::new(1, 4),
        5..=7 => ShadeBand::new(5, 7),
        _ => ShadeBand::new(8, 10),
    }
}

/// Key of a price matrix row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriceKey {
    pub category: Category,
    pub tier: Tier,
    pub shade_band: ShadeBand,
    pub length_cm: i64,
}

impl PriceKey {
    pub fn new(category: Category, tier: Tier, shade: Shade, length_cm: i64, premium_sourcing: bool) -> Self {
        PriceKey {
            category,
            tier,
            shade_band: shade_band(category, shade, premium_sourcing),
            length_cm,
        }
    }

    pub fn not_found(&self) -> CoreError {
        CoreError::PriceNotFound {
            category: self.category,
            tier: self.tier,
            shade_band: self.shade_band,
            length_cm: self.length_cm,
        }
    }
}

/// Picks the price for a new SKU.
///
/// `matrix_row` is the store's lookup for `key`; it is ignored when an
/// override is given.
pub fn resolve(
    key: &PriceKey,
    matrix_row: Option<&PriceMatrixEntry>,
    price_override: Option<PricePerGram>,
) -> CoreResult<(PricePerGram, PriceSource)> {
    if let Some(price) = price_override {
        validate_price("priceOverride.czk", price.czk)?;
        validate_price("priceOverride.eur", price.eur)?;
        return Ok((price, PriceSource::Override));
    }

    match matrix_row {
        Some(row) => Ok((row.price_per_gram, PriceSource::Matrix)),
        None => Err(key.not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn shade(n: i64) -> Shade {
        Shade::new(n).unwrap()
    }

    #[test]
    fn test_undyed_standard_bands() {
        assert_eq!(shade_band(Category::Undyed, shade(1), false), ShadeBand::new(1, 4));
        assert_eq!(shade_band(Category::Undyed, shade(4), false), ShadeBand::new(1, 4));
        assert_eq!(shade_band(Category::Undyed, shade(5), false), ShadeBand::new(5, 7));
        assert_eq!(shade_band(Category::Undyed, shade(7), false), ShadeBand::new(5, 7));
        assert_eq!(shade_band(Category::Undyed, shade(8), false), ShadeBand::new(8, 10));
        assert_eq!(shade_band(Category::Undyed, shade(10), false), ShadeBand::new(8, 10));
    }

    #[test]
    fn test_dyed_and_premium_use_single_band() {
        assert_eq!(shade_band(Category::Dyed, shade(3), false), ShadeBand::new(5, 10));
        assert_eq!(shade_band(Category::Undyed, shade(2), true), ShadeBand::new(5, 10));
    }

    #[test]
    fn test_resolve_from_matrix() {
        let key = PriceKey::new(Category::Undyed, Tier::Standard, shade(3), 20, false);
        let row = PriceMatrixEntry {
            category: Category::Undyed,
            tier: Tier::Standard,
            shade_band: ShadeBand::new(1, 4),
            length_cm: 20,
            price_per_gram: PricePerGram::new(Money::from_minor(500), Money::from_minor(20)),
        };

        let (price, source) = resolve(&key, Some(&row), None).unwrap();
        assert_eq!(price.czk.minor(), 500);
        assert_eq!(source, PriceSource::Matrix);
    }

    #[test]
    fn test_override_bypasses_matrix() {
        let key = PriceKey::new(Category::Dyed, Tier::Luxe, shade(3), 50, false);
        let manual = PricePerGram::new(Money::from_minor(900), Money::from_minor(36));

        let (price, source) = resolve(&key, None, Some(manual)).unwrap();
        assert_eq!(price, manual);
        assert_eq!(source, PriceSource::Override);

        let bad = PricePerGram::new(Money::zero(), Money::from_minor(36));
        assert!(matches!(resolve(&key, None, Some(bad)), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_missing_row_is_price_not_found() {
        // dyed, luxe, shade 3, 50 cm → band 5-10, no row
        let key = PriceKey::new(Category::Dyed, Tier::Luxe, shade(3), 50, false);
        match resolve(&key, None, None) {
            Err(CoreError::PriceNotFound {
                shade_band,
                length_cm,
                ..
            }) => {
                assert_eq!(shade_band, ShadeBand::new(5, 10));
                assert_eq!(length_cm, 50);
            }
            other => panic!("expected PriceNotFound, got {:?}", other),
        }
    }
}
