//! # Code Generator
//!
//! Human-readable SKU codes and sequential short codes.
//!
//! ## Code Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  X - NB - STD - O03 - SR - 20 - 20250101 - 01        (BULK)             │
//! │  │   │    │     │     │    │    │          │                            │
//! │  │   │    │     │     │    │    │          └─ per-day sequence          │
//! │  │   │    │     │     │    │    └─ creation date                        │
//! │  │   │    │     │     │    └─ length in cm                             │
//! │  │   │    │     │     └─ structure  SR straight / VL wavy / KR curly   │
//! │  │   │    │     └─ shade, zero padded                                  │
//! │  │   │    └─ tier  STD / LUX / PLT                                     │
//! │  │   └─ category  NB undyed / B dyed, +P for premium sourcing          │
//! │  └─ brand prefix                                                       │
//! │                                                                         │
//! │  X - B - LUX - O07 - VL - 50 - 120G                  (PIECE)            │
//! │                                └─ piece weight                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A PIECE code is fully determined by its physical spec; two identical
//! pieces collide and the second gets a `-02` suffix from the store's
//! unique index. Nothing here checks the store: [`candidate`] just yields
//! the code to try for a given attempt.

use chrono::NaiveDate;

use crate::types::{Category, Shade, Structure, Tier};

const BRAND_PREFIX: &str = "X";

/// Everything a code encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSpec {
    pub category: Category,
    pub premium_sourcing: bool,
    pub tier: Tier,
    pub shade: Shade,
    pub structure: Structure,
    pub length_cm: i64,
    pub form: CodeForm,
}

/// Sale-mode specific tail of the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeForm {
    /// Dated batch; `sequence` is a hint, the unique index has the last word.
    Bulk { date: NaiveDate, sequence: u32 },
    Piece { weight_grams: i64 },
}

pub fn category_code(category: Category, premium_sourcing: bool) -> &'static str {
    match (category, premium_sourcing) {
        (Category::Undyed, false) => "NB",
        (Category::Undyed, true) => "NBP",
        (Category::Dyed, false) => "B",
        (Category::Dyed, true) => "BP",
    }
}

pub fn tier_code(tier: Tier) -> &'static str {
    match tier {
        Tier::Standard => "STD",
        Tier::Luxe => "LUX",
        Tier::Platinum => "PLT",
    }
}

pub fn structure_code(structure: Structure) -> &'static str {
    match structure {
        Structure::Straight => "SR",
        Structure::Wavy => "VL",
        Structure::Curly => "KR",
    }
}

/// Part of the code shared by every SKU of the same spec, without the tail.
fn stem(spec: &CodeSpec) -> String {
    format!(
        "{}-{}-{}-O{:02}-{}-{}",
        BRAND_PREFIX,
        category_code(spec.category, spec.premium_sourcing),
        tier_code(spec.tier),
        spec.shade.value(),
        structure_code(spec.structure),
        spec.length_cm
    )
}

/// Prefix shared by every BULK code of the same spec and day.
///
/// The store reads the codes already issued under this prefix and hands
/// them to [`next_bulk_sequence`].
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use strand_core::codegen::{bulk_day_prefix, CodeForm, CodeSpec};
/// use strand_core::types::{Category, Shade, Structure, Tier};
///
/// let spec = CodeSpec {
///     category: Category::Undyed,
///     premium_sourcing: false,
///     tier: Tier::Standard,
///     shade: Shade::new(3).unwrap(),
///     structure: Structure::Straight,
///     length_cm: 20,
///     form: CodeForm::Bulk { date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), sequence: 1 },
/// };
/// assert_eq!(bulk_day_prefix(&spec).as_deref(), Some("X-NB-STD-O03-SR-20-20250101-"));
/// ```
pub fn bulk_day_prefix(spec: &CodeSpec) -> Option<String> {
    match spec.form {
        CodeForm::Bulk { date, .. } => Some(format!("{}-{}-", stem(spec), date.format("%Y%m%d"))),
        CodeForm::Piece { .. } => None,
    }
}

/// Sequence hint following the highest one already issued under `prefix`.
///
/// Only the segment right after the prefix is read, so a collision suffix
/// (`...-01-02`) doesn't count as sequence 2 and a deleted SKU leaves no gap
/// to refill.
pub fn next_bulk_sequence<'a>(prefix: &str, existing: impl IntoIterator<Item = &'a str>) -> u32 {
    existing
        .into_iter()
        .filter_map(|code| code.strip_prefix(prefix))
        .filter_map(|tail| tail.split('-').next()?.parse::<u32>().ok())
        .max()
        .map_or(1, |highest| highest.saturating_add(1))
}

/// Base code before any collision suffix.
pub fn generate_sku_code(spec: &CodeSpec) -> String {
    match spec.form {
        CodeForm::Bulk { date, sequence } => format!(
            "{}-{}-{:02}",
            stem(spec),
            date.format("%Y%m%d"),
            sequence
        ),
        CodeForm::Piece { weight_grams } => format!("{}-{}G", stem(spec), weight_grams),
    }
}

/// Code to try on the given 1-based attempt: the base first, then `-02`, `-03`, ...
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{:02}", base, attempt)
    }
}

/// Sequential short code, e.g. `M0001`. Wider numbers simply grow.
pub fn format_short_code(prefix: &str, value: i64) -> String {
    format!("{}{:04}", prefix, value)
}

/// Order number for the n-th order of a year, e.g. `2025-000042`.
pub fn format_order_number(year: i32, value: i64) -> String {
    format!("{}-{:06}", year, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(form: CodeForm) -> CodeSpec {
        CodeSpec {
            category: Category::Undyed,
            premium_sourcing: false,
            tier: Tier::Standard,
            shade: Shade::new(3).unwrap(),
            structure: Structure::Straight,
            length_cm: 20,
            form,
        }
    }

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn test_bulk_code() {
        let code = generate_sku_code(&spec(CodeForm::Bulk {
            date: jan_first(),
            sequence: 1,
        }));
        assert_eq!(code, "X-NB-STD-O03-SR-20-20250101-01");
    }

    #[test]
    fn test_piece_code_is_deterministic() {
        let mut s = spec(CodeForm::Piece { weight_grams: 120 });
        s.category = Category::Dyed;
        s.tier = Tier::Luxe;
        s.shade = Shade::new(7).unwrap();
        s.structure = Structure::Wavy;
        s.length_cm = 50;

        assert_eq!(generate_sku_code(&s), "X-B-LUX-O07-VL-50-120G");
        assert_eq!(generate_sku_code(&s), generate_sku_code(&s.clone()));
        assert_eq!(bulk_day_prefix(&s), None);
    }

    #[test]
    fn test_next_bulk_sequence() {
        let prefix = "X-NB-STD-O03-SR-20-20250101-";
        assert_eq!(next_bulk_sequence(prefix, Vec::<&str>::new()), 1);
        assert_eq!(
            next_bulk_sequence(
                prefix,
                [
                    "X-NB-STD-O03-SR-20-20250101-01",
                    "X-NB-STD-O03-SR-20-20250101-03",
                    "X-NB-STD-O03-SR-20-20250101-03-02",
                ]
            ),
            4
        );
        // Other days and malformed tails are ignored
        assert_eq!(
            next_bulk_sequence(prefix, ["X-NB-STD-O03-SR-20-20250102-07", "X-NB-STD-O03-SR-20-20250101-xx"]),
            1
        );
    }

    #[test]
    fn test_category_codes() {
        assert_eq!(category_code(Category::Undyed, false), "NB");
        assert_eq!(category_code(Category::Dyed, false), "B");
        assert_eq!(category_code(Category::Undyed, true), "NBP");
        assert_eq!(category_code(Category::Dyed, true), "BP");
        assert_eq!(tier_code(Tier::Platinum), "PLT");
        assert_eq!(structure_code(Structure::Curly), "KR");
    }

    #[test]
    fn test_candidates() {
        let base = "X-B-LUX-O07-VL-50-120G";
        assert_eq!(candidate(base, 1), base);
        assert_eq!(candidate(base, 2), "X-B-LUX-O07-VL-50-120G-02");
        assert_eq!(candidate(base, 12), "X-B-LUX-O07-VL-50-120G-12");
    }

    #[test]
    fn test_short_code_and_order_number() {
        assert_eq!(format_short_code("M", 1), "M0001");
        assert_eq!(format_short_code("M", 12345), "M12345");
        assert_eq!(format_order_number(2025, 42), "2025-000042");
    }
}
