//! # Seed Data Generator
//!
//! Populates a development database with a full price matrix and a spread of
//! stocked SKUs.
//!
//! ## Usage
//! ```bash
//! # 40 SKUs (default)
//! cargo run -p strand-db --bin seed
//!
//! # Custom amount
//! cargo run -p strand-db --bin seed -- --count 200
//!
//! # Specify database path
//! cargo run -p strand-db --bin seed -- --db ./data/strand.db
//! ```
//!
//! ## Generated Data
//! - Price matrix: every category, tier, shade band and length in
//!   [`LENGTHS`], priced per gram in CZK and EUR
//! - BULK SKUs cycling through tiers, structures and shades, each with an
//!   opening IN movement
//! - One in-stock PIECE SKU for every fifth BULK SKU

use std::env;

use strand_core::catalog::NewSku;
use strand_core::{
    CatalogSettings, Category, Money, PriceMatrixEntry, PricePerGram, SaleMode, ShadeBand, Structure, Tier,
};
use strand_db::{CatalogService, Database, DbConfig};

/// Lengths the matrix covers, in cm.
const LENGTHS: &[i64] = &[40, 50, 60, 70];

const TIERS: &[Tier] = &[Tier::Standard, Tier::Luxe, Tier::Platinum];

const STRUCTURES: &[Structure] = &[Structure::Straight, Structure::Wavy, Structure::Curly];

/// Shades used for undyed SKUs, one per band.
const UNDYED_SHADES: &[i64] = &[2, 6, 9];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 40;
    let mut db_path = String::from("./strand_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Strand Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of BULK SKUs to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: ./strand_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Strand Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("SKUs:     {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let catalog = CatalogService::new(db, CatalogSettings::default());

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = catalog.list_skus(false, 1).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has SKUs");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Price matrix
    println!();
    println!("Loading price matrix...");
    let mut rows = 0;
    for entry in matrix_rows() {
        catalog.upsert_price(entry).await?;
        rows += 1;
    }
    println!("✓ {} price rows", rows);

    // SKUs
    println!();
    println!("Generating SKUs...");
    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut pieces = 0;

    for seed in 0..count {
        match catalog.create_sku(bulk_sku(seed)).await {
            Ok(sku) => {
                generated += 1;
                if generated % 20 == 0 {
                    println!("  Generated {} SKUs (last: {})...", generated, sku.code);
                }
            }
            Err(e) => {
                eprintln!("Failed to create BULK SKU #{}: {}", seed, e);
                continue;
            }
        }

        if seed % 5 == 4 {
            match catalog.create_sku(piece_sku(seed)).await {
                Ok(_) => pieces += 1,
                Err(e) => eprintln!("Failed to create PIECE SKU #{}: {}", seed, e),
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} BULK and {} PIECE SKUs in {:?}", generated, pieces, elapsed);

    // Every projection must agree with its ledger
    println!();
    println!("Auditing ledger...");
    let drifted = catalog.audit_all().await?;
    if drifted.is_empty() {
        println!("  All balances consistent");
    } else {
        for check in &drifted {
            println!("  ⚠ {} drifted by {} g", check.code, check.drift());
        }
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Every matrix row the generated SKUs can resolve against.
fn matrix_rows() -> Vec<PriceMatrixEntry> {
    let undyed_bands = [ShadeBand::new(1, 4), ShadeBand::new(5, 7), ShadeBand::new(8, 10)];
    let mut rows = Vec::new();

    for (tier_idx, tier) in TIERS.iter().enumerate() {
        for &length_cm in LENGTHS {
            for (band_idx, band) in undyed_bands.iter().enumerate() {
                rows.push(PriceMatrixEntry {
                    category: Category::Undyed,
                    tier: *tier,
                    shade_band: *band,
                    length_cm,
                    price_per_gram: price(tier_idx, length_cm, band_idx as i64),
                });
            }
            rows.push(PriceMatrixEntry {
                category: Category::Dyed,
                tier: *tier,
                shade_band: ShadeBand::new(5, 10),
                length_cm,
                price_per_gram: price(tier_idx, length_cm, 3),
            });
        }
    }

    rows
}

/// Price per gram rising with tier, length and lightness.
fn price(tier_idx: usize, length_cm: i64, band_step: i64) -> PricePerGram {
    let czk = 400 + tier_idx as i64 * 150 + (length_cm - 40) * 5 + band_step * 50;
    // Roughly 25 CZK to the euro, kept in cents
    let eur = czk * 100 / 2500;
    PricePerGram::new(Money::from_minor(czk), Money::from_minor(eur))
}

fn bulk_sku(seed: usize) -> NewSku {
    NewSku {
        category: Category::Undyed,
        tier: TIERS[seed % TIERS.len()],
        shade: UNDYED_SHADES[(seed / TIERS.len()) % UNDYED_SHADES.len()],
        structure: STRUCTURES[seed % STRUCTURES.len()],
        length_cm: LENGTHS[seed % LENGTHS.len()],
        premium_sourcing: false,
        sale_mode: SaleMode::BulkByWeight,
        weight_total_grams: None,
        min_order_grams: None,
        step_grams: None,
        price_override: None,
        opening_stock_grams: Some(100 + (seed as i64 * 37) % 900),
        location: Some(format!("A{}", seed % 4 + 1)),
        batch_number: Some(format!("SEED-{:04}", seed)),
        cost_per_gram: None,
        is_listed: Some(true),
        listing_priority: Some((seed % 10) as i64),
    }
}

fn piece_sku(seed: usize) -> NewSku {
    let weight = 80 + (seed as i64 / 5 % 5) * 20;
    NewSku {
        category: Category::Dyed,
        shade: 5 + (seed % 6) as i64,
        sale_mode: SaleMode::PieceByWeight,
        weight_total_grams: Some(weight),
        opening_stock_grams: Some(weight),
        ..bulk_sku(seed)
    }
}
