//! # Seed Data Generator
//!
//! Populates a database with demo stock for development.
//!
//! ## Usage
//! ```bash
//! # Restock 200 items (default)
//! cargo run -p stockroom-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p stockroom-db --bin seed -- --count 1000 --db ./data/stockroom.db
//! ```
//!
//! Items go through the regular restock operation as the `seed` actor, so
//! the seeding itself shows up in the history.

use std::env;

use chrono::FixedOffset;
use stockroom_core::{Identity, ItemDraft, Money, UserRole, MAX_REQUEST_LINES};
use stockroom_db::{Database, DbConfig};

/// Base names for demo items
const PRODUCTS: &[&str] = &[
    "Hex Bolt",
    "Wood Screw",
    "Wall Anchor",
    "Washer",
    "Hinge",
    "Door Handle",
    "Cable Tie",
    "Duct Tape",
    "Sandpaper",
    "Paint Brush",
    "Wire Nut",
    "Pipe Clamp",
    "Drill Bit",
    "Masking Tape",
    "Silicone Sealant",
    "Гвоздь",
    "Шуруп",
    "Дюбель",
];

/// Size variants with a price add-on in cents
const SIZES: &[(&str, i64)] = &[
    ("4mm", 0),
    ("6mm", 15),
    ("8mm", 30),
    ("10mm", 45),
    ("25mm", 60),
    ("50mm", 90),
    ("100mm", 150),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./stockroom.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
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
                println!("Stockroom Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to restock (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockroom.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockroom Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.items().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Seeding restocks them again.");
    }

    let actor = Identity {
        id: 0,
        username: "seed".to_string(),
        role: UserRole::Admin,
    };
    let offset = FixedOffset::east_opt(0).ok_or("invalid UTC offset")?;
    let inventory = db.inventory(offset);

    let drafts: Vec<ItemDraft> = generate_drafts().take(count).collect();
    let start = std::time::Instant::now();

    for chunk in drafts.chunks(MAX_REQUEST_LINES) {
        inventory.create_or_update(&actor, chunk).await?;
        println!("  Restocked {} items...", chunk.len());
    }

    let elapsed = start.elapsed();
    let summary = db.items().summary().await?;

    println!();
    println!("✓ Restocked {} lines in {:?}", drafts.len(), elapsed);
    println!("  Unique items: {}", summary.unique_items_count);
    println!("  Units:        {}", summary.total_items_count);
    println!("  Stock value:  {}", summary.total_price);
    println!("  History rows: {}", db.history().count().await?);
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Endless stream of demo lines: every product in every size, then again.
fn generate_drafts() -> impl Iterator<Item = ItemDraft> {
    PRODUCTS
        .iter()
        .flat_map(|product| SIZES.iter().map(move |size| (*product, *size)))
        .enumerate()
        .cycle()
        .map(|(seed, (product, (size, addon)))| ItemDraft {
            name: format!("{} {}", product, size),
            quantity: 10 + (seed % 91) as i64,
            price: Money::from_cents(25 + ((seed * 17) % 400) as i64 + addon),
        })
}
