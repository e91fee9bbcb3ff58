//! # Seed Data Generator
//!
//! Fills an inventory database with sample stock for development.
//!
//! ## Usage
//! ```bash
//! # Generate 300 items (default)
//! cargo run -p inventario-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p inventario-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p inventario-db --bin seed -- --db ./data/inventario.db
//! ```
//!
//! ## Generated Items
//! Items are spread across the built-in categories (CPU, MON, UPS, TEL, ...)
//! with SKUs numbered per prefix the same way intake numbers them. Roughly a
//! third are listed for sale; one in twenty is marked OBSOLETO.

use std::env;

use inventario_core::{ItemStatus, Money, NewInventoryItem, DEFAULT_CATEGORY_NAMES};
use inventario_db::{Database, DbConfig};

/// Brand and model pairs per category prefix.
const MODELS: &[(&str, &[(&str, &str)])] = &[
    ("CPU", &[("Dell", "Optiplex 7050"), ("HP", "EliteDesk 800 G3"), ("Lenovo", "ThinkCentre M710q")]),
    ("MON", &[("Dell", "P2219H"), ("LG", "24MK430H"), ("Samsung", "S24F350")]),
    ("UPS", &[("APC", "Back-UPS 600"), ("CyberPower", "CP1500"), ("Tripp Lite", "SMART1500")]),
    ("TEL", &[("Cisco", "CP-7841"), ("Polycom", "VVX 411"), ("Yealink", "T46S")]),
    ("MAC", &[("Apple", "Mac mini 2014"), ("Apple", "iMac 21.5 2015")]),
    ("PR", &[("HP", "LaserJet M404"), ("Brother", "HL-L2350")]),
    ("TEC", &[("Logitech", "K120"), ("Dell", "KB216")]),
    ("MOU", &[("Logitech", "M90"), ("Dell", "MS116")]),
];

const LOCATIONS: &[&str] = &["Bodega A", "Bodega B", "Mostrador", "Taller"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 300;
    let mut db_path = String::from("./inventario_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(300);
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
                println!("Inventario Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of items to generate (default: 300)");
                println!("  -d, --db <PATH>    Database file path (default: ./inventario_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Inventario Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Items:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Schema reconciled");

    let existing = db.inventory().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} items", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating items...");

    let inventory = db.inventory();
    let start = std::time::Instant::now();
    let mut generated = 0;

    for n in 0..count {
        let (prefix, models) = MODELS[n % MODELS.len()];
        let (brand, model) = models[(n / MODELS.len()) % models.len()];
        let sku = inventory.next_sku(prefix).await?;

        let item = generate_item(sku, prefix, brand, model, n);
        if let Err(e) = inventory.register(&item, Some("seed")).await {
            eprintln!("Failed to insert {}: {}", item.sku, e);
            continue;
        }
        generated += 1;

        if generated % 100 == 0 {
            println!("  Generated {} items...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} items in {:?}", generated, elapsed);

    let categories = db.catalog().category_names().await?;
    println!();
    println!("Categories:");
    for category in categories {
        println!("  {:<5} {}", category.prefix, category.name);
    }
    println!(
        "  ({} built-in names available)",
        DEFAULT_CATEGORY_NAMES.len()
    );

    let listed = inventory.listed_for_sale().await?;
    println!("  Listed for sale: {}", listed.len());

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Builds one sample item.
fn generate_item(sku: String, prefix: &str, brand: &str, model: &str, seed: usize) -> NewInventoryItem {
    // $150.00 - $2,149.00 in whole pesos
    let price = Money::from_cents(15_000 + ((seed * 37) % 2_000) as i64 * 100);

    let status = if seed % 20 == 19 {
        Some(ItemStatus::Obsoleto.to_string())
    } else if seed % 3 == 0 {
        Some(ItemStatus::Venta.to_string())
    } else {
        None
    };

    NewInventoryItem {
        sku,
        kind: Some(prefix.to_string()),
        brand: Some(brand.to_string()),
        model: Some(model.to_string()),
        serial_number: Some(format!("SN{}{:06}", prefix, seed)),
        volts: Some(if seed % 4 == 0 { "220" } else { "110" }.to_string()),
        price: Some(price),
        status,
        location: Some(LOCATIONS[seed % LOCATIONS.len()].to_string()),
        source_sheet: Some("seed".to_string()),
        ..Default::default()
    }
}
