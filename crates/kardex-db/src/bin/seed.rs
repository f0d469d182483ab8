//! # Seed Data Generator
//!
//! Populates a Kardex database with a building-materials catalog and runs a
//! couple of guides through their lifecycle, so every table has data.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database
//! cargo run -p kardex-db --bin seed
//!
//! # Specify database path
//! cargo run -p kardex-db --bin seed -- --db ./data/kardex_dev.db
//!
//! # Use a specific config file
//! cargo run -p kardex-db --bin seed -- --config ./kardex.toml
//! ```
//!
//! ## What Gets Created
//! - One product per catalog row, with opening stock recorded as "CREACION"
//! - An incoming guide (supplier restock) completed end to end
//! - An outgoing guide (customer dispatch) completed end to end
//! - One physical-count adjustment

use std::env;
use std::path::PathBuf;

use kardex_core::{GuideKind, NewGuide, NewGuideItem, NewProduct};
use kardex_db::{init_tracing, Database, KardexConfig};

const ACTOR: &str = "seed@gde";

/// (code, name, unit, purchase cost, sale price, opening stock)
const CATALOG: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("CEM-42", "Cemento Portland 42.5kg", "BOLSA", 2_650, 3_100, 120),
    ("CEM-25", "Cemento Portland 25kg", "BOLSA", 1_700, 2_050, 60),
    ("FIE-14", "Fierro corrugado 1/4\"", "VARILLA", 1_150, 1_450, 300),
    ("FIE-38", "Fierro corrugado 3/8\"", "VARILLA", 2_550, 3_050, 250),
    ("FIE-12", "Fierro corrugado 1/2\"", "VARILLA", 4_480, 5_200, 180),
    ("ALA-16", "Alambre negro N.16", "KG", 650, 850, 90),
    ("CLA-3", "Clavos para madera 3\"", "KG", 720, 950, 75),
    ("LAD-KK", "Ladrillo King Kong 18 huecos", "MILLAR", 78_000, 92_000, 12),
    ("ARE-GR", "Arena gruesa", "M3", 5_500, 7_000, 30),
    ("PIE-CH", "Piedra chancada 1/2\"", "M3", 6_800, 8_500, 25),
    ("TUB-PVC4", "Tubo PVC desagüe 4\"", "UNIDAD", 2_390, 2_990, 40),
    ("PEG-ORO", "Pegamento para cerámica", "BOLSA", 1_990, 2_490, 0),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("GDE Kardex Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = KardexConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.logging.filter);

    println!("🌱 GDE Kardex Seed Data Generator");
    println!("=================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Products
    println!();
    println!("Creating products...");

    let reconciler = db.reconciler();
    let mut ids = Vec::with_capacity(CATALOG.len());

    for (code, name, unit, cost, price, stock) in CATALOG {
        let mut input = NewProduct::new(*code, *name)
            .purchase_cost(*cost)
            .sale_price(*price)
            .initial_stock(*stock);
        input.unit_of_measure = Some(unit.to_string());

        match reconciler.create_product(input, ACTOR).await {
            Ok(created) => ids.push(created.product.id),
            Err(e) => eprintln!("Failed to create {}: {}", code, e),
        }
    }

    println!("✓ Created {} products", ids.len());

    if ids.len() < 4 {
        println!("⚠ Not enough products to build guides, stopping here.");
        return Ok(());
    }

    let guides = db.guides();
    let coordinator = db.coordinator();

    // Supplier restock at a higher cost moves the weighted average
    println!();
    println!("Receiving supplier guide...");

    let incoming = guides
        .create(
            &NewGuide::new("GR-001/2024", GuideKind::Incoming)
                .counterparty("Aceros Arequipa S.A.")
                .item(NewGuideItem::new(&ids[0], 80).unit_price(2_790))
                .item(NewGuideItem::new(&ids[3], 100).unit_price(2_610))
                .item(NewGuideItem::new(&ids[11], 50).unit_price(1_990)),
            ACTOR,
        )
        .await?;

    coordinator.submit(&incoming.id, ACTOR).await?;
    coordinator.dispatch(&incoming.id, ACTOR).await?;
    coordinator.complete(&incoming.id, ACTOR).await?;
    println!("✓ {} completed", incoming.code);

    // Customer dispatch
    println!();
    println!("Dispatching customer guide...");

    let outgoing = guides
        .create(
            &NewGuide::new("GS-001/2024", GuideKind::Outgoing)
                .counterparty("Constructora Los Andes")
                .destination("Av. Ejército 1020, Arequipa")
                .item(NewGuideItem::new(&ids[0], 40).unit_price(3_100))
                .item(NewGuideItem::new(&ids[2], 120).unit_price(1_450).discount(6_000)),
            ACTOR,
        )
        .await?;

    coordinator.submit(&outgoing.id, ACTOR).await?;
    coordinator.dispatch(&outgoing.id, ACTOR).await?;
    coordinator.complete(&outgoing.id, ACTOR).await?;
    println!("✓ {} completed", outgoing.code);

    // Physical count
    db.adjustments()
        .adjust(&ids[5], -4, "Merma por humedad", ACTOR)
        .await?;
    println!("✓ Adjustment recorded");

    // Summary
    let summary = db.products().inventory_summary().await?;
    let movements = db.ledger().summary(None, &Default::default()).await?;

    println!();
    println!("Inventory:");
    println!("  Products:      {}", summary.active_products);
    println!("  Low stock:     {}", summary.low_stock_products);
    println!("  Out of stock:  {}", summary.out_of_stock_products);
    println!(
        "  Value:         {}",
        kardex_core::Money::from_cents(summary.total_value_cents)
    );
    println!("  Movements:     {}", movements.total_movements);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
