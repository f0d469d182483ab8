//! # Ledger Audit
//!
//! Replays every product's Kardex and checks it against the stored stock.
//!
//! ## Usage
//! ```bash
//! cargo run -p kardex-db --bin audit
//! cargo run -p kardex-db --bin audit -- --db ./data/kardex_dev.db
//! ```
//!
//! Exits with status 1 if any product's chain is broken or its ledger total
//! differs from `products.stock`.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use kardex_db::{init_tracing, Database, KardexConfig};

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut verbose = false;

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
            "--verbose" | "-v" => verbose = true,
            "--help" | "-h" => {
                println!("GDE Kardex Ledger Audit");
                println!();
                println!("Usage: audit [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -v, --verbose         Print every product, not only failures");
                println!("  -h, --help            Show this help message");
                return Ok(ExitCode::SUCCESS);
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

    let db = Database::new(config.db_config()).await?;
    let products = db.products();
    let ledger = db.ledger();

    let ids = products.all_ids().await?;
    println!("Auditing {} products in {}", ids.len(), config.database.path.display());
    println!();

    let mut failures = 0usize;
    let mut entries = 0usize;

    for id in &ids {
        let audit = ledger.audit(id).await?;
        entries += audit.entry_count;

        if audit.is_consistent() {
            if verbose {
                println!(
                    "  ✓ {}  {} entries, balance {}",
                    id, audit.entry_count, audit.product_balance
                );
            }
            continue;
        }

        failures += 1;
        println!("  ✗ {}", id);
        println!(
            "      ledger total {}, last balance_after {}, products.stock {}",
            audit.ledger_balance, audit.closing_balance, audit.product_balance
        );
        for brk in &audit.chain_breaks {
            println!(
                "      seq {}: {:?} (expected {}, found {})",
                brk.sequence, brk.kind, brk.expected, brk.found
            );
        }
    }

    db.close().await;

    println!();
    println!("{} products, {} entries, {} inconsistent", ids.len(), entries, failures);

    if failures > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        println!("✓ Ledger consistent");
        Ok(ExitCode::SUCCESS)
    }
}
