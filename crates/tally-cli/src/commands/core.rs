//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `parse_mode` - Shared utilities
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Order counts and ledger totals
//! - `cmd_rematch` - Re-run matching over pending orders
//! - `cmd_audit` - Show the admin audit log

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{Database, MatchMode, Reconciler};

/// Open the database, running migrations if needed
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Parse a --mode argument
pub fn parse_mode(mode: &str) -> Result<MatchMode> {
    mode.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    open_db(db_path)?;

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a pricing wave: tally waves add \"Wave 1\" --start 2025-01-01 --end 2025-02-01 --price-boy 15 --price-girl 10");
    println!("  2. Import a bank export:  tally import --file statement.csv");
    println!("  3. Submit an order:       tally submit --name \"Alex Kim\" --email alex@example.com --boys 1 --girls 1 --receipt r.png");

    Ok(())
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;

    println!("📊 Tally Status");
    println!("   ─────────────────────────────");

    let counts = db.count_by_status()?;
    if counts.is_empty() {
        println!("   No orders yet");
    } else {
        for (status, count) in &counts {
            println!("   {:<10} {}", format!("{}:", status), count);
        }
    }

    let venmo = db.list_venmo_transactions()?;
    let zelle = db.list_zelle_transactions()?;
    let venmo_total: f64 = venmo.iter().map(|t| t.amount).sum();
    let zelle_total: f64 = zelle.iter().map(|t| t.amount).sum();

    println!();
    println!(
        "   Venmo ledger: {} transactions, ${:.2}",
        venmo.len(),
        venmo_total
    );
    println!(
        "   Zelle ledger: {} transactions, ${:.2}",
        zelle.len(),
        zelle_total
    );

    let waves = db.list_waves()?;
    println!("   Waves: {}", waves.len());

    Ok(())
}

pub fn cmd_rematch(db_path: &Path, mode: &str) -> Result<()> {
    let db = open_db(db_path)?;
    let mode = parse_mode(mode)?;

    println!("🔍 Re-running matching ({})...", mode.as_str());

    let verified = Reconciler::new(&db, mode).rerun_matching()?;

    if verified > 0 {
        println!("✅ {} order(s) verified", verified);
    } else {
        println!("   No pending orders matched");
    }

    Ok(())
}

pub fn cmd_audit(db_path: &Path, limit: i64) -> Result<()> {
    let db = open_db(db_path)?;
    let entries = db.list_audit(limit)?;

    if entries.is_empty() {
        println!("No audit entries yet");
        return Ok(());
    }

    println!("{:<20} {:<12} {:<18} DETAILS", "WHEN", "ACTOR", "ACTION");
    for e in entries {
        println!(
            "{:<20} {:<12} {:<18} {}",
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            super::truncate(&e.actor, 12),
            e.action,
            e.details.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
