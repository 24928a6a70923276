//! Pricing wave management commands

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tally_core::Database;

pub fn cmd_waves_list(db: &Database) -> Result<()> {
    let waves = db.list_waves()?;

    if waves.is_empty() {
        println!("No waves defined. Add one with 'tally waves add'.");
        return Ok(());
    }

    println!(
        "{:<5} {:<20} {:<12} {:<12} {:>9} {:>10}",
        "ID", "NAME", "START", "END", "BOY", "GIRL"
    );
    for w in waves {
        println!(
            "{:<5} {:<20} {:<12} {:<12} {:>9.2} {:>10.2}",
            w.id,
            super::truncate(&w.name, 20),
            w.start_date,
            w.end_date,
            w.price_boy,
            w.price_girl
        );
    }

    Ok(())
}

pub fn cmd_waves_add(
    db: &Database,
    name: &str,
    start: &str,
    end: &str,
    price_boy: f64,
    price_girl: f64,
) -> Result<()> {
    let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .context("Invalid --start date format (use YYYY-MM-DD)")?;
    let end_date = NaiveDate::parse_from_str(end, "%Y-%m-%d")
        .context("Invalid --end date format (use YYYY-MM-DD)")?;

    let wave = db.create_wave(name, start_date, end_date, price_boy, price_girl)?;

    println!(
        "✅ Wave {} \"{}\" active {} to {} (${:.2}/boy, ${:.2}/girl)",
        wave.id, wave.name, wave.start_date, wave.end_date, wave.price_boy, wave.price_girl
    );

    Ok(())
}

pub fn cmd_waves_rm(db: &Database, id: i64) -> Result<()> {
    db.delete_wave(id)?;
    println!("🗑️  Wave {} deleted", id);
    Ok(())
}
