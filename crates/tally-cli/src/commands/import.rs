//! CSV ingestion and upload history commands

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::ingest_csv;

use super::core::{open_db, parse_mode};

pub fn cmd_import(db_path: &Path, file: &Path, mode: &str, actor: &str) -> Result<()> {
    let db = open_db(db_path)?;
    let mode = parse_mode(mode)?;

    println!("📥 Importing {}...", file.display());

    let csv_text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let report = ingest_csv(&db, &csv_text, &filename, actor, mode)?;

    println!("   Format: {}", report.format);
    println!(
        "   {} parsed, {} new, {} updated, {} skipped",
        report.parsed, report.new, report.updated, report.skipped
    );

    if report.matched > 0 {
        println!("✅ {} pending order(s) verified", report.matched);
    }

    println!("✅ Import complete!");
    Ok(())
}

pub fn cmd_uploads(db_path: &Path) -> Result<()> {
    let db = open_db(db_path)?;
    let uploads = db.list_csv_uploads()?;

    if uploads.is_empty() {
        println!("No CSV batches ingested yet");
        return Ok(());
    }

    println!(
        "{:<5} {:<28} {:<8} {:>7} {:>5} {:>8} {:>8}  BY",
        "ID", "FILE", "FORMAT", "PARSED", "NEW", "UPDATED", "SKIPPED"
    );
    for u in uploads {
        println!(
            "{:<5} {:<28} {:<8} {:>7} {:>5} {:>8} {:>8}  {}",
            u.id,
            super::truncate(&u.filename, 28),
            u.detected_format,
            u.records_parsed,
            u.new_records,
            u.updated_records,
            u.skipped_records,
            u.uploaded_by
        );
    }

    Ok(())
}
