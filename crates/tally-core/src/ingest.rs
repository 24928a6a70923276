//! CSV ingestion: parse, upsert, record, re-match

use tracing::{info, warn};

use crate::db::{Database, UpsertOutcome};
use crate::error::{Error, Result};
use crate::import::{parse_transactions, ParsedBatch};
use crate::matching::{MatchMode, Reconciler};
use crate::models::CsvFormat;

/// Summary of one CSV ingestion
#[derive(Debug, Clone, Copy)]
pub struct IngestReport {
    pub format: CsvFormat,
    /// Rows the parser produced
    pub parsed: usize,
    /// Rows inserted for the first time
    pub new: usize,
    /// Rows whose natural key already existed and were refreshed
    pub updated: usize,
    /// Rows that failed to upsert
    pub skipped: usize,
    /// Pending orders verified by the post-ingest match pass
    pub matched: usize,
}

/// Ingest a bank CSV export.
///
/// Parses (with format detection), upserts each row by its natural key,
/// records the batch in the upload log, and re-runs matching over
/// pending orders so payments that just arrived verify immediately.
/// Upserts are per-row best-effort: one bad row never sinks the batch.
pub fn ingest_csv(
    db: &Database,
    csv_text: &str,
    filename: &str,
    actor: &str,
    mode: MatchMode,
) -> Result<IngestReport> {
    let batch = parse_transactions(csv_text);

    if batch.is_empty() {
        return Err(Error::Import(format!(
            "No transactions parsed from {}",
            filename
        )));
    }

    let format = batch.format();
    let parsed = batch.len();
    let mut new = 0;
    let mut updated = 0;
    let mut skipped = 0;

    match &batch {
        ParsedBatch::Chase(rows) => {
            for row in rows {
                match db.upsert_zelle_transaction(row, filename) {
                    Ok(UpsertOutcome::Inserted) => new += 1,
                    Ok(UpsertOutcome::Updated) => updated += 1,
                    Err(e) => {
                        warn!("Skipping zelle row {:?}: {}", row, e);
                        skipped += 1;
                    }
                }
            }
        }
        ParsedBatch::Venmo(rows) => {
            for row in rows {
                match db.upsert_venmo_transaction(row, filename) {
                    Ok(UpsertOutcome::Inserted) => new += 1,
                    Ok(UpsertOutcome::Updated) => updated += 1,
                    Err(e) => {
                        warn!("Skipping venmo row {:?}: {}", row, e);
                        skipped += 1;
                    }
                }
            }
        }
    }

    db.record_csv_upload(
        filename,
        format,
        parsed as i64,
        new as i64,
        updated as i64,
        skipped as i64,
        actor,
    )?;
    db.log_audit(
        actor,
        "csv_ingested",
        Some(&format!("{} ({}, {} rows)", filename, format, parsed)),
    )?;

    let matched = Reconciler::new(db, mode).rerun_matching()?;

    info!(
        "Ingested {} as {}: {} parsed, {} new, {} updated, {} skipped, {} orders verified",
        filename, format, parsed, new, updated, skipped, matched
    );

    Ok(IngestReport {
        format,
        parsed,
        new,
        updated,
        skipped,
        matched,
    })
}
