//! CSV import parsers for the two supported payment-export formats
//!
//! Both parsers are positional: fields are taken by fixed index from
//! comma-split records with quoting disabled. Quoted fields containing
//! commas are NOT supported; the export formats these were written
//! against never emit them. Malformed rows are skipped
//! and logged, never fatal; a batch only fails when nothing parses at all.

use csv::ReaderBuilder;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::models::{CsvFormat, NewVenmoTransaction, NewZelleTransaction};

/// Header tokens that identify a Chase checking export
const CHASE_TOKENS: &[&str] = &["posting date", "details", "balance", "check or slip"];

/// Header tokens that identify a Venmo statement export
const VENMO_TOKENS: &[&str] = &["datetime", "note", "fee", "net amount"];

fn zelle_payer_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)zelle payment from\s+(.+)").unwrap())
}

/// Classify raw CSV text as Chase, Venmo, or unknown.
///
/// Checks the header line for format-indicative tokens (Chase first), then
/// falls back to inspecting the shape of the first data line. Callers that
/// get `Unknown` should use [`parse_transactions`], which runs both parsers
/// and keeps whichever yields more rows.
pub fn detect_format(csv_text: &str) -> CsvFormat {
    let mut lines = csv_text.lines();
    let header = match lines.next() {
        Some(h) => h.to_lowercase(),
        None => return CsvFormat::Unknown,
    };

    if CHASE_TOKENS.iter().any(|t| header.contains(t)) {
        return CsvFormat::Chase;
    }
    if VENMO_TOKENS.iter().any(|t| header.contains(t)) {
        return CsvFormat::Venmo;
    }

    // No usable header. Infer from the first data line: Chase exports are
    // wide and carry M/D/YY dates, Venmo statements are narrower.
    if let Some(data_line) = lines.find(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = data_line.split(',').collect();
        if fields.len() >= 6 && fields.iter().any(|f| f.contains('/')) {
            return CsvFormat::Chase;
        }
        if fields.len() <= 8 {
            return CsvFormat::Venmo;
        }
    }

    CsvFormat::Unknown
}

/// A parsed batch tagged with the format that produced it
#[derive(Debug, Clone)]
pub enum ParsedBatch {
    Chase(Vec<NewZelleTransaction>),
    Venmo(Vec<NewVenmoTransaction>),
}

impl ParsedBatch {
    pub fn format(&self) -> CsvFormat {
        match self {
            Self::Chase(_) => CsvFormat::Chase,
            Self::Venmo(_) => CsvFormat::Venmo,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Chase(rows) => rows.len(),
            Self::Venmo(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Detect the format and parse accordingly.
///
/// When detection is ambiguous, both parsers run and the one yielding more
/// rows wins. Equal counts (including both zero) resolve to Chase as an
/// arbitrary tie-break.
pub fn parse_transactions(csv_text: &str) -> ParsedBatch {
    let format = detect_format(csv_text);
    debug!("Detected CSV format: {}", format);

    match format {
        CsvFormat::Chase => ParsedBatch::Chase(parse_chase(csv_text)),
        CsvFormat::Venmo => ParsedBatch::Venmo(parse_venmo(csv_text)),
        CsvFormat::Unknown => {
            let chase = parse_chase(csv_text);
            let venmo = parse_venmo(csv_text);
            if venmo.len() > chase.len() {
                ParsedBatch::Venmo(venmo)
            } else {
                ParsedBatch::Chase(chase)
            }
        }
    }
}

/// Parse a Chase checking export.
///
/// Format: `Details,Posting Date,Description,Amount,Type,Balance,Check or Slip #`
pub fn parse_chase(csv_text: &str) -> Vec<NewZelleTransaction> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(csv_text.as_bytes());

    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable Chase row: {}", e);
                continue;
            }
        };

        if record.len() < 4 {
            warn!("Skipping short Chase row ({} fields)", record.len());
            continue;
        }

        let date = match normalize_chase_date(record.get(1).unwrap_or("").trim()) {
            Some(d) => d,
            None => {
                warn!("Skipping Chase row with unparsable date: {:?}", record.get(1));
                continue;
            }
        };

        let description = record.get(2).unwrap_or("").trim().to_string();

        let amount = match parse_amount(record.get(3).unwrap_or("")) {
            Some(a) => a,
            None => {
                warn!(
                    "Skipping Chase row with unparsable amount: {:?}",
                    record.get(3)
                );
                continue;
            }
        };

        let kind = record.get(4).unwrap_or("").trim().to_string();

        let balance = record
            .get(5)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(parse_amount);

        // "Zelle payment from JOHN DOE" -> "JOHN DOE"; anything else keeps
        // the full description as the payer identifier.
        let payer_identifier = zelle_payer_regex()
            .captures(&description)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| description.clone());

        transactions.push(NewZelleTransaction {
            date,
            description,
            amount,
            kind,
            balance,
            payer_identifier,
        });
    }

    debug!("Parsed {} Chase transactions", transactions.len());
    transactions
}

/// Parse a Venmo statement export.
///
/// The first three lines are account preamble, not data. Data rows:
/// `,ID,Datetime,Type,Status,Note,From,To,Amount (total),Amount (fee),...`
///
/// Only incoming payments survive: rows must have a positive amount and
/// type `Payment`, which excludes outgoing transfers and cash-outs from
/// the receivable ledger.
pub fn parse_venmo(csv_text: &str) -> Vec<NewVenmoTransaction> {
    // Positional preamble skip: the first three physical lines go,
    // whatever they contain.
    let body = csv_text.splitn(4, '\n').nth(3).unwrap_or("");

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body.as_bytes());

    let mut transactions = Vec::new();

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping unreadable Venmo row: {}", e);
                continue;
            }
        };

        if record.len() < 9 {
            continue;
        }

        let datetime = record.get(2).unwrap_or("").trim().to_string();
        if datetime.is_empty() || !datetime.contains('T') {
            continue;
        }

        let kind = record.get(3).unwrap_or("").trim().to_string();
        let note = record.get(5).unwrap_or("").trim().to_string();
        let from_user = record.get(6).unwrap_or("").trim().to_string();
        let to_user = record.get(7).unwrap_or("").trim().to_string();

        // Venmo renders money as "$12.34"; a field without the currency
        // marker is a balance column or junk, so the row is dropped.
        let amount_str = record.get(8).unwrap_or("").trim();
        if !amount_str.starts_with('$') {
            continue;
        }
        let amount = match parse_amount(amount_str) {
            Some(a) => a,
            None => {
                warn!("Skipping Venmo row with unparsable amount: {}", amount_str);
                continue;
            }
        };

        let fee = record
            .get(9)
            .map(str::trim)
            .filter(|s| s.starts_with('$'))
            .and_then(parse_amount)
            .unwrap_or(0.0);

        let net_amount = amount - fee;

        if amount > 0.0 && kind == "Payment" {
            debug!(
                "Venmo payment: {} -> {}, ${:.2}",
                from_user, to_user, amount
            );
            transactions.push(NewVenmoTransaction {
                datetime,
                kind,
                note,
                from_user,
                to_user,
                amount,
                fee,
                net_amount,
            });
        }
    }

    debug!("Parsed {} Venmo transactions", transactions.len());
    transactions
}

/// Normalize a Chase `M/D/YY` or `M/D/YYYY` date to `YYYY-MM-DD`.
fn normalize_chase_date(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let month: u32 = parts[0].trim().parse().ok()?;
    let day: u32 = parts[1].trim().parse().ok()?;
    let year_part = parts[2].trim();
    let year: u32 = if year_part.len() == 2 {
        format!("20{}", year_part).parse().ok()?
    } else {
        year_part.parse().ok()?
    };
    Some(format!("{}-{:02}-{:02}", year, month, day))
}

/// Parse an amount string, stripping currency symbols and thousands commas
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().replace(['$', ','], "");
    cleaned.trim().parse::<f64>().ok()
}
