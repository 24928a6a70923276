//! Receipt text heuristics and the OCR capability seam
//!
//! OCR itself (image/PDF to text) is an external capability behind
//! [`OcrEngine`]; this module only interprets the resulting free-form text.
//! The heuristics are line-scanning and deliberately loose: payment-app
//! screenshots OCR messily, so the goal is a best-effort
//! `{amount, date, name}` triple, each part optional.

use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Fields extracted from OCR'd receipt text, each best-effort
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptFields {
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub name: Option<String>,
}

/// Converts a receipt file into text. Implementations never fail: any
/// error degrades to an empty string so order submission can proceed
/// with the order left Pending.
pub trait OcrEngine {
    fn extract_text(&self, path: &Path) -> String;
}

/// OCR via an external command (tesseract by default).
///
/// Invokes `<program> <file> stdout` and captures standard output. A
/// missing binary, a crash, or a non-zero exit all degrade to `""`.
pub struct CommandOcr {
    program: String,
}

impl CommandOcr {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for CommandOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl OcrEngine for CommandOcr {
    fn extract_text(&self, path: &Path) -> String {
        let output = Command::new(&self.program).arg(path).arg("stdout").output();

        match output {
            Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).into_owned(),
            Ok(out) => {
                warn!(
                    "OCR command {} exited with {}: {}",
                    self.program,
                    out.status,
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                String::new()
            }
            Err(e) => {
                warn!("OCR command {} failed to run: {}", self.program, e);
                String::new()
            }
        }
    }
}

/// Fixed-text engine for tests and dry runs
pub struct StaticOcr(pub String);

impl OcrEngine for StaticOcr {
    fn extract_text(&self, _path: &Path) -> String {
        self.0.clone()
    }
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Handles Venmo's "- $14" rendering as well as plain "$14.00"
    RE.get_or_init(|| Regex::new(r"[-+]?\s*\$?\s*(\d+\.?\d*)").unwrap())
}

/// Date patterns tried per line, in priority order. Each pairs a regex with
/// the chrono format that parses its capture.
fn date_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // January 28, 2025
            (Regex::new(r"(\w+ \d{1,2}, \d{4})").unwrap(), "%B %d, %Y"),
            // 01/28/2025
            (Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap(), "%m/%d/%Y"),
            // 2025-01-28
            (Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap(), "%Y-%m-%d"),
            // January 28, 2025, 7:16 PM (date part kept)
            (
                Regex::new(r"(\w+ \d{1,2}, \d{4}, \d{1,2}:\d{2} [AP]M)").unwrap(),
                "%B %d, %Y, %I:%M %p",
            ),
        ]
    })
}

/// Substrings that disqualify a line from being a payer name. These are
/// UI chrome on payment-app screenshots, not people.
const NAME_SKIP_WORDS: &[&str] = &[
    "complete",
    "status",
    "payment",
    "transaction",
    "details",
    "tickets",
    "event",
];

/// Narrower list used by the fallback pass, compared against the whole
/// lowercased line rather than as substrings.
const NAME_SKIP_LINES: &[&str] = &[
    "complete",
    "status",
    "payment",
    "transaction",
    "details",
    "tickets",
    "event",
];

/// Extract `{amount, date, name}` from OCR'd receipt text.
///
/// Scans lines in document order. The amount accumulator always
/// reassigns, so the LAST line containing a dollar figure wins: payment
/// apps print the total near the bottom, below intermediate figures.
/// Date and name are first-wins.
pub fn parse_receipt_text(text: &str) -> ReceiptFields {
    let mut amount = None;
    let mut date = None;
    let mut name = None;

    for raw in text.lines() {
        let line = raw.trim();

        if line.contains('$') {
            if let Some(caps) = amount_regex().captures(line) {
                if let Ok(value) = caps[1].parse::<f64>() {
                    debug!("Receipt amount candidate {} in line: {}", value, line);
                    amount = Some(value);
                }
            }
        }

        if date.is_none() {
            date = scan_line_for_date(line);
        }

        if name.is_none() {
            name = scan_line_for_name(line);
        }
    }

    // Fallback name pass with a narrower filter, for receipts where every
    // candidate line tripped the primary skip list.
    if name.is_none() {
        name = text.lines().map(str::trim).find_map(|line| {
            let ok = line.len() > 3
                && line.len() < 50
                && line.contains(' ')
                && !line.chars().any(|c| c.is_ascii_digit())
                && !NAME_SKIP_LINES.contains(&line.to_lowercase().as_str());
            if ok {
                debug!("Receipt name (fallback): {}", line);
                Some(line.to_string())
            } else {
                None
            }
        });
    }

    ReceiptFields { amount, date, name }
}

fn scan_line_for_date(line: &str) -> Option<NaiveDate> {
    for (re, fmt) in date_patterns() {
        if let Some(caps) = re.captures(line) {
            let matched = &caps[1];
            let parsed = if fmt.contains("%I") {
                chrono::NaiveDateTime::parse_from_str(matched, fmt)
                    .ok()
                    .map(|dt| dt.date())
            } else {
                NaiveDate::parse_from_str(matched, fmt).ok()
            };
            if let Some(d) = parsed {
                debug!("Receipt date {} in line: {}", d, line);
                return Some(d);
            }
        }
    }
    None
}

fn scan_line_for_name(line: &str) -> Option<String> {
    if line.len() <= 2 || line.len() >= 100 {
        return None;
    }

    // Email-shaped lines: reconstruct a display name from the local part
    if line.contains('@') && line.contains('.') {
        let local = line.split('@').next().unwrap_or("");
        let name = if local.contains('.') {
            local
                .split('.')
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            capitalize(local)
        };
        debug!("Receipt name from email: {} in line: {}", name, line);
        return Some(name);
    }

    // Plain full-name lines: spaced, digit-free, and not UI chrome
    let lower = line.to_lowercase();
    if line.contains(' ')
        && !line.chars().any(|c| c.is_ascii_digit())
        && !NAME_SKIP_WORDS.iter().any(|w| lower.contains(w))
    {
        debug!("Receipt name: {}", line);
        return Some(line.to_string());
    }

    None
}

/// Python-style capitalize: first char upper, rest lower
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_last_line_wins() {
        let fields = parse_receipt_text("Subtotal $10\nsomething\nTotal $25.00\n");
        assert_eq!(fields.amount, Some(25.0));
    }

    #[test]
    fn test_amount_venmo_negative_rendering() {
        // Venmo renders outgoing payments as "- $14"; the magnitude is kept
        let fields = parse_receipt_text("- $14\n");
        assert_eq!(fields.amount, Some(14.0));
    }

    #[test]
    fn test_amount_requires_dollar_sign_in_line() {
        let fields = parse_receipt_text("Total 25.00\n");
        assert_eq!(fields.amount, None);
    }

    #[test]
    fn test_date_long_month_format() {
        let fields = parse_receipt_text("Paid on January 28, 2025\n");
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 1, 28));
    }

    #[test]
    fn test_date_slash_format() {
        let fields = parse_receipt_text("01/28/2025\n");
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 1, 28));
    }

    #[test]
    fn test_date_iso_format() {
        let fields = parse_receipt_text("2025-01-28\n");
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 1, 28));
    }

    #[test]
    fn test_date_with_time_of_day() {
        let fields = parse_receipt_text("January 28, 2025, 7:16 PM\n");
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 1, 28));
    }

    #[test]
    fn test_date_first_line_wins() {
        let fields = parse_receipt_text("March 1, 2025\nMarch 2, 2025\n");
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 3, 1));
    }

    #[test]
    fn test_no_date_like_substring() {
        let fields = parse_receipt_text("just words here\nno dates at all\n");
        assert_eq!(fields.date, None);
    }

    #[test]
    fn test_name_from_email() {
        let fields = parse_receipt_text("alex.kim@example.com\n");
        assert_eq!(fields.name.as_deref(), Some("Alex Kim"));
    }

    #[test]
    fn test_name_from_email_without_dotted_local() {
        let fields = parse_receipt_text("jordan@example.com\n");
        assert_eq!(fields.name.as_deref(), Some("Jordan"));
    }

    #[test]
    fn test_name_plain_line() {
        let fields = parse_receipt_text("Payment Complete\nAlex Kim\n");
        assert_eq!(fields.name.as_deref(), Some("Alex Kim"));
    }

    #[test]
    fn test_name_skips_ui_chrome() {
        // Both lines trip the primary skip list as substrings. The fallback
        // pass compares whole lines only, so "Transaction Details" comes
        // back as a (wrong) best-effort name.
        let fields = parse_receipt_text("Transaction Details\nPayment Complete\n");
        assert_eq!(fields.name.as_deref(), Some("Transaction Details"));
    }

    #[test]
    fn test_name_skips_lines_with_digits() {
        let fields = parse_receipt_text("Alex Kim 42\n");
        assert_eq!(fields.name, None);
    }

    #[test]
    fn test_full_venmo_screenshot() {
        let text = "Venmo\n\
            Payment Complete\n\
            Alex Kim\n\
            alex.kim@example.com\n\
            - $28.00\n\
            January 28, 2025, 7:16 PM\n";
        let fields = parse_receipt_text(text);
        assert_eq!(fields.amount, Some(28.0));
        assert_eq!(fields.date, NaiveDate::from_ymd_opt(2025, 1, 28));
        assert_eq!(fields.name.as_deref(), Some("Alex Kim"));
    }

    #[test]
    fn test_static_ocr() {
        let engine = StaticOcr("Total $5\n".to_string());
        assert_eq!(engine.extract_text(Path::new("x")), "Total $5\n");
    }

    #[test]
    fn test_command_ocr_missing_binary_returns_empty() {
        let engine = CommandOcr::new("definitely-not-a-real-ocr-binary");
        assert_eq!(engine.extract_text(Path::new("whatever.png")), "");
    }
}
