//! Order intake: form validation, price snapshot, receipt processing

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{Database, NewOrder};
use crate::error::{Error, Result};
use crate::matching::{MatchMode, Reconciler};
use crate::models::Order;
use crate::receipt::{parse_receipt_text, OcrEngine, ReceiptFields};

/// A customer's order submission
#[derive(Debug, Clone)]
pub struct OrderForm {
    pub name: String,
    pub email: String,
    pub referral: Option<String>,
    pub boys_count: i64,
    pub girls_count: i64,
    pub receipt_path: Option<PathBuf>,
}

fn validate(form: &OrderForm) -> Result<()> {
    if form.name.trim().is_empty() {
        return Err(Error::InvalidData("Name is required".into()));
    }
    if form.email.trim().is_empty() || !form.email.contains('@') {
        return Err(Error::InvalidData("A valid email is required".into()));
    }
    if form.boys_count < 0 || form.girls_count < 0 {
        return Err(Error::InvalidData("Ticket counts must be non-negative".into()));
    }
    if form.boys_count + form.girls_count == 0 {
        return Err(Error::InvalidData("Order must include at least one ticket".into()));
    }
    Ok(())
}

fn hash_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(hex::encode(digest))
}

/// Submit an order.
///
/// Prices come from the wave covering today's date and are snapshotted
/// onto the order. When a receipt is attached it is hashed and OCR'd;
/// if both an amount and a date come out of the text, the order is
/// matched immediately. OCR failure is not submission failure: the
/// order lands as Pending with empty receipt fields.
pub fn submit_order(
    db: &Database,
    ocr: &dyn OcrEngine,
    mode: MatchMode,
    form: &OrderForm,
) -> Result<Order> {
    validate(form)?;

    let today = Utc::now().date_naive();
    let wave = db.current_wave(today)?.ok_or(Error::NoActiveWave)?;

    let expected =
        form.boys_count as f64 * wave.price_boy + form.girls_count as f64 * wave.price_girl;

    let mut fields = ReceiptFields::default();
    let mut receipt_hash = None;

    if let Some(path) = &form.receipt_path {
        let hash = hash_file(path)?;
        let dupes = db.find_by_receipt_hash(&hash)?;
        if !dupes.is_empty() {
            // Flag for humans, but never block the submission
            warn!(
                "Receipt {} already attached to {} existing order(s)",
                hash,
                dupes.len()
            );
        }
        receipt_hash = Some(hash);

        let text = ocr.extract_text(path);
        fields = parse_receipt_text(&text);
        info!(
            "Receipt OCR for {}: amount={:?} date={:?} name={:?}",
            path.display(),
            fields.amount,
            fields.date,
            fields.name
        );
    }

    let receipt_path_str = form
        .receipt_path
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());

    let uuid = Uuid::new_v4().to_string();
    let order = db.insert_order(&NewOrder {
        uuid: &uuid,
        name: form.name.trim(),
        email: form.email.trim(),
        referral: form.referral.as_deref(),
        boys_count: form.boys_count,
        girls_count: form.girls_count,
        wave_id: wave.id,
        expected_amount: expected,
        ocr_amount: fields.amount,
        ocr_date: fields.date,
        ocr_name: fields.name.as_deref(),
        receipt_path: receipt_path_str.as_deref(),
        receipt_hash: receipt_hash.as_deref(),
    })?;

    info!(
        "Order {} submitted by {} for ${:.2} (wave {})",
        order.uuid, order.email, expected, wave.name
    );

    if order.ocr_amount.is_some() && order.ocr_date.is_some() {
        Reconciler::new(db, mode).match_order(&order)?;
        return db.get_order(order.id);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewVenmoTransaction, OrderStatus};
    use crate::receipt::StaticOcr;
    use chrono::{Duration, NaiveDate};
    use std::io::Write;

    fn db_with_current_wave() -> Database {
        let db = Database::in_memory().unwrap();
        let today = Utc::now().date_naive();
        db.create_wave(
            "Current",
            today - Duration::days(7),
            today + Duration::days(7),
            15.0,
            10.0,
        )
        .unwrap();
        db
    }

    fn form(receipt: Option<PathBuf>) -> OrderForm {
        OrderForm {
            name: "Alex Kim".to_string(),
            email: "alex.kim@example.com".to_string(),
            referral: Some("friend".to_string()),
            boys_count: 1,
            girls_count: 1,
            receipt_path: receipt,
        }
    }

    fn receipt_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_submit_without_receipt_is_pending() {
        let db = db_with_current_wave();
        let ocr = StaticOcr(String::new());

        let order = submit_order(&db, &ocr, MatchMode::DateAmount, &form(None)).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.expected_amount, 25.0);
        assert_eq!(order.ocr_amount, None);
        assert!(order.receipt_hash.is_none());
    }

    #[test]
    fn test_submit_no_active_wave() {
        let db = Database::in_memory().unwrap();
        db.create_wave(
            "Past",
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap(),
            10.0,
            10.0,
        )
        .unwrap();
        let ocr = StaticOcr(String::new());

        assert!(matches!(
            submit_order(&db, &ocr, MatchMode::DateAmount, &form(None)),
            Err(Error::NoActiveWave)
        ));
    }

    #[test]
    fn test_submit_validation() {
        let db = db_with_current_wave();
        let ocr = StaticOcr(String::new());

        let mut bad = form(None);
        bad.email = "not-an-email".to_string();
        assert!(submit_order(&db, &ocr, MatchMode::DateAmount, &bad).is_err());

        let mut empty = form(None);
        empty.boys_count = 0;
        empty.girls_count = 0;
        assert!(submit_order(&db, &ocr, MatchMode::DateAmount, &empty).is_err());
    }

    #[test]
    fn test_submit_with_matching_receipt_verifies() {
        let db = db_with_current_wave();
        db.upsert_venmo_transaction(
            &NewVenmoTransaction {
                datetime: "2025-03-24T15:50:20".to_string(),
                kind: "Payment".to_string(),
                note: "tickets".to_string(),
                from_user: "Alex Kim".to_string(),
                to_user: "Event Account".to_string(),
                amount: 25.0,
                fee: 0.0,
                net_amount: 25.0,
            },
            "a.csv",
        )
        .unwrap();

        let file = receipt_file("fake image bytes");
        let ocr = StaticOcr("Alex Kim\n$25.00\nMarch 24, 2025\n".to_string());

        let order = submit_order(
            &db,
            &ocr,
            MatchMode::DateAmount,
            &form(Some(file.path().to_path_buf())),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Verified);
        assert_eq!(order.ocr_amount, Some(25.0));
        assert!(order.receipt_hash.is_some());
    }

    #[test]
    fn test_submit_with_unmatched_receipt_flags() {
        let db = db_with_current_wave();
        let file = receipt_file("fake image bytes");
        let ocr = StaticOcr("Alex Kim\n$25.00\nMarch 24, 2025\n".to_string());

        let order = submit_order(
            &db,
            &ocr,
            MatchMode::DateAmount,
            &form(Some(file.path().to_path_buf())),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Flagged);
    }

    #[test]
    fn test_submit_with_unreadable_ocr_stays_pending() {
        let db = db_with_current_wave();
        let file = receipt_file("fake image bytes");
        // Engine produced no usable text
        let ocr = StaticOcr(String::new());

        let order = submit_order(
            &db,
            &ocr,
            MatchMode::DateAmount,
            &form(Some(file.path().to_path_buf())),
        )
        .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        // The hash is still recorded even when OCR yields nothing
        assert!(order.receipt_hash.is_some());
    }

    #[test]
    fn test_duplicate_receipt_still_submits() {
        let db = db_with_current_wave();
        let file = receipt_file("same bytes both times");
        let ocr = StaticOcr(String::new());

        let first = submit_order(
            &db,
            &ocr,
            MatchMode::DateAmount,
            &form(Some(file.path().to_path_buf())),
        )
        .unwrap();
        let second = submit_order(
            &db,
            &ocr,
            MatchMode::DateAmount,
            &form(Some(file.path().to_path_buf())),
        )
        .unwrap();

        assert_eq!(first.receipt_hash, second.receipt_hash);
        assert_ne!(first.uuid, second.uuid);
    }
}
