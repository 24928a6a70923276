//! Payment matching between orders and the transaction ledgers

use tracing::{debug, info};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Order, OrderStatus};

/// How receipt data is compared against the ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Exact amount on the receipt's date. The strict default.
    #[default]
    DateAmount,
    /// Amount within a cent of the order's expected total, and the
    /// customer's name or email appearing in the transaction's
    /// counterparty text. Dates are ignored; receipts are often
    /// screenshotted days after payment.
    FuzzyNameAmount,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DateAmount => "date-amount",
            Self::FuzzyNameAmount => "fuzzy-name-amount",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "date-amount" | "date_amount" => Ok(Self::DateAmount),
            "fuzzy-name-amount" | "fuzzy_name_amount" | "fuzzy" => Ok(Self::FuzzyNameAmount),
            _ => Err(format!("Unknown match mode: {}", s)),
        }
    }
}

/// Runs match attempts and applies the resulting status transitions.
///
/// Only `Pending` orders move. `Flagged` stays put until an admin acts
/// or the order's details change; re-running the matcher never
/// re-litigates a flag on its own.
pub struct Reconciler<'a> {
    db: &'a Database,
    mode: MatchMode,
}

impl<'a> Reconciler<'a> {
    pub fn new(db: &'a Database, mode: MatchMode) -> Self {
        Self { db, mode }
    }

    /// Attempt to match one order, persisting the resulting status.
    ///
    /// Returns the order's status after the attempt. Orders that are not
    /// pending, or that lack receipt data, are left untouched.
    pub fn match_order(&self, order: &Order) -> Result<OrderStatus> {
        if !order.status.is_pending() {
            debug!("Order {} is {}, skipping match", order.id, order.status);
            return Ok(order.status);
        }

        let (amount, date) = match (order.ocr_amount, order.ocr_date) {
            (Some(a), Some(d)) => (a, d),
            _ => {
                debug!("Order {} has no usable receipt data", order.id);
                return Ok(OrderStatus::Pending);
            }
        };

        let matched = match self.mode {
            MatchMode::DateAmount => self
                .db
                .has_date_amount_match(amount, &date.format("%Y-%m-%d").to_string())?,
            MatchMode::FuzzyNameAmount => self.db.has_fuzzy_name_amount_match(
                order.expected_amount,
                &order.name,
                &order.email,
            )?,
        };

        let status = if matched {
            OrderStatus::Verified
        } else {
            OrderStatus::Flagged
        };

        self.db.update_order_status(order.id, status)?;
        info!(
            "Order {} matched via {}: {}",
            order.id,
            self.mode.as_str(),
            status
        );

        Ok(status)
    }

    /// Re-run matching over every pending order with receipt data.
    /// Returns how many orders were verified.
    pub fn rerun_matching(&self) -> Result<usize> {
        let candidates = self.db.find_pending_with_ocr()?;
        let total = candidates.len();

        let mut verified = 0;
        for order in &candidates {
            if self.match_order(order)? == OrderStatus::Verified {
                verified += 1;
            }
        }

        info!(
            "Re-ran matching over {} pending orders, {} verified",
            total, verified
        );
        Ok(verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewVenmoTransaction, NewZelleTransaction};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn setup() -> (Database, Order) {
        let db = Database::in_memory().unwrap();
        let wave = db
            .create_wave("Wave 1", d("2025-01-01"), d("2025-12-31"), 15.0, 10.0)
            .unwrap();

        let order = db
            .insert_order(&crate::db::NewOrder {
                uuid: "u-1",
                name: "Alex Kim",
                email: "alex.kim@example.com",
                referral: None,
                boys_count: 1,
                girls_count: 1,
                wave_id: wave.id,
                expected_amount: 25.0,
                ocr_amount: Some(25.0),
                ocr_date: Some(d("2025-03-24")),
                ocr_name: Some("Alex Kim"),
                receipt_path: None,
                receipt_hash: None,
            })
            .unwrap();

        (db, order)
    }

    fn venmo_payment(amount: f64, from: &str) -> NewVenmoTransaction {
        NewVenmoTransaction {
            datetime: "2025-03-24T15:50:20".to_string(),
            kind: "Payment".to_string(),
            note: "tickets".to_string(),
            from_user: from.to_string(),
            to_user: "Event Account".to_string(),
            amount,
            fee: 0.0,
            net_amount: amount,
        }
    }

    #[test]
    fn test_date_amount_verifies() {
        let (db, order) = setup();
        db.upsert_venmo_transaction(&venmo_payment(25.0, "Somebody"), "a.csv")
            .unwrap();

        let status = Reconciler::new(&db, MatchMode::DateAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Verified);
        assert_eq!(db.get_order(order.id).unwrap().status, OrderStatus::Verified);
    }

    #[test]
    fn test_date_amount_flags_when_no_ledger_row() {
        let (db, order) = setup();

        let status = Reconciler::new(&db, MatchMode::DateAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Flagged);
    }

    #[test]
    fn test_date_amount_wrong_day_flags() {
        let (db, order) = setup();
        let mut tx = venmo_payment(25.0, "Alex Kim");
        tx.datetime = "2025-03-25T10:00:00".to_string();
        db.upsert_venmo_transaction(&tx, "a.csv").unwrap();

        let status = Reconciler::new(&db, MatchMode::DateAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Flagged);
    }

    #[test]
    fn test_fuzzy_matches_on_expected_amount_and_name() {
        let (db, order) = setup();
        // Wrong day, right name, right expected total
        let mut tx = venmo_payment(25.0, "alex kim");
        tx.datetime = "2025-04-01T10:00:00".to_string();
        db.upsert_venmo_transaction(&tx, "a.csv").unwrap();

        let status = Reconciler::new(&db, MatchMode::FuzzyNameAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Verified);
    }

    #[test]
    fn test_fuzzy_flags_on_name_mismatch() {
        let (db, order) = setup();
        db.upsert_venmo_transaction(&venmo_payment(25.0, "Somebody Else"), "a.csv")
            .unwrap();

        let status = Reconciler::new(&db, MatchMode::FuzzyNameAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Flagged);
    }

    #[test]
    fn test_fuzzy_matches_zelle_payer() {
        let (db, order) = setup();
        db.upsert_zelle_transaction(
            &NewZelleTransaction {
                date: "2025-05-01".to_string(),
                description: "Zelle payment from ALEX KIM 99".to_string(),
                amount: 25.0,
                kind: "CREDIT".to_string(),
                balance: None,
                payer_identifier: "ALEX KIM 99".to_string(),
            },
            "chase.csv",
        )
        .unwrap();

        let status = Reconciler::new(&db, MatchMode::FuzzyNameAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Verified);
    }

    #[test]
    fn test_non_pending_orders_are_untouched() {
        let (db, order) = setup();
        db.update_order_status(order.id, OrderStatus::Flagged)
            .unwrap();
        db.upsert_venmo_transaction(&venmo_payment(25.0, "Alex Kim"), "a.csv")
            .unwrap();

        let flagged = db.get_order(order.id).unwrap();
        let status = Reconciler::new(&db, MatchMode::DateAmount)
            .match_order(&flagged)
            .unwrap();
        // Flagged stays flagged until an admin intervenes
        assert_eq!(status, OrderStatus::Flagged);
    }

    #[test]
    fn test_missing_receipt_data_stays_pending() {
        let (db, order) = setup();
        db.upsert_venmo_transaction(&venmo_payment(25.0, "Alex Kim"), "a.csv")
            .unwrap();

        let conn = db.conn().unwrap();
        conn.execute(
            "UPDATE orders SET ocr_amount = NULL WHERE id = ?",
            rusqlite::params![order.id],
        )
        .unwrap();
        drop(conn);

        let order = db.get_order(order.id).unwrap();
        let status = Reconciler::new(&db, MatchMode::DateAmount)
            .match_order(&order)
            .unwrap();
        assert_eq!(status, OrderStatus::Pending);
        assert_eq!(db.get_order(order.id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_rerun_matching_counts_verified() {
        let (db, _order) = setup();
        db.upsert_venmo_transaction(&venmo_payment(25.0, "Alex Kim"), "a.csv")
            .unwrap();

        let verified = Reconciler::new(&db, MatchMode::DateAmount)
            .rerun_matching()
            .unwrap();
        assert_eq!(verified, 1);

        // Nothing pending remains, so a second run verifies nothing
        let verified = Reconciler::new(&db, MatchMode::DateAmount)
            .rerun_matching()
            .unwrap();
        assert_eq!(verified, 0);
    }
}
