//! Domain models for Tally

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a ticket order.
///
/// Only `Pending` orders transition automatically (via the matcher).
/// Everything else is an admin action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Awaiting payment verification
    Pending,
    /// A matching ledger transaction was found
    Verified,
    /// Receipt data present but no matching transaction
    Flagged,
    /// Rejected by an admin
    Rejected,
    /// Verified and fulfilled by an admin
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }

    /// Whether the matcher is allowed to move this order.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Whether an admin may move an order from `self` to `to`.
    ///
    /// Any state may be rejected; only verified orders may be completed.
    /// Completed and Rejected are terminal for automatic transitions but an
    /// admin may still reject a completed order.
    pub fn admin_can_set(&self, to: OrderStatus) -> bool {
        match to {
            Self::Rejected => true,
            Self::Completed => matches!(self, Self::Verified),
            _ => false,
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "flagged" => Ok(Self::Flagged),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Unknown order status: {}", s)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pricing period. Ticket prices are snapshotted from the wave that is
/// active when an order is submitted and never recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_boy: f64,
    pub price_girl: f64,
}

/// A customer ticket order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// Public identifier handed to the customer
    pub uuid: String,
    pub name: String,
    pub email: String,
    pub referral: Option<String>,
    pub boys_count: i64,
    pub girls_count: i64,
    pub wave_id: i64,
    /// Price snapshot computed at submission from the wave's prices
    pub expected_amount: f64,
    /// Amount extracted from the uploaded receipt, if any
    pub ocr_amount: Option<f64>,
    /// Date extracted from the uploaded receipt, if any
    pub ocr_date: Option<NaiveDate>,
    /// Payer name extracted from the uploaded receipt, if any
    pub ocr_name: Option<String>,
    pub status: OrderStatus,
    pub receipt_path: Option<String>,
    /// SHA-256 of the receipt file, for duplicate-receipt detection
    pub receipt_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A Venmo export row kept in the receivable ledger.
///
/// Natural key: (datetime, from_user, to_user, amount).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenmoTransaction {
    pub id: i64,
    /// ISO datetime string as exported, e.g. "2025-03-24T15:50:20"
    pub datetime: String,
    pub kind: String,
    pub note: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
    /// Filename of the CSV batch this row last arrived in
    pub source_csv: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A parsed Venmo row before DB insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewVenmoTransaction {
    pub datetime: String,
    pub kind: String,
    pub note: String,
    pub from_user: String,
    pub to_user: String,
    pub amount: f64,
    pub fee: f64,
    pub net_amount: f64,
}

/// A Zelle credit parsed from a Chase export.
///
/// Natural key: (date, description, amount, payer_identifier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZelleTransaction {
    pub id: i64,
    /// Normalized posting date, YYYY-MM-DD
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: String,
    pub balance: Option<f64>,
    /// Sender name pulled from "Zelle payment from ...", or the raw
    /// description when the pattern is absent
    pub payer_identifier: String,
    pub source_csv: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A parsed Chase row before DB insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewZelleTransaction {
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub kind: String,
    pub balance: Option<f64>,
    pub payer_identifier: String,
}

/// Detected CSV export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvFormat {
    Chase,
    Venmo,
    Unknown,
}

impl CsvFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chase => "chase",
            Self::Venmo => "venmo",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CsvFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of one CSV ingestion. Not consulted by matching logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvUpload {
    pub id: i64,
    pub filename: String,
    pub detected_format: CsvFormat,
    pub records_parsed: i64,
    pub new_records: i64,
    pub updated_records: i64,
    pub skipped_records: i64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Admin action audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub actor: String,
    pub action: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_roundtrip() {
        for s in ["pending", "verified", "flagged", "rejected", "completed"] {
            let status: OrderStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_admin_transitions() {
        // Anything can be rejected
        assert!(OrderStatus::Pending.admin_can_set(OrderStatus::Rejected));
        assert!(OrderStatus::Completed.admin_can_set(OrderStatus::Rejected));

        // Only verified orders complete
        assert!(OrderStatus::Verified.admin_can_set(OrderStatus::Completed));
        assert!(!OrderStatus::Pending.admin_can_set(OrderStatus::Completed));
        assert!(!OrderStatus::Flagged.admin_can_set(OrderStatus::Completed));

        // Admins never set matcher-owned states directly
        assert!(!OrderStatus::Pending.admin_can_set(OrderStatus::Verified));
        assert!(!OrderStatus::Verified.admin_can_set(OrderStatus::Flagged));
    }
}
