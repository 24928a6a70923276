//! Tally Core Library
//!
//! Shared functionality for the Tally ticket payment reconciliation tool:
//! - Database access and migrations
//! - CSV format detection and parsers for Chase and Venmo exports
//! - OCR receipt text extraction heuristics
//! - Order intake with wave-based price snapshots
//! - Payment matching between orders and the transaction ledgers

pub mod db;
pub mod error;
pub mod import;
pub mod ingest;
pub mod intake;
pub mod matching;
pub mod models;
pub mod receipt;

pub use db::{Database, UpsertOutcome};
pub use error::{Error, Result};
pub use import::{detect_format, parse_chase, parse_transactions, parse_venmo, ParsedBatch};
pub use ingest::{ingest_csv, IngestReport};
pub use intake::{submit_order, OrderForm};
pub use matching::{MatchMode, Reconciler};
pub use models::{
    AuditEntry, CsvFormat, CsvUpload, NewVenmoTransaction, NewZelleTransaction, Order,
    OrderStatus, VenmoTransaction, Wave, ZelleTransaction,
};
pub use receipt::{parse_receipt_text, CommandOcr, OcrEngine, ReceiptFields, StaticOcr};
