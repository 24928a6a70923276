//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `waves` - Pricing wave operations
//! - `orders` - Order CRUD, status transitions, admin actions
//! - `transactions` - Venmo/Zelle ledger upserts and match queries
//! - `uploads` - CSV upload audit records

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use crate::error::Result;
use crate::models::AuditEntry;

mod orders;
mod transactions;
mod uploads;
mod waves;

pub(crate) use orders::NewOrder;
pub use transactions::UpsertOutcome;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool and run migrations
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database for testing.
    ///
    /// Uses a temp file rather than `:memory:` because each pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/tally_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Record an admin action in the audit log
    pub fn log_audit(&self, actor: &str, action: &str, details: Option<&str>) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO audit_log (actor, action, details) VALUES (?, ?, ?)",
            params![actor, action, details],
        )?;
        Ok(())
    }

    /// List recent audit entries, newest first
    pub fn list_audit(&self, limit: i64) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, actor, action, details, created_at
             FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    actor: row.get(1)?,
                    action: row.get(2)?,
                    details: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            -- Pricing waves
            CREATE TABLE IF NOT EXISTS waves (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                start_date DATE NOT NULL,
                end_date DATE NOT NULL,
                price_boy REAL NOT NULL,
                price_girl REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_waves_dates ON waves(start_date, end_date);

            -- Ticket orders
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY,
                uuid TEXT UNIQUE NOT NULL,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                referral TEXT,
                boys_count INTEGER NOT NULL,
                girls_count INTEGER NOT NULL,
                wave_id INTEGER NOT NULL REFERENCES waves(id),
                expected_amount REAL NOT NULL,      -- price snapshot at submission
                ocr_amount REAL,
                ocr_date DATE,
                ocr_name TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                receipt_path TEXT,
                receipt_hash TEXT,                  -- SHA-256 of the receipt file
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
            CREATE INDEX IF NOT EXISTS idx_orders_wave ON orders(wave_id);
            CREATE INDEX IF NOT EXISTS idx_orders_receipt_hash ON orders(receipt_hash);

            -- Venmo receivable ledger
            CREATE TABLE IF NOT EXISTS venmo_transactions (
                id INTEGER PRIMARY KEY,
                datetime TEXT NOT NULL,             -- ISO datetime as exported
                kind TEXT NOT NULL,
                note TEXT NOT NULL DEFAULT '',
                from_user TEXT NOT NULL DEFAULT '',
                to_user TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                fee REAL NOT NULL DEFAULT 0,
                net_amount REAL NOT NULL,
                source_csv TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(datetime, from_user, to_user, amount)
            );

            CREATE INDEX IF NOT EXISTS idx_venmo_amount ON venmo_transactions(amount);
            CREATE INDEX IF NOT EXISTS idx_venmo_datetime ON venmo_transactions(datetime);

            -- Zelle credits parsed from Chase exports
            CREATE TABLE IF NOT EXISTS zelle_transactions (
                id INTEGER PRIMARY KEY,
                date TEXT NOT NULL,                 -- YYYY-MM-DD
                description TEXT NOT NULL DEFAULT '',
                amount REAL NOT NULL,
                kind TEXT NOT NULL DEFAULT '',
                balance REAL,
                payer_identifier TEXT NOT NULL DEFAULT '',
                source_csv TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(date, description, amount, payer_identifier)
            );

            CREATE INDEX IF NOT EXISTS idx_zelle_amount_date ON zelle_transactions(amount, date);

            -- CSV upload audit trail (not consulted by matching)
            CREATE TABLE IF NOT EXISTS csv_uploads (
                id INTEGER PRIMARY KEY,
                filename TEXT NOT NULL,
                detected_format TEXT NOT NULL,
                records_parsed INTEGER NOT NULL DEFAULT 0,
                new_records INTEGER NOT NULL DEFAULT 0,
                updated_records INTEGER NOT NULL DEFAULT 0,
                skipped_records INTEGER NOT NULL DEFAULT 0,
                uploaded_by TEXT NOT NULL,
                uploaded_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Admin action audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                actor TEXT NOT NULL,
                action TEXT NOT NULL,
                details TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_audit_log_action ON audit_log(action);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
