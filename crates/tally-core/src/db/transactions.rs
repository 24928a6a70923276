//! Ledger upserts and the match queries the reconciler runs

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{
    NewVenmoTransaction, NewZelleTransaction, VenmoTransaction, ZelleTransaction,
};

/// Result of upserting one ledger row by its natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

fn row_to_venmo(row: &Row) -> rusqlite::Result<VenmoTransaction> {
    Ok(VenmoTransaction {
        id: row.get(0)?,
        datetime: row.get(1)?,
        kind: row.get(2)?,
        note: row.get(3)?,
        from_user: row.get(4)?,
        to_user: row.get(5)?,
        amount: row.get(6)?,
        fee: row.get(7)?,
        net_amount: row.get(8)?,
        source_csv: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

fn row_to_zelle(row: &Row) -> rusqlite::Result<ZelleTransaction> {
    Ok(ZelleTransaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        amount: row.get(3)?,
        kind: row.get(4)?,
        balance: row.get(5)?,
        payer_identifier: row.get(6)?,
        source_csv: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

const VENMO_COLS: &str = "id, datetime, kind, note, from_user, to_user, amount, fee, \
     net_amount, source_csv, created_at, updated_at";

const ZELLE_COLS: &str = "id, date, description, amount, kind, balance, payer_identifier, \
     source_csv, created_at, updated_at";

impl Database {
    /// Upsert a Venmo row by its natural key (datetime, from, to, amount).
    ///
    /// Re-ingesting a CSV containing the same transaction refreshes the
    /// mutable columns instead of duplicating the row, so exports that
    /// overlap in time range stay idempotent.
    pub fn upsert_venmo_transaction(
        &self,
        tx: &NewVenmoTransaction,
        source_csv: &str,
    ) -> Result<UpsertOutcome> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM venmo_transactions
                 WHERE datetime = ? AND from_user = ? AND to_user = ? AND amount = ?",
                params![tx.datetime, tx.from_user, tx.to_user, tx.amount],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE venmo_transactions
                     SET kind = ?, note = ?, fee = ?, net_amount = ?, source_csv = ?,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?",
                    params![tx.kind, tx.note, tx.fee, tx.net_amount, source_csv, id],
                )?;
                debug!("Updated venmo transaction {}", id);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                conn.execute(
                    "INSERT INTO venmo_transactions
                        (datetime, kind, note, from_user, to_user, amount, fee,
                         net_amount, source_csv)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params![
                        tx.datetime,
                        tx.kind,
                        tx.note,
                        tx.from_user,
                        tx.to_user,
                        tx.amount,
                        tx.fee,
                        tx.net_amount,
                        source_csv,
                    ],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// Upsert a Zelle row by its natural key (date, description, amount,
    /// payer).
    pub fn upsert_zelle_transaction(
        &self,
        tx: &NewZelleTransaction,
        source_csv: &str,
    ) -> Result<UpsertOutcome> {
        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM zelle_transactions
                 WHERE date = ? AND description = ? AND amount = ? AND payer_identifier = ?",
                params![tx.date, tx.description, tx.amount, tx.payer_identifier],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE zelle_transactions
                     SET kind = ?, balance = ?, source_csv = ?,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?",
                    params![tx.kind, tx.balance, source_csv, id],
                )?;
                debug!("Updated zelle transaction {}", id);
                Ok(UpsertOutcome::Updated)
            }
            None => {
                conn.execute(
                    "INSERT INTO zelle_transactions
                        (date, description, amount, kind, balance, payer_identifier,
                         source_csv)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    params![
                        tx.date,
                        tx.description,
                        tx.amount,
                        tx.kind,
                        tx.balance,
                        tx.payer_identifier,
                        source_csv,
                    ],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    /// List Venmo transactions, newest first
    pub fn list_venmo_transactions(&self) -> Result<Vec<VenmoTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM venmo_transactions ORDER BY datetime DESC",
            VENMO_COLS
        ))?;

        let txs = stmt
            .query_map([], row_to_venmo)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// List Zelle transactions, newest first
    pub fn list_zelle_transactions(&self) -> Result<Vec<ZelleTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM zelle_transactions ORDER BY date DESC, id DESC",
            ZELLE_COLS
        ))?;

        let txs = stmt
            .query_map([], row_to_zelle)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(txs)
    }

    /// Whether either ledger holds a transaction of exactly `amount`
    /// on the given day. Venmo datetimes are ISO strings, so the day
    /// check is a prefix match.
    pub fn has_date_amount_match(&self, amount: f64, date: &str) -> Result<bool> {
        let conn = self.conn()?;

        let venmo: i64 = conn.query_row(
            "SELECT COUNT(*) FROM venmo_transactions
             WHERE amount = ? AND datetime LIKE ?",
            params![amount, format!("{}%", date)],
            |row| row.get(0),
        )?;
        if venmo > 0 {
            return Ok(true);
        }

        let zelle: i64 = conn.query_row(
            "SELECT COUNT(*) FROM zelle_transactions WHERE amount = ? AND date = ?",
            params![amount, date],
            |row| row.get(0),
        )?;

        Ok(zelle > 0)
    }

    /// Whether either ledger holds a transaction within a cent of
    /// `amount` whose counterparty text contains `name` or `email`
    /// (case-insensitive substring). Dates are ignored in this mode.
    pub fn has_fuzzy_name_amount_match(
        &self,
        amount: f64,
        name: &str,
        email: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;

        let name_pat = format!("%{}%", name);
        let email_pat = format!("%{}%", email);

        let venmo: i64 = conn.query_row(
            "SELECT COUNT(*) FROM venmo_transactions
             WHERE ABS(amount - ?) < 0.01
               AND (from_user LIKE ? OR note LIKE ? OR from_user LIKE ? OR note LIKE ?)",
            params![amount, name_pat, name_pat, email_pat, email_pat],
            |row| row.get(0),
        )?;
        if venmo > 0 {
            return Ok(true);
        }

        let zelle: i64 = conn.query_row(
            "SELECT COUNT(*) FROM zelle_transactions
             WHERE ABS(amount - ?) < 0.01
               AND (payer_identifier LIKE ? OR description LIKE ?
                    OR payer_identifier LIKE ? OR description LIKE ?)",
            params![amount, name_pat, name_pat, email_pat, email_pat],
            |row| row.get(0),
        )?;

        Ok(zelle > 0)
    }
}
