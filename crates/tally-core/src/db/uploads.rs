//! CSV upload audit records

use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{CsvFormat, CsvUpload};

fn row_to_upload(row: &Row) -> rusqlite::Result<CsvUpload> {
    let format_str: String = row.get(2)?;
    let detected_format = match format_str.as_str() {
        "chase" => CsvFormat::Chase,
        "venmo" => CsvFormat::Venmo,
        _ => CsvFormat::Unknown,
    };

    Ok(CsvUpload {
        id: row.get(0)?,
        filename: row.get(1)?,
        detected_format,
        records_parsed: row.get(3)?,
        new_records: row.get(4)?,
        updated_records: row.get(5)?,
        skipped_records: row.get(6)?,
        uploaded_by: row.get(7)?,
        uploaded_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

impl Database {
    /// Record one ingested CSV batch
    pub fn record_csv_upload(
        &self,
        filename: &str,
        format: CsvFormat,
        parsed: i64,
        new: i64,
        updated: i64,
        skipped: i64,
        uploaded_by: &str,
    ) -> Result<CsvUpload> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO csv_uploads
                (filename, detected_format, records_parsed, new_records,
                 updated_records, skipped_records, uploaded_by)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                filename,
                format.as_str(),
                parsed,
                new,
                updated,
                skipped,
                uploaded_by
            ],
        )?;
        let id = conn.last_insert_rowid();

        conn.query_row(
            "SELECT id, filename, detected_format, records_parsed, new_records,
                    updated_records, skipped_records, uploaded_by, uploaded_at
             FROM csv_uploads WHERE id = ?",
            params![id],
            row_to_upload,
        )
        .map_err(Error::from)
    }

    /// List uploads, newest first
    pub fn list_csv_uploads(&self) -> Result<Vec<CsvUpload>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, filename, detected_format, records_parsed, new_records,
                    updated_records, skipped_records, uploaded_by, uploaded_at
             FROM csv_uploads ORDER BY id DESC",
        )?;

        let uploads = stmt
            .query_map([], row_to_upload)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(uploads)
    }
}
