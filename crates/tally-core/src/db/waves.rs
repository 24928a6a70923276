//! Pricing wave operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::Database;
use crate::error::{Error, Result};
use crate::models::Wave;

fn row_to_wave(row: &Row) -> rusqlite::Result<Wave> {
    Ok(Wave {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: row.get(2)?,
        end_date: row.get(3)?,
        price_boy: row.get(4)?,
        price_girl: row.get(5)?,
    })
}

const WAVE_COLS: &str = "id, name, start_date, end_date, price_boy, price_girl";

impl Database {
    /// Create a pricing wave
    pub fn create_wave(
        &self,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        price_boy: f64,
        price_girl: f64,
    ) -> Result<Wave> {
        if end_date < start_date {
            return Err(Error::InvalidData(format!(
                "Wave end date {} is before start date {}",
                end_date, start_date
            )));
        }
        if price_boy < 0.0 || price_girl < 0.0 {
            return Err(Error::InvalidData("Wave prices must be non-negative".into()));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO waves (name, start_date, end_date, price_boy, price_girl)
             VALUES (?, ?, ?, ?, ?)",
            params![name, start_date, end_date, price_boy, price_girl],
        )?;
        let id = conn.last_insert_rowid();

        info!("Created wave {} ({} to {})", name, start_date, end_date);

        self.get_wave(id)
    }

    /// Get a wave by id
    pub fn get_wave(&self, id: i64) -> Result<Wave> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM waves WHERE id = ?", WAVE_COLS),
            params![id],
            row_to_wave,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Wave {}", id)))
    }

    /// List all waves ordered by start date
    pub fn list_waves(&self) -> Result<Vec<Wave>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM waves ORDER BY start_date, id",
            WAVE_COLS
        ))?;

        let waves = stmt
            .query_map([], row_to_wave)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(waves)
    }

    /// The wave whose date range covers `date`. When ranges overlap, the
    /// most recently created wave wins.
    pub fn current_wave(&self, date: NaiveDate) -> Result<Option<Wave>> {
        let conn = self.conn()?;
        let wave = conn
            .query_row(
                &format!(
                    "SELECT {} FROM waves
                     WHERE start_date <= ? AND end_date >= ?
                     ORDER BY id DESC LIMIT 1",
                    WAVE_COLS
                ),
                params![date, date],
                row_to_wave,
            )
            .optional()?;

        Ok(wave)
    }

    /// Update a wave's fields
    pub fn update_wave(&self, wave: &Wave) -> Result<()> {
        if wave.end_date < wave.start_date {
            return Err(Error::InvalidData(format!(
                "Wave end date {} is before start date {}",
                wave.end_date, wave.start_date
            )));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE waves SET name = ?, start_date = ?, end_date = ?,
             price_boy = ?, price_girl = ? WHERE id = ?",
            params![
                wave.name,
                wave.start_date,
                wave.end_date,
                wave.price_boy,
                wave.price_girl,
                wave.id
            ],
        )?;

        if changed == 0 {
            return Err(Error::NotFound(format!("Wave {}", wave.id)));
        }

        Ok(())
    }

    /// Delete a wave. Refused while any order still references it, so
    /// price snapshots stay explicable.
    pub fn delete_wave(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;

        let order_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM orders WHERE wave_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if order_count > 0 {
            return Err(Error::WaveInUse(id, order_count));
        }

        let changed = conn.execute("DELETE FROM waves WHERE id = ?", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Wave {}", id)));
        }

        info!("Deleted wave {}", id);
        Ok(())
    }
}
