//! Order CRUD, status transitions, and admin actions

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Order, OrderStatus};

const ORDER_COLS: &str = "id, uuid, name, email, referral, boys_count, girls_count, wave_id, \
     expected_amount, ocr_amount, ocr_date, ocr_name, status, receipt_path, receipt_hash, \
     created_at";

fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
    let status_str: String = row.get(12)?;
    let status = status_str.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(
            12,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    Ok(Order {
        id: row.get(0)?,
        uuid: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        referral: row.get(4)?,
        boys_count: row.get(5)?,
        girls_count: row.get(6)?,
        wave_id: row.get(7)?,
        expected_amount: row.get(8)?,
        ocr_amount: row.get(9)?,
        ocr_date: row.get(10)?,
        ocr_name: row.get(11)?,
        status,
        receipt_path: row.get(13)?,
        receipt_hash: row.get(14)?,
        created_at: parse_datetime(&row.get::<_, String>(15)?),
    })
}

/// Fields for a new order; everything derived (uuid, expected amount,
/// OCR fields) is computed by the intake layer before insertion.
#[derive(Debug, Clone)]
pub(crate) struct NewOrder<'a> {
    pub uuid: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub referral: Option<&'a str>,
    pub boys_count: i64,
    pub girls_count: i64,
    pub wave_id: i64,
    pub expected_amount: f64,
    pub ocr_amount: Option<f64>,
    pub ocr_date: Option<NaiveDate>,
    pub ocr_name: Option<&'a str>,
    pub receipt_path: Option<&'a str>,
    pub receipt_hash: Option<&'a str>,
}

impl Database {
    pub(crate) fn insert_order(&self, new: &NewOrder) -> Result<Order> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO orders (uuid, name, email, referral, boys_count, girls_count,
                wave_id, expected_amount, ocr_amount, ocr_date, ocr_name,
                receipt_path, receipt_hash)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                new.uuid,
                new.name,
                new.email,
                new.referral,
                new.boys_count,
                new.girls_count,
                new.wave_id,
                new.expected_amount,
                new.ocr_amount,
                new.ocr_date,
                new.ocr_name,
                new.receipt_path,
                new.receipt_hash,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_order(id)
    }

    /// Get an order by id
    pub fn get_order(&self, id: i64) -> Result<Order> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLS),
            params![id],
            row_to_order,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Order {}", id)))
    }

    /// Get an order by its public uuid
    pub fn get_order_by_uuid(&self, uuid: &str) -> Result<Order> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM orders WHERE uuid = ?", ORDER_COLS),
            params![uuid],
            row_to_order,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Order {}", uuid)))
    }

    /// List orders, optionally filtered by status, newest first
    pub fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let conn = self.conn()?;

        let orders = match status {
            Some(s) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM orders WHERE status = ? ORDER BY id DESC",
                    ORDER_COLS
                ))?;
                let rows = stmt
                    .query_map(params![s.as_str()], row_to_order)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM orders ORDER BY id DESC",
                    ORDER_COLS
                ))?;
                let rows = stmt
                    .query_map([], row_to_order)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(orders)
    }

    /// Pending orders that have both an OCR amount and an OCR date, i.e.
    /// everything the matcher can work with.
    pub fn find_pending_with_ocr(&self) -> Result<Vec<Order>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM orders
             WHERE status = 'pending' AND ocr_amount IS NOT NULL AND ocr_date IS NOT NULL
             ORDER BY id",
            ORDER_COLS
        ))?;

        let orders = stmt
            .query_map([], row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(orders)
    }

    /// Orders already carrying this receipt hash
    pub fn find_by_receipt_hash(&self, hash: &str) -> Result<Vec<Order>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM orders WHERE receipt_hash = ? ORDER BY id",
            ORDER_COLS
        ))?;

        let orders = stmt
            .query_map(params![hash], row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(orders)
    }

    /// Set an order's status directly. Used by the matcher; admin paths
    /// go through [`Database::admin_set_status`].
    pub fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE orders SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("Order {}", id)));
        }
        Ok(())
    }

    /// Admin status change with transition check and audit entry
    pub fn admin_set_status(&self, id: i64, to: OrderStatus, actor: &str) -> Result<Order> {
        let order = self.get_order(id)?;

        if !order.status.admin_can_set(to) {
            return Err(Error::InvalidTransition(
                order.status.to_string(),
                to.to_string(),
            ));
        }

        self.update_order_status(id, to)?;
        self.log_audit(
            actor,
            &format!("order_{}", to.as_str()),
            Some(&format!("order {} ({})", id, order.uuid)),
        )?;

        info!("Order {} set to {} by {}", id, to, actor);
        self.get_order(id)
    }

    /// Manually verify an order, overriding the matcher. Allowed from
    /// pending or flagged.
    pub fn approve_order(&self, id: i64, actor: &str) -> Result<Order> {
        let order = self.get_order(id)?;

        match order.status {
            OrderStatus::Pending | OrderStatus::Flagged => {}
            other => {
                return Err(Error::InvalidTransition(
                    other.to_string(),
                    OrderStatus::Verified.to_string(),
                ))
            }
        }

        self.update_order_status(id, OrderStatus::Verified)?;
        self.log_audit(
            actor,
            "order_approved",
            Some(&format!("order {} ({})", id, order.uuid)),
        )?;

        info!("Order {} manually approved by {}", id, actor);
        self.get_order(id)
    }

    /// Adjust ticket counts on an order. Recomputes the expected amount
    /// from the order's original wave prices and, when the order was
    /// pending or flagged, resets it to pending so the matcher re-runs
    /// against the new total.
    pub fn update_order_counts(&self, id: i64, boys: i64, girls: i64) -> Result<Order> {
        if boys < 0 || girls < 0 {
            return Err(Error::InvalidData("Ticket counts must be non-negative".into()));
        }
        if boys + girls == 0 {
            return Err(Error::InvalidData("Order must include at least one ticket".into()));
        }

        let order = self.get_order(id)?;
        let wave = self.get_wave(order.wave_id)?;
        let expected = boys as f64 * wave.price_boy + girls as f64 * wave.price_girl;

        let reset = matches!(order.status, OrderStatus::Pending | OrderStatus::Flagged);

        let conn = self.conn()?;
        conn.execute(
            "UPDATE orders SET boys_count = ?, girls_count = ?, expected_amount = ?,
             status = CASE WHEN ? THEN 'pending' ELSE status END
             WHERE id = ?",
            params![boys, girls, expected, reset, id],
        )?;
        drop(conn);

        self.get_order(id)
    }

    /// Delete an order outright, with an audit entry
    pub fn delete_order(&self, id: i64, actor: &str) -> Result<()> {
        let order = self.get_order(id)?;

        let conn = self.conn()?;
        conn.execute("DELETE FROM orders WHERE id = ?", params![id])?;
        drop(conn);

        self.log_audit(
            actor,
            "order_deleted",
            Some(&format!("order {} ({})", id, order.uuid)),
        )?;

        info!("Order {} deleted by {}", id, actor);
        Ok(())
    }

    /// Count of orders per status, for dashboards
    pub fn count_by_status(&self) -> Result<Vec<(OrderStatus, i64)>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM orders GROUP BY status ORDER BY status")?;

        let mut counts = Vec::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (status_str, count) = row?;
            let status = status_str
                .parse::<OrderStatus>()
                .map_err(Error::InvalidData)?;
            counts.push((status, count));
        }

        Ok(counts)
    }
}
