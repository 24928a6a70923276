//! Order submission and admin commands

use std::path::{Path, PathBuf};

use anyhow::Result;
use tally_core::{submit_order, CommandOcr, Database, Order, OrderForm, OrderStatus};

use super::core::{open_db, parse_mode};

#[allow(clippy::too_many_arguments)]
pub fn cmd_submit(
    db_path: &Path,
    name: &str,
    email: &str,
    boys: i64,
    girls: i64,
    referral: Option<String>,
    receipt: Option<PathBuf>,
    ocr_cmd: &str,
    mode: &str,
) -> Result<()> {
    let db = open_db(db_path)?;
    let mode = parse_mode(mode)?;

    let form = OrderForm {
        name: name.to_string(),
        email: email.to_string(),
        referral,
        boys_count: boys,
        girls_count: girls,
        receipt_path: receipt,
    };

    let ocr = CommandOcr::new(ocr_cmd);
    let order = submit_order(&db, &ocr, mode, &form)?;

    println!("🎟️  Order {} submitted", order.uuid);
    println!("   Expected amount: ${:.2}", order.expected_amount);
    if let Some(amount) = order.ocr_amount {
        println!("   Receipt amount:  ${:.2}", amount);
    }
    if let Some(date) = order.ocr_date {
        println!("   Receipt date:    {}", date);
    }

    match order.status {
        OrderStatus::Verified => println!("✅ Payment verified"),
        OrderStatus::Flagged => {
            println!("⚠️  No matching payment found; order flagged for review")
        }
        _ => println!("   Status: {}", order.status),
    }

    Ok(())
}

pub fn cmd_orders_list(db: &Database, status: Option<&str>, json: bool) -> Result<()> {
    let status = status
        .map(|s| s.parse::<OrderStatus>())
        .transpose()
        .map_err(|e| anyhow::anyhow!(e))?;

    let orders = db.list_orders(status)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&orders)?);
        return Ok(());
    }

    if orders.is_empty() {
        println!("No orders found");
        return Ok(());
    }

    println!(
        "{:<5} {:<20} {:<26} {:>5} {:>6} {:>9} {:>9}  STATUS",
        "ID", "NAME", "EMAIL", "BOYS", "GIRLS", "EXPECTED", "RECEIPT"
    );
    for o in &orders {
        println!(
            "{:<5} {:<20} {:<26} {:>5} {:>6} {:>9.2} {:>9}  {}",
            o.id,
            super::truncate(&o.name, 20),
            super::truncate(&o.email, 26),
            o.boys_count,
            o.girls_count,
            o.expected_amount,
            o.ocr_amount
                .map(|a| format!("{:.2}", a))
                .unwrap_or_else(|| "-".to_string()),
            o.status
        );
    }
    println!();
    println!("{} order(s)", orders.len());

    Ok(())
}

fn print_order(order: &Order) {
    println!("Order {} ({})", order.id, order.uuid);
    println!("   Name:     {}", order.name);
    println!("   Email:    {}", order.email);
    if let Some(referral) = &order.referral {
        println!("   Referral: {}", referral);
    }
    println!(
        "   Tickets:  {} boys, {} girls",
        order.boys_count, order.girls_count
    );
    println!("   Expected: ${:.2} (wave {})", order.expected_amount, order.wave_id);
    println!("   Status:   {}", order.status);

    if order.ocr_amount.is_some() || order.ocr_date.is_some() || order.ocr_name.is_some() {
        println!(
            "   Receipt:  amount={} date={} name={}",
            order
                .ocr_amount
                .map(|a| format!("${:.2}", a))
                .unwrap_or_else(|| "-".to_string()),
            order
                .ocr_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            order.ocr_name.as_deref().unwrap_or("-")
        );
    }
    if let Some(path) = &order.receipt_path {
        println!("   File:     {}", path);
    }
    println!("   Created:  {}", order.created_at.format("%Y-%m-%d %H:%M:%S"));
}

pub fn cmd_orders_show(db: &Database, id: i64) -> Result<()> {
    let order = db.get_order(id)?;
    print_order(&order);
    Ok(())
}

pub fn cmd_orders_approve(db: &Database, id: i64, actor: &str) -> Result<()> {
    let order = db.approve_order(id, actor)?;
    println!("✅ Order {} verified (manual approval)", order.id);
    Ok(())
}

pub fn cmd_orders_complete(db: &Database, id: i64, actor: &str) -> Result<()> {
    let order = db.admin_set_status(id, OrderStatus::Completed, actor)?;
    println!("✅ Order {} completed", order.id);
    Ok(())
}

pub fn cmd_orders_reject(db: &Database, id: i64, actor: &str) -> Result<()> {
    let order = db.admin_set_status(id, OrderStatus::Rejected, actor)?;
    println!("🚫 Order {} rejected", order.id);
    Ok(())
}

pub fn cmd_orders_delete(db: &Database, id: i64, actor: &str) -> Result<()> {
    db.delete_order(id, actor)?;
    println!("🗑️  Order {} deleted", id);
    Ok(())
}

pub fn cmd_orders_counts(db: &Database, id: i64, boys: i64, girls: i64) -> Result<()> {
    let order = db.update_order_counts(id, boys, girls)?;
    println!(
        "✏️  Order {} updated: {} boys, {} girls, expected ${:.2}",
        order.id, order.boys_count, order.girls_count, order.expected_amount
    );
    if order.status == OrderStatus::Pending {
        println!("   Status reset to pending; run 'tally rematch' to re-verify");
    }
    Ok(())
}
