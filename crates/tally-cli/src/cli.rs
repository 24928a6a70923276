//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Reconcile ticket orders against payment exports
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Ticket order payment reconciliation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Actor name recorded in the audit log for admin actions
    #[arg(long, default_value = "cli", global = true)]
    pub actor: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show order counts and ledger totals
    Status,

    /// Import a bank CSV export (format auto-detected)
    Import {
        /// CSV file to import
        #[arg(short, long)]
        file: PathBuf,

        /// Match mode: date-amount or fuzzy-name-amount
        #[arg(short, long, default_value = "date-amount")]
        mode: String,
    },

    /// Submit a ticket order
    Submit {
        /// Customer name
        #[arg(long)]
        name: String,

        /// Customer email
        #[arg(long)]
        email: String,

        /// Number of boys' tickets
        #[arg(long, default_value = "0")]
        boys: i64,

        /// Number of girls' tickets
        #[arg(long, default_value = "0")]
        girls: i64,

        /// Referral note
        #[arg(long)]
        referral: Option<String>,

        /// Payment receipt image to OCR
        #[arg(long)]
        receipt: Option<PathBuf>,

        /// OCR command to run over the receipt
        #[arg(long, default_value = "tesseract")]
        ocr_cmd: String,

        /// Match mode: date-amount or fuzzy-name-amount
        #[arg(short, long, default_value = "date-amount")]
        mode: String,
    },

    /// Manage pricing waves
    Waves {
        #[command(subcommand)]
        action: Option<WavesAction>,
    },

    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: Option<OrdersAction>,
    },

    /// Re-run matching over pending orders
    Rematch {
        /// Match mode: date-amount or fuzzy-name-amount
        #[arg(short, long, default_value = "date-amount")]
        mode: String,
    },

    /// List ingested CSV batches
    Uploads,

    /// Show the admin audit log
    Audit {
        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum WavesAction {
    /// List waves
    List,

    /// Add a wave
    Add {
        /// Wave name
        name: String,

        /// First day the wave is active (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day the wave is active (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Price per boys' ticket
        #[arg(long)]
        price_boy: f64,

        /// Price per girls' ticket
        #[arg(long)]
        price_girl: f64,
    },

    /// Delete a wave (refused while orders reference it)
    Rm {
        /// Wave id
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List orders
    List {
        /// Filter by status: pending, verified, flagged, rejected, completed
        #[arg(short, long)]
        status: Option<String>,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one order
    Show {
        /// Order id
        id: i64,
    },

    /// Manually verify an order
    Approve {
        /// Order id
        id: i64,
    },

    /// Mark a verified order as completed
    Complete {
        /// Order id
        id: i64,
    },

    /// Reject an order
    Reject {
        /// Order id
        id: i64,
    },

    /// Delete an order
    Delete {
        /// Order id
        id: i64,
    },

    /// Adjust ticket counts (recomputes the expected amount)
    Counts {
        /// Order id
        id: i64,

        /// New boys' ticket count
        #[arg(long)]
        boys: i64,

        /// New girls' ticket count
        #[arg(long)]
        girls: i64,
    },
}
