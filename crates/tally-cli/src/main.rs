//! Tally CLI - Ticket order payment reconciliation
//!
//! Usage:
//!   tally init                      Initialize database
//!   tally waves add ...             Create a pricing wave
//!   tally submit --name ... --receipt r.png   Submit an order
//!   tally import --file export.csv  Ingest a bank CSV (auto-detects format)
//!   tally orders list --status flagged        Review flagged orders

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Status => commands::cmd_status(&cli.db),
        Commands::Import { file, mode } => {
            commands::cmd_import(&cli.db, &file, &mode, &cli.actor)
        }
        Commands::Submit {
            name,
            email,
            boys,
            girls,
            referral,
            receipt,
            ocr_cmd,
            mode,
        } => commands::cmd_submit(
            &cli.db, &name, &email, boys, girls, referral, receipt, &ocr_cmd, &mode,
        ),
        Commands::Waves { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None | Some(WavesAction::List) => commands::cmd_waves_list(&db),
                Some(WavesAction::Add {
                    name,
                    start,
                    end,
                    price_boy,
                    price_girl,
                }) => commands::cmd_waves_add(&db, &name, &start, &end, price_boy, price_girl),
                Some(WavesAction::Rm { id }) => commands::cmd_waves_rm(&db, id),
            }
        }
        Commands::Orders { action } => {
            let db = commands::open_db(&cli.db)?;
            match action {
                None => commands::cmd_orders_list(&db, None, false),
                Some(OrdersAction::List { status, json }) => {
                    commands::cmd_orders_list(&db, status.as_deref(), json)
                }
                Some(OrdersAction::Show { id }) => commands::cmd_orders_show(&db, id),
                Some(OrdersAction::Approve { id }) => {
                    commands::cmd_orders_approve(&db, id, &cli.actor)
                }
                Some(OrdersAction::Complete { id }) => {
                    commands::cmd_orders_complete(&db, id, &cli.actor)
                }
                Some(OrdersAction::Reject { id }) => {
                    commands::cmd_orders_reject(&db, id, &cli.actor)
                }
                Some(OrdersAction::Delete { id }) => {
                    commands::cmd_orders_delete(&db, id, &cli.actor)
                }
                Some(OrdersAction::Counts { id, boys, girls }) => {
                    commands::cmd_orders_counts(&db, id, boys, girls)
                }
            }
        }
        Commands::Rematch { mode } => commands::cmd_rematch(&cli.db, &mode),
        Commands::Uploads => commands::cmd_uploads(&cli.db),
        Commands::Audit { limit } => commands::cmd_audit(&cli.db, limit),
    }
}
