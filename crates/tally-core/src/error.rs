//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV import error: {0}")]
    Import(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active wave for the current date")]
    NoActiveWave,

    #[error("Wave {0} is still referenced by {1} orders")]
    WaveInUse(i64, i64),

    #[error("Invalid status transition: {0} -> {1}")]
    InvalidTransition(String, String),
}

pub type Result<T> = std::result::Result<T, Error>;
