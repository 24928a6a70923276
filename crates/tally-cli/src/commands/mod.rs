//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init, status, rematch, audit) and shared
//!   utilities (open_db, parse_mode)
//! - `import` - CSV ingestion and upload history
//! - `orders` - Order submission and admin actions
//! - `waves` - Pricing wave management

pub mod core;
pub mod import;
pub mod orders;
pub mod waves;

// Re-export command functions for main.rs
pub use core::*;
pub use import::*;
pub use orders::*;
pub use waves::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
