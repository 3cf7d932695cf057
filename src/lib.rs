//! Blockbid Sheets
//!
//! Tools for turning per-block mining-pool auction sheets into a
//! cumulative master sheet and recovering winning bids from cell
//! highlighting.
//!
//! This library provides:
//! - `reader`/`xlsx`: load CSV and XLSX tables, including cell fill colors
//! - `reshape`: wide→long→wide reshaping with per-block totals
//! - `highlight`: winner reconstruction from highlight fills or explicit columns
//! - `summary`: per-miner statistics and two-rate currency conversion
//! - `report`: master workbook and CSV exports
//!
//! Binaries:
//! - `blockbid`: batch append / winner extraction / summary CLI
//! - `sheet-peek`: cell-by-cell fill inspection utility

pub mod error;
pub mod highlight;
pub mod reader;
pub mod report;
pub mod reshape;
pub mod summary;
pub mod table;
pub mod xlsx;

// Re-export the types most callers touch
pub use error::{Error, Result};
pub use highlight::{HighlightedBid, WinnerIndex, WINNER_FILL_RGB};
pub use reshape::BidRecord;
pub use summary::{ExchangeRates, MinerSummary};
pub use table::{CellValue, Table};
