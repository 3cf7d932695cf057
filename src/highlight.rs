//! Winner reconstruction.
//!
//! First-generation batch files record the winning bid as two plain
//! columns. Second-generation master sheets record it only as a yellow
//! cell fill, so the winning bid has to be recovered from formatting.
//! Both encodings fold into a single `WinnerIndex`, and downstream code
//! depends only on that.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::reshape::{block_height_from, TOTAL};
use crate::table::{CellValue, Table};
use crate::xlsx::Worksheet;

/// Fill color marking a winning bid, as the last six hex digits of the
/// cell's ARGB start color.
pub const WINNER_FILL_RGB: &str = "FFFF00";

/// Column names of the first-generation winner encoding.
pub const WINNING_BIDDER: &str = "winning bidder";
pub const WINNING_BID: &str = "winning bid";

/// One bid recovered from a highlighted master sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedBid {
    pub block_height: u64,
    pub miner_id: String,
    pub bid_amount: Option<f64>,
    pub is_winner: bool,
}

/// Compare a cell fill against the winner color: the RGB component (last
/// six hex digits, alpha ignored) must match case-insensitively.
fn fill_matches(fill_rgb: Option<&str>, highlight_rgb: &str) -> bool {
    match fill_rgb {
        Some(rgb) if rgb.len() >= 6 => rgb[rgb.len() - 6..].eq_ignore_ascii_case(highlight_rgb),
        _ => false,
    }
}

/// Extract long-form bids (with winner flags) from a highlighted sheet.
///
/// Row 1 is the header: column 1 is the block height, every other
/// non-empty header is a miner label. The derived `Total` column is not a
/// bidder and is excluded. Cells without a value produce no record; cells
/// without a fill are never winners.
pub fn extract_highlights(sheet: &Worksheet, highlight_rgb: &str) -> Result<Vec<HighlightedBid>> {
    let mut bids = Vec::new();

    for row in 2..=sheet.n_rows() {
        let block = match sheet.value(row, 1) {
            CellValue::Empty => continue,
            CellValue::Number(n) => block_height_from(*n)?,
            other => return Err(Error::bad_cell("block height", other.to_string())),
        };

        for col in 2..=sheet.n_cols() {
            let Some(miner_id) = sheet.value(1, col).as_label() else {
                continue;
            };
            if miner_id == TOTAL {
                continue;
            }

            let bid_amount = match sheet.value(row, col) {
                CellValue::Empty => continue,
                CellValue::Number(n) => Some(*n),
                other => return Err(Error::bad_cell(&miner_id, other.to_string())),
            };

            bids.push(HighlightedBid {
                block_height: block,
                miner_id,
                bid_amount,
                is_winner: fill_matches(sheet.fill_rgb(row, col), highlight_rgb),
            });
        }
    }

    Ok(bids)
}

/// The winning miner and amount for one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinningBid {
    pub miner_id: String,
    pub bid_amount: f64,
}

/// Block height -> winning bid, however the source encoded it.
#[derive(Debug, Clone, Default)]
pub struct WinnerIndex {
    winners: BTreeMap<u64, WinningBid>,
}

impl WinnerIndex {
    /// Build from the explicit `winning bidder`/`winning bid` columns of a
    /// first-generation wide table. Rows lacking a block height or either
    /// winner field are skipped.
    pub fn from_columns(table: &Table) -> Result<WinnerIndex> {
        let block_col = table.require_column(crate::reshape::BLOCK_HEIGHT)?;
        let bidder_col = table.require_column(WINNING_BIDDER)?;
        let bid_col = table.require_column(WINNING_BID)?;

        let mut winners = BTreeMap::new();
        for row in table.rows() {
            let Some(block) = row[block_col].as_number() else {
                continue;
            };
            let Some(miner_id) = row[bidder_col].as_label() else {
                continue;
            };
            let Some(bid_amount) = row[bid_col].as_number() else {
                continue;
            };
            winners.insert(
                block_height_from(block)?,
                WinningBid {
                    miner_id,
                    bid_amount,
                },
            );
        }
        Ok(WinnerIndex { winners })
    }

    /// Build from highlight-extracted bids (second generation).
    pub fn from_highlights(bids: &[HighlightedBid]) -> WinnerIndex {
        let mut winners = BTreeMap::new();
        for bid in bids {
            if !bid.is_winner {
                continue;
            }
            let Some(bid_amount) = bid.bid_amount else {
                continue;
            };
            winners.insert(
                bid.block_height,
                WinningBid {
                    miner_id: bid.miner_id.clone(),
                    bid_amount,
                },
            );
        }
        WinnerIndex { winners }
    }

    pub fn get(&self, block_height: u64) -> Option<&WinningBid> {
        self.winners.get(&block_height)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &WinningBid)> {
        self.winners.iter().map(|(block, win)| (*block, win))
    }

    pub fn len(&self) -> usize {
        self.winners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }
}
