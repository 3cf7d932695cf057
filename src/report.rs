//! Output artifacts: the master-sheet workbook and CSV exports.

use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::error::Result;
use crate::highlight::{HighlightedBid, WinnerIndex};
use crate::summary::PricedSummary;
use crate::table::{CellValue, Table};

/// Sheet name of the emitted master workbook.
pub const MASTER_SHEET_NAME: &str = "AppendedData";

/// Write a table as a single-sheet workbook: header row from the column
/// names, one row per table row, no formatting.
///
/// Winner highlighting is deliberately not re-applied here; callers that
/// want it can pair this file with a `WinnerIndex`.
pub fn write_master_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(MASTER_SHEET_NAME)?;

    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string(0, col as u16, name)?;
    }
    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col_num = col as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    sheet.write_number(row_num, col_num, *n)?;
                }
                CellValue::Text(s) => {
                    sheet.write_string(row_num, col_num, s)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(row_num, col_num, *b)?;
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

/// Export highlight-extracted bids as CSV.
pub fn write_highlights_csv(bids: &[HighlightedBid], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for bid in bids {
        writer.serialize(bid)?;
    }
    writer.flush()?;
    Ok(())
}

/// Export a winner index as CSV (block, miner, winning bid).
pub fn write_winners_csv(index: &WinnerIndex, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["block_height", "winning_bidder", "winning_bid"])?;
    for (block, win) in index.iter() {
        writer.write_record([
            block.to_string(),
            win.miner_id.clone(),
            win.bid_amount.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Export priced miner summaries as CSV.
pub fn write_summary_csv(summaries: &[PricedSummary], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for summary in summaries {
        writer.serialize(summary)?;
    }
    writer.flush()?;
    Ok(())
}
