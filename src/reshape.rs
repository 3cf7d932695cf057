//! Wide/long reshaping of per-block auction tables.
//!
//! The input format is one row per block with six fixed miner/bid column
//! pairs. `reshape` unpivots that into one `BidRecord` per occupied slot,
//! `pivot` re-widens the long form into the master-sheet layout (one
//! column per miner), and `append` unions a pivoted batch onto an
//! existing master.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};

/// Key column of every wide table.
pub const BLOCK_HEIGHT: &str = "block height";
/// Derived per-block aggregate column in the master sheet.
pub const TOTAL: &str = "Total";
/// Number of miner/bid slot pairs in the wide input format.
pub const MINER_SLOTS: usize = 6;

lazy_static! {
    // Synthetic index columns produced by CSV/XLSX round-tripping. The
    // colon is part of the marker; a real miner could be named "Unnamed".
    static ref UNNAMED_COLUMN: Regex = Regex::new(r"^Unnamed:").unwrap();
}

/// One miner/bid observation in long form.
///
/// `miner_id` and `bid_amount` are individually optional: a slot with only
/// one of the two filled in is kept as-is rather than repaired or dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct BidRecord {
    pub block_height: u64,
    pub miner_id: Option<String>,
    pub bid_amount: Option<f64>,
    /// Sum of all bids placed on this block, derived during reshaping.
    pub total_bid_for_block: f64,
}

/// Convert a numeric block-height cell to the integer key.
///
/// Block heights are non-negative integers; anything else in the key
/// column is a malformed cell, not a candidate for rounding.
pub(crate) fn block_height_from(n: f64) -> Result<u64> {
    if n < 0.0 || n.fract() != 0.0 || n > u64::MAX as f64 {
        return Err(Error::bad_cell(BLOCK_HEIGHT, n.to_string()));
    }
    Ok(n as u64)
}

/// Read a cell that must be numeric if present.
fn numeric_cell(cell: &CellValue, column: &str) -> Result<Option<f64>> {
    match cell {
        CellValue::Empty => Ok(None),
        CellValue::Number(n) => Ok(Some(*n)),
        other => Err(Error::bad_cell(column, other.to_string())),
    }
}

/// Unpivot a wide auction table into long-form `BidRecord`s.
///
/// Rows without a block height are dropped, as are `Unnamed` artifact
/// columns. All six miner and bid columns must be present. Slot pairing
/// is positional: `miner N` always travels with `bid N`.
pub fn reshape(input: &Table) -> Result<Vec<BidRecord>> {
    let drop: Vec<usize> = input
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| UNNAMED_COLUMN.is_match(name))
        .map(|(i, _)| i)
        .collect();
    let table = if drop.is_empty() {
        input.clone()
    } else {
        input.without_columns(&drop)
    };

    let block_col = table.require_column(BLOCK_HEIGHT)?;
    let mut slot_cols = Vec::with_capacity(MINER_SLOTS);
    for slot in 1..=MINER_SLOTS {
        let miner_col = table.require_column(&format!("miner {}", slot))?;
        let bid_col = table.require_column(&format!("bid {}", slot))?;
        slot_cols.push((miner_col, bid_col));
    }

    let mut records = Vec::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        let block = match numeric_cell(&row[block_col], BLOCK_HEIGHT)? {
            Some(n) => block_height_from(n)?,
            None => {
                log::debug!("row {}: no block height, dropped", row_idx + 1);
                continue;
            }
        };

        for (slot, &(miner_col, bid_col)) in slot_cols.iter().enumerate() {
            let miner_id = row[miner_col].as_label();
            let bid_amount = numeric_cell(&row[bid_col], &format!("bid {}", slot + 1))?;
            if miner_id.is_none() && bid_amount.is_none() {
                continue; // genuinely unused slot
            }
            records.push(BidRecord {
                block_height: block,
                miner_id,
                bid_amount,
                total_bid_for_block: 0.0,
            });
        }
    }

    recompute_totals(&mut records);
    Ok(records)
}

/// Recompute every record's per-block total from scratch.
///
/// Missing bids contribute zero to the sum but never create rows.
fn recompute_totals(records: &mut [BidRecord]) {
    use std::collections::HashMap;
    let mut totals: HashMap<u64, f64> = HashMap::new();
    for record in records.iter() {
        *totals.entry(record.block_height).or_insert(0.0) += record.bid_amount.unwrap_or(0.0);
    }
    for record in records.iter_mut() {
        record.total_bid_for_block = totals[&record.block_height];
    }
}

/// Pivot long-form records into the wide master layout.
///
/// Output columns: `block height`, `Total`, then one column per distinct
/// miner id in sorted order. Rows are sorted by block height. A block with
/// two records for the same miner cannot be widened and fails with
/// `DuplicateKey`. Records without a miner id have no column to land in;
/// they are represented only through the block's total.
pub fn pivot(records: &[BidRecord]) -> Result<Table> {
    use std::collections::{BTreeMap, BTreeSet};

    let mut miners: BTreeSet<&str> = BTreeSet::new();
    // block -> (total, miner -> bid cell)
    let mut blocks: BTreeMap<u64, (f64, BTreeMap<&str, CellValue>)> = BTreeMap::new();

    for record in records {
        let entry = blocks
            .entry(record.block_height)
            .or_insert_with(|| (record.total_bid_for_block, BTreeMap::new()));
        let Some(miner) = record.miner_id.as_deref() else {
            continue;
        };
        miners.insert(miner);
        let cell = match record.bid_amount {
            Some(bid) => CellValue::Number(bid),
            None => CellValue::Empty,
        };
        if entry.1.insert(miner, cell).is_some() {
            return Err(Error::DuplicateKey {
                block: record.block_height,
                miner: miner.to_string(),
            });
        }
    }

    let mut columns = vec![BLOCK_HEIGHT.to_string(), TOTAL.to_string()];
    columns.extend(miners.iter().map(|m| m.to_string()));

    let mut table = Table::new(columns);
    for (block, (total, bids)) in &blocks {
        let mut row = vec![
            CellValue::Number(*block as f64),
            CellValue::Number(*total),
        ];
        for miner in &miners {
            row.push(bids.get(miner).cloned().unwrap_or(CellValue::Empty));
        }
        table.push_row(row);
    }
    Ok(table)
}

/// Concatenate a pivoted batch under an existing master table.
///
/// The result's columns are the union of both headers: master columns
/// first in their original order, then any column only the batch has.
/// Rows keep their order, master first. Nothing is deduplicated; a block
/// height present in both tables appears twice.
pub fn append(master: &Table, batch: &Table) -> Table {
    let mut columns: Vec<String> = master.columns().to_vec();
    for name in batch.columns() {
        if !columns.iter().any(|c| c == name) {
            columns.push(name.clone());
        }
    }

    let mut result = Table::new(columns.clone());
    for source in [master, batch] {
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|name| source.find_column(name))
            .collect();
        for row in source.rows() {
            let cells = positions
                .iter()
                .map(|pos| match pos {
                    Some(i) => row[*i].clone(),
                    None => CellValue::Empty,
                })
                .collect();
            result.push_row(cells);
        }
    }
    result
}
