//! Integration tests for the full sheet pipeline.
//!
//! These tests run the same end-to-end paths as the CLI: read a wide
//! batch from disk, reshape and pivot it, append it to a master table,
//! write the result as xlsx, and read that file back. Highlight
//! extraction is exercised against fixture workbooks written with the
//! same formatting the production sheets use (solid yellow fill on the
//! winning bid).

use blockbid_sheets::highlight::{extract_highlights, WinnerIndex, WINNER_FILL_RGB};
use blockbid_sheets::reader::read_table;
use blockbid_sheets::report::{self, MASTER_SHEET_NAME};
use blockbid_sheets::reshape;
use blockbid_sheets::summary::{price_summaries, summarize, ExchangeRates};
use blockbid_sheets::xlsx::Workbook;
use blockbid_sheets::{CellValue, Error};
use rust_xlsxwriter::{Format, Workbook as XlsxWriter};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write a wide batch CSV: two blocks, three miners, plus the explicit
/// winner columns of a first-generation export.
fn write_batch_csv(path: &Path) {
    let mut lines = Vec::new();
    let mut header = vec!["block height".to_string()];
    for i in 1..=6 {
        header.push(format!("miner {}", i));
        header.push(format!("bid {}", i));
    }
    header.push("winning bidder".to_string());
    header.push("winning bid".to_string());
    lines.push(header.join(","));

    lines.push("850000,alpha,5,beta,7,gamma,3,,,,,,,beta,7".to_string());
    lines.push("850001,alpha,4,beta,2,,,,,,,,,alpha,4".to_string());
    // Blank key row, should be dropped by the reshaper.
    lines.push(",alpha,9,,,,,,,,,,,,".to_string());

    fs::write(path, lines.join("\n")).expect("Failed to write batch CSV");
}

/// Write a small master CSV already in the wide pivoted layout.
fn write_master_csv(path: &Path) {
    let content = "block height,Total,alpha,delta\n849999,11,6,5\n";
    fs::write(path, content).expect("Failed to write master CSV");
}

#[test]
fn test_append_workflow_end_to_end() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let batch_path = dir.path().join("batch.csv");
    let master_path = dir.path().join("master.csv");
    let out_path = dir.path().join("master_next.xlsx");
    write_batch_csv(&batch_path);
    write_master_csv(&master_path);

    let batch = read_table(&batch_path).expect("Failed to read batch");
    let master = read_table(&master_path).expect("Failed to read master");

    let records = reshape::reshape(&batch).expect("Failed to reshape");
    // 3 occupied slots on 850000, 2 on 850001; the keyless row is gone.
    assert_eq!(records.len(), 5);

    let pivoted = reshape::pivot(&records).expect("Failed to pivot");
    assert_eq!(
        pivoted.columns(),
        &["block height", "Total", "alpha", "beta", "gamma"]
    );

    let combined = reshape::append(&master, &pivoted);
    report::write_master_xlsx(&combined, &out_path).expect("Failed to write xlsx");

    // Read the written file back through the same code path the CLI uses.
    let workbook = Workbook::open(&out_path).expect("Failed to reopen output");
    let sheet = workbook.sheet(MASTER_SHEET_NAME).expect("Sheet missing");
    let reread = sheet.to_table();

    // Column union: master columns first, then the batch-only miners.
    assert_eq!(
        reread.columns(),
        &["block height", "Total", "alpha", "delta", "beta", "gamma"]
    );
    // One master row plus two batch blocks; no deduplication happened.
    assert_eq!(reread.n_rows(), 3);

    let block_col = reread.find_column("block height").unwrap();
    let blocks: Vec<u64> = reread
        .rows()
        .iter()
        .map(|row| row[block_col].as_number().unwrap() as u64)
        .collect();
    assert_eq!(blocks, vec![849999, 850000, 850001]);

    // Batch totals were recomputed from the bids (5 + 7 + 3, then 4 + 2).
    let total_col = reread.find_column("Total").unwrap();
    assert_eq!(reread.rows()[1][total_col], CellValue::Number(15.0));
    assert_eq!(reread.rows()[2][total_col], CellValue::Number(6.0));

    // Master-only cells of batch rows are blank, and vice versa.
    let delta_col = reread.find_column("delta").unwrap();
    assert_eq!(reread.rows()[0][delta_col], CellValue::Number(5.0));
    assert!(reread.rows()[1][delta_col].is_empty());
    let gamma_col = reread.find_column("gamma").unwrap();
    assert!(reread.rows()[0][gamma_col].is_empty());
    assert_eq!(reread.rows()[1][gamma_col], CellValue::Number(3.0));
}

#[test]
fn test_explicit_winner_columns_survive_the_batch() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let batch_path = dir.path().join("batch.csv");
    write_batch_csv(&batch_path);

    let batch = read_table(&batch_path).expect("Failed to read batch");
    let index = WinnerIndex::from_columns(&batch).expect("Failed to index winners");

    assert_eq!(index.len(), 2);
    assert_eq!(index.get(850000).unwrap().miner_id, "beta");
    assert_eq!(index.get(850000).unwrap().bid_amount, 7.0);
    assert_eq!(index.get(850001).unwrap().miner_id, "alpha");

    let winners_path = dir.path().join("winners.csv");
    report::write_winners_csv(&index, &winners_path).expect("Failed to write winners");
    let written = fs::read_to_string(&winners_path).expect("Failed to read winners back");
    assert!(written.starts_with("block_height,winning_bidder,winning_bid"));
    assert!(written.contains("850000,beta,7"));
}

/// Build a highlighted master workbook the way the production sheets look:
/// one winner per block marked with a solid yellow fill, one decoy fill in
/// a near-miss color, and a derived Total column that must be ignored.
fn write_highlighted_xlsx(path: &Path) {
    let mut workbook = XlsxWriter::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Auctions").expect("Failed to name sheet");

    let winner = Format::new().set_background_color("#FFFF00");
    let decoy = Format::new().set_background_color("#FFFF01");

    for (col, header) in ["block height", "alpha", "beta", "Total"].iter().enumerate() {
        sheet
            .write_string(0, col as u16, *header)
            .expect("Failed to write header");
    }

    sheet.write_number(1, 0, 850000).unwrap();
    sheet.write_number(1, 1, 5).unwrap();
    sheet.write_number_with_format(1, 2, 7, &winner).unwrap();
    sheet.write_number_with_format(1, 3, 12, &winner).unwrap(); // Total, never a bidder

    sheet.write_number(2, 0, 850001).unwrap();
    sheet.write_number_with_format(2, 1, 4, &winner).unwrap();
    sheet.write_number_with_format(2, 2, 2, &decoy).unwrap();
    sheet.write_number(2, 3, 6).unwrap();

    workbook.save(path).expect("Failed to save fixture xlsx");
}

#[test]
fn test_highlight_extraction_from_written_workbook() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("highlighted.xlsx");
    write_highlighted_xlsx(&path);

    let workbook = Workbook::open(&path).expect("Failed to open fixture");
    let sheet = workbook.sheet("Auctions").expect("Sheet missing");
    let bids = extract_highlights(sheet, WINNER_FILL_RGB).expect("Extraction failed");

    // Two miners per block; the Total column never produces a bid.
    assert_eq!(bids.len(), 4);
    assert!(bids.iter().all(|b| b.miner_id != "Total"));

    let winners: Vec<_> = bids.iter().filter(|b| b.is_winner).collect();
    assert_eq!(winners.len(), 2);
    assert_eq!(winners[0].block_height, 850000);
    assert_eq!(winners[0].miner_id, "beta");
    assert_eq!(winners[0].bid_amount, Some(7.0));
    // The decoy color on beta's second bid did not count as a win.
    assert_eq!(winners[1].miner_id, "alpha");

    let index = WinnerIndex::from_highlights(&bids);
    assert_eq!(index.len(), 2);
    assert_eq!(index.get(850001).unwrap().miner_id, "alpha");
}

#[test]
fn test_summary_from_highlighted_workbook() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("highlighted.xlsx");
    write_highlighted_xlsx(&path);

    let workbook = Workbook::open(&path).expect("Failed to open fixture");
    let sheet = workbook.sheet("Auctions").expect("Sheet missing");
    let bids = extract_highlights(sheet, WINNER_FILL_RGB).expect("Extraction failed");

    let summaries = summarize(&bids);
    assert_eq!(summaries.len(), 2);

    let alpha = &summaries[0];
    assert_eq!(alpha.miner_id, "alpha");
    assert_eq!(alpha.blocks_bid, 2);
    assert_eq!(alpha.blocks_won, Some(1));
    assert_eq!(alpha.win_rate, Some(0.5));
    assert_eq!(alpha.total_bid, 9.0);
    // Bid units double into satoshi units.
    assert_eq!(alpha.total_sats, 18.0);

    // With the base unit at 10.0 and a satoshi at 2.0, each satoshi is
    // worth 5.0 display units.
    let rates = ExchangeRates::new(10.0, 2.0).expect("Rates rejected");
    let priced = price_summaries(&summaries, &rates);
    assert_eq!(priced[0].total_display, 90.0);
    assert_eq!(priced[0].average_display, 45.0);

    let out_path = dir.path().join("summary.csv");
    report::write_summary_csv(&priced, &out_path).expect("Failed to write summary");
    let written = fs::read_to_string(&out_path).expect("Failed to read summary back");
    assert!(written.contains("alpha,2,0.5,90"));
}

#[test]
fn test_missing_sheet_is_reported_by_name() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("highlighted.xlsx");
    write_highlighted_xlsx(&path);

    let workbook = Workbook::open(&path).expect("Failed to open fixture");
    match workbook.sheet("NoSuchSheet") {
        Err(Error::SheetNotFound(name)) => assert_eq!(name, "NoSuchSheet"),
        other => panic!("expected SheetNotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_garbage_file_is_unreadable_not_a_zip_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("not-a-workbook.xlsx");
    fs::write(&path, "this is not a zip archive").unwrap();
    assert!(matches!(
        Workbook::open(&path),
        Err(Error::UnreadableFile { .. })
    ));
    // The reader front door classifies it the same way.
    assert!(matches!(
        read_table(&path),
        Err(Error::UnreadableFile { .. })
    ));
}

#[test]
fn test_fractional_block_height_fails_extraction() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("bad-key.xlsx");

    let mut workbook = XlsxWriter::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "block height").unwrap();
    sheet.write_string(0, 1, "alpha").unwrap();
    sheet.write_number(1, 0, 850000.25).unwrap();
    sheet.write_number(1, 1, 5).unwrap();
    workbook.save(&path).expect("Failed to save fixture xlsx");

    let workbook = Workbook::open(&path).expect("Failed to open fixture");
    let sheet = workbook.first_sheet().expect("Workbook has no sheets");
    assert!(matches!(
        extract_highlights(sheet, WINNER_FILL_RGB),
        Err(Error::BadCell { .. })
    ));
}

#[test]
fn test_unknown_extension_is_unreadable() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("batch.parquet");
    fs::write(&path, "whatever").unwrap();
    assert!(matches!(
        read_table(&path),
        Err(Error::UnreadableFile { .. })
    ));
}
