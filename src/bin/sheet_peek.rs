//! Sheet Peek Utility
//!
//! Dumps every populated cell of an xlsx sheet together with its fill
//! color, for checking which cells a highlight pass will pick up.
//!
//! Usage: cargo run --bin sheet-peek <file.xlsx> [sheet-name]

use anyhow::{Context, Result};
use blockbid_sheets::xlsx::Workbook;
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut path_arg = None;
    let mut sheet_arg = None;

    for arg in &args[1..] {
        if !arg.starts_with('-') {
            if path_arg.is_none() {
                path_arg = Some(arg.clone());
            } else {
                sheet_arg = Some(arg.clone());
            }
        }
    }

    let path = match path_arg {
        Some(p) => p,
        None => {
            eprintln!("Usage: {} <file.xlsx> [sheet-name]", args[0]);
            eprintln!("Example: {} master.xlsx AppendedData", args[0]);
            std::process::exit(1);
        }
    };

    let workbook =
        Workbook::open(Path::new(&path)).with_context(|| format!("Failed to open {}", path))?;

    println!("Sheets: {:?}", workbook.sheet_names());

    let sheet = match sheet_arg {
        Some(name) => workbook.sheet(&name)?,
        None => workbook
            .first_sheet()
            .context("Workbook has no sheets")?,
    };

    println!(
        "\n=== {} ({} rows x {} cols) ===",
        sheet.name(),
        sheet.n_rows(),
        sheet.n_cols()
    );

    for row in 1..=sheet.n_rows() {
        for col in 1..=sheet.n_cols() {
            let value = sheet.value(row, col);
            let fill = sheet.fill_rgb(row, col);
            if value.is_empty() && fill.is_none() {
                continue;
            }
            println!(
                "{:>4} {:>3}: {:<24} fill={}",
                row,
                col,
                value.to_string(),
                fill.unwrap_or("-")
            );
        }
    }

    Ok(())
}
