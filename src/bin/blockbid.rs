//! Blockbid CLI - process auction batches and master sheets
//!
//! This tool covers the three workflows around the block-auction master
//! sheet: appending a new wide batch onto an existing master, extracting
//! winning bids from a highlighted sheet, and computing per-miner
//! summary statistics.

use anyhow::{Context, Result};
use blockbid_sheets::highlight::{
    extract_highlights, WinnerIndex, WINNER_FILL_RGB, WINNING_BID, WINNING_BIDDER,
};
use blockbid_sheets::reader::read_table;
use blockbid_sheets::report;
use blockbid_sheets::reshape::{self, BLOCK_HEIGHT};
use blockbid_sheets::summary::{price_summaries, summarize, ExchangeRates};
use blockbid_sheets::xlsx::Workbook;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "blockbid")]
#[command(about = "Reshape block-auction sheets and recover winning bids")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reshape a wide batch, pivot it, and append it onto a master sheet
    Append {
        /// Input batch file (wide format, csv or xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Existing master file to append to (csv or xlsx)
        #[arg(short, long)]
        master: PathBuf,

        /// Output xlsx path for the new master
        #[arg(short, long)]
        output: PathBuf,

        /// Also export the batch's explicit winner columns as CSV
        #[arg(long)]
        winners_out: Option<PathBuf>,
    },

    /// Extract bids and winner flags from a highlighted xlsx sheet
    Winners {
        /// Input xlsx file
        #[arg(short, long)]
        input: PathBuf,

        /// Sheet name (default: first sheet in the workbook)
        #[arg(long)]
        sheet: Option<String>,

        /// Highlight color marking winners (6 hex digits)
        #[arg(long, default_value = WINNER_FILL_RGB)]
        color: String,

        /// Output CSV path (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-miner summary statistics from a highlighted xlsx sheet
    Summary {
        /// Input xlsx file
        #[arg(short, long)]
        input: PathBuf,

        /// Sheet name (default: first sheet in the workbook)
        #[arg(long)]
        sheet: Option<String>,

        /// Highlight color marking winners (6 hex digits)
        #[arg(long, default_value = WINNER_FILL_RGB)]
        color: String,

        /// Display-currency price of the base currency unit
        #[arg(long)]
        base_rate: f64,

        /// Display-currency price of one satoshi
        #[arg(long)]
        satoshi_rate: f64,

        /// Output CSV path (default: print to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Append {
            input,
            master,
            output,
            winners_out,
        } => append(&input, &master, &output, winners_out.as_ref()),
        Commands::Winners {
            input,
            sheet,
            color,
            output,
        } => winners(&input, sheet.as_deref(), &color, output.as_ref()),
        Commands::Summary {
            input,
            sheet,
            color,
            base_rate,
            satoshi_rate,
            output,
        } => summary(
            &input,
            sheet.as_deref(),
            &color,
            base_rate,
            satoshi_rate,
            output.as_ref(),
        ),
    }
}

fn append(
    input: &PathBuf,
    master_path: &PathBuf,
    output: &PathBuf,
    winners_out: Option<&PathBuf>,
) -> Result<()> {
    let batch = read_table(input)
        .with_context(|| format!("Failed to read batch file {}", input.display()))?;
    let master = read_table(master_path)
        .with_context(|| format!("Failed to read master file {}", master_path.display()))?;

    // Winner columns only exist in first-generation batch files.
    let winner_index = if batch.find_column(WINNING_BIDDER).is_some()
        && batch.find_column(WINNING_BID).is_some()
    {
        let index = WinnerIndex::from_columns(&batch)?;
        eprintln!("Found explicit winners for {} blocks", index.len());
        Some(index)
    } else {
        None
    };

    let records = reshape::reshape(&batch).context("Failed to reshape batch")?;
    let pivoted = reshape::pivot(&records).context("Failed to pivot batch")?;
    eprintln!(
        "Reshaped {} rows into {} bid records across {} blocks",
        batch.n_rows(),
        records.len(),
        pivoted.n_rows()
    );

    warn_on_repeated_blocks(&master, &pivoted);

    let combined = reshape::append(&master, &pivoted);
    report::write_master_xlsx(&combined, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    eprintln!(
        "Wrote {} ({} rows, {} columns)",
        output.display(),
        combined.n_rows(),
        combined.n_cols()
    );

    if let Some(path) = winners_out {
        match winner_index {
            Some(index) => {
                report::write_winners_csv(&index, path)?;
                eprintln!("Wrote {} winners to {}", index.len(), path.display());
            }
            None => {
                log::warn!("--winners-out given but batch has no winner columns; nothing written");
            }
        }
    }

    Ok(())
}

/// Appending never deduplicates; tell the operator when a batch repeats
/// block heights the master already has.
fn warn_on_repeated_blocks(
    master: &blockbid_sheets::Table,
    batch: &blockbid_sheets::Table,
) {
    let blocks = |table: &blockbid_sheets::Table| -> HashSet<u64> {
        let Some(col) = table.find_column(BLOCK_HEIGHT) else {
            return HashSet::new();
        };
        table
            .rows()
            .iter()
            .filter_map(|row| row[col].as_number())
            .map(|n| n as u64)
            .collect()
    };
    let existing = blocks(master);
    let mut repeated: Vec<u64> = blocks(batch).intersection(&existing).copied().collect();
    if !repeated.is_empty() {
        repeated.sort_unstable();
        log::warn!(
            "batch repeats {} block(s) already in the master (appended anyway): {:?}",
            repeated.len(),
            repeated
        );
    }
}

fn open_sheet<'a>(workbook: &'a Workbook, name: Option<&str>) -> Result<&'a blockbid_sheets::xlsx::Worksheet> {
    match name {
        Some(name) => Ok(workbook.sheet(name)?),
        None => workbook
            .first_sheet()
            .context("Workbook has no sheets"),
    }
}

fn winners(
    input: &PathBuf,
    sheet_name: Option<&str>,
    color: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    let workbook = Workbook::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let sheet = open_sheet(&workbook, sheet_name)?;
    let bids = extract_highlights(sheet, color)
        .with_context(|| format!("Failed to extract highlights from '{}'", sheet.name()))?;
    let index = WinnerIndex::from_highlights(&bids);
    eprintln!(
        "Extracted {} bids, {} winning, from sheet '{}'",
        bids.len(),
        index.len(),
        sheet.name()
    );

    match output {
        Some(path) => {
            report::write_highlights_csv(&bids, path)?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            println!("block_height,miner_id,bid_amount,is_winner");
            for bid in &bids {
                println!(
                    "{},{},{},{}",
                    bid.block_height,
                    bid.miner_id,
                    bid.bid_amount.map(|b| b.to_string()).unwrap_or_default(),
                    bid.is_winner
                );
            }
        }
    }
    Ok(())
}

fn summary(
    input: &PathBuf,
    sheet_name: Option<&str>,
    color: &str,
    base_rate: f64,
    satoshi_rate: f64,
    output: Option<&PathBuf>,
) -> Result<()> {
    // Validate the rates before any file work.
    let rates = ExchangeRates::new(base_rate, satoshi_rate)
        .context("Invalid exchange rates")?;

    let workbook = Workbook::open(input)
        .with_context(|| format!("Failed to open {}", input.display()))?;
    let sheet = open_sheet(&workbook, sheet_name)?;
    let bids = extract_highlights(sheet, color)?;
    let summaries = summarize(&bids);
    let priced = price_summaries(&summaries, &rates);
    eprintln!("Summarized {} bids for {} miners", bids.len(), priced.len());

    match output {
        Some(path) => {
            report::write_summary_csv(&priced, path)?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            println!(
                "{:<16} {:>8} {:>10} {:>16} {:>16}",
                "miner", "bids", "win rate", "total", "average"
            );
            for row in &priced {
                println!(
                    "{:<16} {:>8} {:>10} {:>16.2} {:>16.2}",
                    row.miner_id,
                    row.blocks_bid,
                    row.win_rate
                        .map(|r| format!("{:.0}%", r * 100.0))
                        .unwrap_or_else(|| "-".to_string()),
                    row.total_display,
                    row.average_display
                );
            }
        }
    }
    Ok(())
}
