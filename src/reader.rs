//! Table ingestion: one parser per file extension.

use std::path::Path;

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use crate::xlsx::Workbook;

/// Load a tabular file into a `Table`, choosing the parser by extension.
///
/// `.csv` goes through the csv crate; `.xlsx` is read as a workbook and
/// its first sheet taken. The file is opened fresh on every call — there
/// is no handle reuse across invocations. Anything else fails with
/// `UnreadableFile`.
pub fn read_table(path: &Path) -> Result<Table> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some("csv") => read_csv_table(path),
        Some("xlsx") => read_xlsx_table(path),
        _ => Err(Error::unreadable(
            path.display().to_string(),
            "unsupported file extension (expected .csv or .xlsx)",
        )),
    }
}

fn read_csv_table(path: &Path) -> Result<Table> {
    // Parse failures are corrupt content, not a csv-layer detail.
    let corrupt = |e: csv::Error| Error::unreadable(path.display().to_string(), e.to_string());
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(corrupt)?;
    let headers = reader.headers().map_err(corrupt)?.clone();
    let mut table = Table::new(headers.iter().map(|h| h.to_string()).collect());
    for result in reader.records() {
        let record = result.map_err(corrupt)?;
        table.push_row(record.iter().map(CellValue::from_field).collect());
    }
    Ok(table)
}

fn read_xlsx_table(path: &Path) -> Result<Table> {
    let workbook = Workbook::open(path)?;
    let sheet = workbook.first_sheet().ok_or_else(|| {
        Error::unreadable(path.display().to_string(), "workbook has no sheets")
    })?;
    Ok(sheet.to_table())
}
