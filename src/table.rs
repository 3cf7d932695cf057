//! In-memory tables with named columns.
//!
//! `Table` is the common currency of the pipeline: every reader produces
//! one and every reshaping stage consumes and returns one. Columns are
//! addressed by header name, which keeps the open-ended set of miner
//! columns workable without a fixed schema.

use crate::error::{Error, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value (absent cell, not zero).
    Empty,
    /// Numeric value. Integers and floats are not distinguished.
    Number(f64),
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
}

impl CellValue {
    /// Classify a raw text field: empty string becomes `Empty`, numeric
    /// text becomes `Number`, anything else stays `Text`.
    pub fn from_field(field: &str) -> CellValue {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else if let Ok(n) = trimmed.parse::<f64>() {
            CellValue::Number(n)
        } else {
            CellValue::Text(field.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell, if it holds a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text rendering used for labels (miner ids may arrive as numbers).
    pub fn as_label(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(format!("{}", n))
                }
            }
            CellValue::Bool(b) => Some(b.to_string()),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A table with an ordered header row and rows of cells.
///
/// Rows are stored dense; absent entries are `CellValue::Empty`. All rows
/// have exactly `columns.len()` cells.
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Table {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Append a row, padding or truncating to the table width.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.columns.len(), CellValue::Empty);
        self.rows.push(row);
    }

    /// Position of a column by exact header name.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column that the schema requires.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.find_column(name)
            .ok_or_else(|| Error::missing_column(name))
    }

    /// Cell at (row, col). Out-of-range reads come back as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&CellValue::Empty)
    }

    /// Copy of this table without the columns at the given positions.
    pub fn without_columns(&self, drop: &[usize]) -> Table {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !drop.contains(i))
            .collect();
        let mut out = Table::new(keep.iter().map(|&i| self.columns[i].clone()).collect());
        for row in &self.rows {
            out.push_row(keep.iter().map(|&i| row[i].clone()).collect());
        }
        out
    }
}
