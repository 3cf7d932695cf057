//! Minimal XLSX reader.
//!
//! Reads an .xlsx package just far enough for this pipeline: cell values
//! and cell fill colors. The winner of each block's auction is recorded in
//! the source sheets as a yellow fill rather than as data, so the styles
//! part (`xl/styles.xml`) is resolved alongside the usual workbook, shared
//! strings, and worksheet parts.
//!
//! Parsing scans the XML parts for known tags and attributes instead of
//! building a DOM; the parts Excel and xlsx writers emit are flat enough
//! that this holds up, and unknown content is ignored rather than
//! rejected.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};

/// A cell recovered from a worksheet: its value plus the RGB string of its
/// fill color, when the cell's style carries a pattern fill.
#[derive(Debug, Clone)]
pub struct SheetCell {
    pub value: CellValue,
    /// Fill color as stored in styles.xml, usually 8 hex digits (ARGB).
    pub fill_rgb: Option<String>,
}

/// A single worksheet. Coordinates are 1-based, as in cell references.
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    n_rows: u32,
    n_cols: u32,
    cells: HashMap<(u32, u32), SheetCell>,
}

impl Worksheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_rows(&self) -> u32 {
        self.n_rows
    }

    pub fn n_cols(&self) -> u32 {
        self.n_cols
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&SheetCell> {
        self.cells.get(&(row, col))
    }

    /// Value at (row, col); absent cells read as `Empty`.
    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&(row, col)).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    /// Fill RGB at (row, col), if the cell has one.
    pub fn fill_rgb(&self, row: u32, col: u32) -> Option<&str> {
        self.cells
            .get(&(row, col))
            .and_then(|c| c.fill_rgb.as_deref())
    }

    /// Convert the sheet into a `Table`, taking row 1 as the header.
    ///
    /// Header cells without a value get the pandas-style `Unnamed: N`
    /// placeholder so the reshaper's artifact filter can discard them.
    pub fn to_table(&self) -> Table {
        let mut columns = Vec::with_capacity(self.n_cols as usize);
        for col in 1..=self.n_cols {
            let header = self
                .value(1, col)
                .as_label()
                .unwrap_or_else(|| format!("Unnamed: {}", col - 1));
            columns.push(header);
        }
        let mut table = Table::new(columns);
        for row in 2..=self.n_rows {
            let cells = (1..=self.n_cols)
                .map(|col| self.value(row, col).clone())
                .collect();
            table.push_row(cells);
        }
        table
    }
}

/// An opened workbook with all sheets parsed.
#[derive(Debug)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
}

impl Workbook {
    /// Open and fully parse an .xlsx file.
    pub fn open(path: &Path) -> Result<Workbook> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            Error::unreadable(
                path.display().to_string(),
                format!("not a spreadsheet package: {}", e),
            )
        })?;

        let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?.ok_or_else(|| {
            Error::unreadable(path.display().to_string(), "missing xl/workbook.xml")
        })?;
        let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?
            .map(|xml| parse_relationships(&xml))
            .unwrap_or_default();
        let shared = read_part(&mut archive, "xl/sharedStrings.xml")?
            .map(|xml| parse_shared_strings(&xml))
            .unwrap_or_default();
        let xf_fills = read_part(&mut archive, "xl/styles.xml")?
            .map(|xml| parse_xf_fills(&xml))
            .unwrap_or_default();

        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_entries(&workbook_xml) {
            let target = rels
                .get(&rel_id)
                .cloned()
                .unwrap_or_else(|| format!("worksheets/sheet{}.xml", sheets.len() + 1));
            let part = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{}", target),
            };
            let xml = read_part(&mut archive, &part)?.ok_or_else(|| {
                Error::unreadable(
                    path.display().to_string(),
                    format!("missing worksheet part '{}'", part),
                )
            })?;
            sheets.push(parse_worksheet(&name, &xml, &shared, &xf_fills));
        }

        Ok(Workbook { sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Look up a sheet by name.
    pub fn sheet(&self, name: &str) -> Result<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    /// First sheet in workbook order, if the workbook has any.
    pub fn first_sheet(&self) -> Option<&Worksheet> {
        self.sheets.first()
    }
}

/// Read one file from the package; absent parts come back as `None`.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            Ok(Some(content))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Value of an attribute within a single element tag.
fn attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!(" {}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    Some(&rest[..rest.find('"')?])
}

/// Slice of `content` from the first `open` marker up to (excluding) the
/// matching `close` marker.
fn section<'a>(content: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = content.find(open)?;
    let end = content[start..].find(close)?;
    Some(&content[start..start + end])
}

/// Resolve the XML character entities that appear in part content.
fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Sheet entries from xl/workbook.xml as (name, relationship id) pairs,
/// in workbook order.
fn parse_sheet_entries(content: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let Some(sheets) = section(content, "<sheets", "</sheets>") else {
        return entries;
    };
    let mut pos = 0;
    while let Some(found) = sheets[pos..].find("<sheet ") {
        let start = pos + found;
        let Some(end) = sheets[start..].find("/>") else {
            break;
        };
        let tag = &sheets[start..start + end];
        if let (Some(name), Some(rel_id)) = (attr(tag, "name"), attr(tag, "r:id")) {
            entries.push((unescape(name), rel_id.to_string()));
        }
        pos = start + end + 2;
    }
    entries
}

/// Relationship id -> target part path, from xl/_rels/workbook.xml.rels.
fn parse_relationships(content: &str) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let mut pos = 0;
    while let Some(found) = content[pos..].find("<Relationship ") {
        let start = pos + found;
        let Some(end) = content[start..].find("/>") else {
            break;
        };
        let tag = &content[start..start + end];
        if let (Some(id), Some(target)) = (attr(tag, "Id"), attr(tag, "Target")) {
            rels.insert(id.to_string(), unescape(target));
        }
        pos = start + end + 2;
    }
    rels
}

/// Shared string table from xl/sharedStrings.xml, in index order.
///
/// Rich-text entries concatenate their `<t>` runs.
fn parse_shared_strings(content: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut pos = 0;
    while let Some(found) = content[pos..].find("<si>") {
        let start = pos + found;
        let Some(end) = content[start..].find("</si>") else {
            break;
        };
        let si = &content[start..start + end];
        strings.push(extract_text_runs(si));
        pos = start + end + 5;
    }
    strings
}

/// Concatenated content of every `<t>` element in `xml`.
fn extract_text_runs(xml: &str) -> String {
    let mut text = String::new();
    let mut pos = 0;
    while let Some(found) = xml[pos..].find("<t") {
        let start = pos + found;
        // Only <t> and <t attr...>, not <tag...>
        match xml.as_bytes().get(start + 2) {
            Some(b'>') | Some(b' ') | Some(b'/') => {}
            _ => {
                pos = start + 2;
                continue;
            }
        }
        let Some(gt) = xml[start..].find('>') else {
            break;
        };
        let body_start = start + gt + 1;
        if xml[start..body_start].ends_with("/>") {
            pos = body_start;
            continue;
        }
        let Some(close) = xml[body_start..].find("</t>") else {
            break;
        };
        text.push_str(&unescape(&xml[body_start..body_start + close]));
        pos = body_start + close + 4;
    }
    text
}

/// Per-xf fill RGB, indexed by cell style (`s` attribute).
///
/// Two passes over xl/styles.xml: collect the fgColor RGB of each entry in
/// `<fills>`, then map each `<cellXfs>` xf through its fillId.
fn parse_xf_fills(content: &str) -> Vec<Option<String>> {
    let mut fill_rgbs: Vec<Option<String>> = Vec::new();
    if let Some(fills) = section(content, "<fills", "</fills>") {
        let mut pos = 0;
        while let Some(found) = fills[pos..].find("<fill>") {
            let start = pos + found;
            let Some(end) = fills[start..].find("</fill>") else {
                break;
            };
            let fill = &fills[start..start + end];
            let rgb = section(fill, "<fgColor", "/>")
                .and_then(|tag| attr(tag, "rgb"))
                .map(str::to_string);
            fill_rgbs.push(rgb);
            pos = start + end + 7;
        }
    }

    let mut xf_fills = Vec::new();
    if let Some(xfs) = section(content, "<cellXfs", "</cellXfs>") {
        let mut pos = 0;
        while let Some(found) = xfs[pos..].find("<xf ") {
            let start = pos + found;
            let Some(gt) = xfs[start..].find('>') else {
                break;
            };
            let tag = &xfs[start..start + gt + 1];
            let fill_id = attr(tag, "fillId")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0);
            xf_fills.push(fill_rgbs.get(fill_id).cloned().flatten());
            pos = start + gt + 1;
        }
    }
    xf_fills
}

/// Decode an A1-style cell reference into (row, column), both 1-based.
fn cell_reference(reference: &str) -> Option<(u32, u32)> {
    let bytes = reference.as_bytes();
    let digits_at = bytes.iter().position(|b| b.is_ascii_digit())?;
    if digits_at == 0 {
        return None;
    }
    let mut col = 0u32;
    for &b in &bytes[..digits_at] {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32;
    }
    let row = reference[digits_at..].parse::<u32>().ok()?;
    Some((row, col))
}

/// Parse one worksheet part into a `Worksheet`.
///
/// Cells are located by their `r` reference attribute, so row elements
/// never need to be tracked separately; a cell without a reference is
/// skipped.
fn parse_worksheet(
    name: &str,
    content: &str,
    shared: &[String],
    xf_fills: &[Option<String>],
) -> Worksheet {
    let mut cells = HashMap::new();
    let mut n_rows = 0;
    let mut n_cols = 0;

    if let Some(data) = section(content, "<sheetData", "</sheetData>") {
        let mut pos = 0;
        while let Some(found) = data[pos..].find("<c ") {
            let start = pos + found;
            let Some(gt) = data[start..].find('>') else {
                break;
            };
            let tag = &data[start..start + gt + 1];
            let body;
            if tag.ends_with("/>") {
                body = "";
                pos = start + gt + 1;
            } else {
                match data[start + gt + 1..].find("</c>") {
                    Some(close) => {
                        body = &data[start + gt + 1..start + gt + 1 + close];
                        pos = start + gt + 1 + close + 4;
                    }
                    None => break,
                }
            }

            let Some((row, col)) = attr(tag, "r").and_then(cell_reference) else {
                continue;
            };
            let value = parse_cell_value(attr(tag, "t"), body, shared);
            let fill_rgb = attr(tag, "s")
                .and_then(|v| v.parse::<usize>().ok())
                .and_then(|i| xf_fills.get(i).cloned().flatten());

            n_rows = n_rows.max(row);
            n_cols = n_cols.max(col);
            cells.insert((row, col), SheetCell { value, fill_rgb });
        }
    }

    Worksheet {
        name: name.to_string(),
        n_rows,
        n_cols,
        cells,
    }
}

/// Classify a cell's value from its type attribute and element body.
fn parse_cell_value(cell_type: Option<&str>, body: &str, shared: &[String]) -> CellValue {
    if cell_type == Some("inlineStr") {
        return CellValue::Text(extract_text_runs(body));
    }

    let raw = match section(body, "<v>", "</v>") {
        Some(v) => &v[3..],
        None => return CellValue::Empty,
    };

    match cell_type {
        Some("s") => {
            let text = raw
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i))
                .cloned()
                .unwrap_or_default();
            CellValue::Text(text)
        }
        Some("str") | Some("e") => CellValue::Text(unescape(raw)),
        Some("b") => CellValue::Bool(raw == "1"),
        _ => match raw.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(unescape(raw)),
        },
    }
}
