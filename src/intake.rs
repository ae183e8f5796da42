/*!
 * Keyword sheet intake.
 *
 * Reads a `.csv` or `.xlsx` file into submission rows. Header names are
 * matched case-insensitively with spaces and underscores ignored, so
 * `Product Category`, `product_category` and `PRODUCTCATEGORY` are the same
 * column. Only the keyword column is mandatory.
 */

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, warn};
use std::io::Read;
use std::path::Path;

use crate::database::models::NewItem;

/// Positions of the known columns in a sheet's header row
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct ColumnMap {
    keyword: usize,
    category: Option<usize>,
    subcategory: Option<usize>,
    product_category: Option<usize>,
}

fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

impl ColumnMap {
    fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let names: Vec<String> = headers.into_iter().map(normalize_header).collect();
        let find = |wanted: &str| names.iter().position(|n| n == wanted);

        let keyword = find("keyword").ok_or_else(|| {
            anyhow!("Missing 'Keyword' column (found: {})", names.join(", "))
        })?;

        Ok(Self {
            keyword,
            category: find("category"),
            subcategory: find("subcategory"),
            product_category: find("productcategory"),
        })
    }

    fn to_item<'a>(&self, row_number: usize, field: impl Fn(usize) -> Option<&'a str>) -> Option<NewItem> {
        let keyword = field(self.keyword).map(str::trim).unwrap_or("");
        if keyword.is_empty() {
            warn!("Skipping row {}: empty keyword", row_number);
            return None;
        }

        let mut item = NewItem::new(keyword);
        if let Some(value) = self.category.and_then(&field) {
            item = item.category(value);
        }
        if let Some(value) = self.subcategory.and_then(&field) {
            item = item.subcategory(value);
        }
        if let Some(value) = self.product_category.and_then(&field) {
            item = item.product_category(value);
        }
        Some(item)
    }
}

/// Read a keyword sheet, choosing the parser by file extension
pub fn read_keyword_file(path: &Path) -> Result<Vec<NewItem>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let items = match extension.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open keyword file: {}", path.display()))?;
            read_keyword_csv(file)
        }
        "xlsx" | "xls" | "xlsm" | "ods" => read_keyword_workbook(path),
        _ => Err(anyhow!(
            "Unsupported keyword file type '{}': expected .csv or .xlsx",
            path.display()
        )),
    }
    .with_context(|| format!("Failed to read keywords from {}", path.display()))?;

    debug!("Read {} keywords from {}", items.len(), path.display());
    Ok(items)
}

/// Read keyword rows from CSV data with a header row
pub fn read_keyword_csv<R: Read>(reader: R) -> Result<Vec<NewItem>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let columns = ColumnMap::from_headers(headers.iter())?;

    let mut items = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV row {}", index + 2))?;
        if let Some(item) = columns.to_item(index + 2, |col| record.get(col)) {
            items.push(item);
        }
    }
    Ok(items)
}

/// Read keyword rows from the first sheet of a workbook
pub fn read_keyword_workbook(path: &Path) -> Result<Vec<NewItem>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("Workbook has no sheets"))?
        .context("Failed to read first sheet")?;

    let mut rows = range.rows();
    let header_row: Vec<String> = match rows.next() {
        Some(row) => row.iter().map(cell_text).collect(),
        None => return Ok(Vec::new()),
    };
    let columns = ColumnMap::from_headers(header_row.iter().map(String::as_str))?;

    let mut items = Vec::new();
    for (index, row) in rows.enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        if let Some(item) = columns.to_item(index + 2, |col| cells.get(col).map(String::as_str)) {
            items.push(item);
        }
    }
    Ok(items)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
