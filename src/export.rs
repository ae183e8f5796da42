/*!
 * Export of translated items as a downloadable table.
 *
 * `render_export` turns the items of a job into CSV or XLSX bytes; an
 * `ExportSink` publishes those bytes and returns the reference stored as the
 * job's `download_url`.
 */

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::info;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::database::models::ItemRecord;

/// Column headers, in output order
pub const EXPORT_HEADERS: [&str; 6] = [
    "keyword",
    "category",
    "subcategory",
    "product_category",
    "translated_variant_1",
    "translated_variant_2",
];

/// Worksheet name used for XLSX exports
pub const XLSX_SHEET_NAME: &str = "Translated Keywords";

/// Supported export file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// File extension without the dot
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            _ => Err(anyhow!("Unsupported export format: {}", s)),
        }
    }
}

fn row_fields(item: &ItemRecord) -> [&str; 6] {
    [
        item.keyword.as_str(),
        item.category.as_deref().unwrap_or(""),
        item.subcategory.as_deref().unwrap_or(""),
        item.product_category.as_deref().unwrap_or(""),
        item.translated_variant_1.as_deref().unwrap_or(""),
        item.translated_variant_2.as_deref().unwrap_or(""),
    ]
}

/// Render items, in the given order, as a table in the requested format
pub fn render_export(items: &[ItemRecord], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => render_csv(items),
        ExportFormat::Xlsx => render_xlsx(items),
    }
}

fn render_csv(items: &[ItemRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS).context("Failed to write CSV header")?;
    for item in items {
        writer
            .write_record(row_fields(item))
            .with_context(|| format!("Failed to write CSV row for item {}", item.id))?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV export: {}", e))
}

fn render_xlsx(items: &[ItemRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (row, item) in items.iter().enumerate() {
        for (col, value) in row_fields(item).iter().enumerate() {
            sheet.write_string(row as u32 + 1, col as u16, *value)?;
        }
    }

    workbook
        .save_to_buffer()
        .context("Failed to build XLSX export")
}

/// File name of a job's export
pub fn export_file_name(job_id: &str, format: ExportFormat) -> String {
    format!("translated_keywords_{}.{}", job_id, format.extension())
}

/// Destination for rendered exports
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Store the bytes and return a stable reference to them
    async fn publish(&self, job_id: &str, format: ExportFormat, bytes: Vec<u8>) -> Result<String>;
}

/// Sink writing exports into a local directory
#[derive(Debug, Clone)]
pub struct FileSystemSink {
    dir: PathBuf,
}

impl FileSystemSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for FileSystemSink {
    async fn publish(&self, job_id: &str, format: ExportFormat, bytes: Vec<u8>) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create export directory: {}", self.dir.display()))?;

        let path = self.dir.join(export_file_name(job_id, format));
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write export file: {}", path.display()))?;

        info!("Exported job {} to {}", job_id, path.display());
        Ok(path.to_string_lossy().into_owned())
    }
}
