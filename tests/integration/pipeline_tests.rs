/*!
 * End-to-end pipeline: keyword sheet in, export file out.
 *
 * These run the real `LlmTranslator` over a mock provider and write exports
 * with the `FileSystemSink` into a temporary directory.
 */

use calamine::{open_workbook_auto, Reader};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use kwtrans::export::export_file_name;
use kwtrans::providers::mock::MockProvider;
use kwtrans::{
    read_keyword_file, resolve_language_name, ExportFormat, FileSystemSink, JobStatus, JobStore,
    LlmTranslator, Worker,
};

use crate::common::{fast_worker_config, init_test_logging};

const SHEET: &str = "Keyword,Category,Sub Category,Product_Category\n\
running shoes,footwear,,Sports\n\
tent,camping,shelter,\n\
,orphan,,\n\
stove,camping,cooking,Outdoor\n";

fn write_sheet(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("keywords.csv");
    std::fs::write(&path, SHEET).unwrap();
    path
}

fn read_csv(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[tokio::test]
async fn test_csvSheet_throughMockProvider_shouldWriteCsvExport() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let store = JobStore::open(Some(&dir.path().join("jobs.db"))).unwrap();

    let items = read_keyword_file(&write_sheet(dir.path())).unwrap();
    assert_eq!(items.len(), 3);
    let language = resolve_language_name("fr").unwrap();
    let job = store.submit_job(&language, items, 2).await.unwrap();

    let provider = MockProvider::working();
    let translator = Arc::new(LlmTranslator::mock(provider.clone()));
    let exports = dir.path().join("exports");
    let worker = Worker::new(
        store.clone(),
        translator,
        Arc::new(FileSystemSink::new(&exports)),
        fast_worker_config(),
    );

    let outcome = worker.process_job(&job.id).await.unwrap();
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.translated, 3);
    assert_eq!(provider.request_count(), 3);

    let path = exports.join(export_file_name(&job.id, ExportFormat::Csv));
    assert_eq!(outcome.download_url.as_deref(), Some(path.to_string_lossy().as_ref()));

    let rows = read_csv(&path);
    assert_eq!(
        rows,
        vec![
            vec!["running shoes", "footwear", "", "Sports", "running shoes [French]", "running shoes [French alt]"],
            vec!["tent", "camping", "shelter", "", "tent [French]", "tent [French alt]"],
            vec!["stove", "camping", "cooking", "Outdoor", "stove [French]", "stove [French alt]"],
        ]
    );

    let stored = store.get_job(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.download_url, outcome.download_url);
}

#[tokio::test]
async fn test_flakyProvider_shouldRecoverWithinRetryBudget() {
    let dir = TempDir::new().unwrap();
    let store = JobStore::new_in_memory().unwrap();
    let items = read_keyword_file(&write_sheet(dir.path())).unwrap();
    let job = store.submit_job("German", items, 50).await.unwrap();

    // Two outages, then healthy: the first item needs all three attempts
    let provider = MockProvider::fail_first(2);
    let worker = Worker::new(
        store.clone(),
        Arc::new(LlmTranslator::mock(provider.clone())),
        Arc::new(FileSystemSink::new(dir.path())),
        fast_worker_config(),
    );

    let outcome = worker.process_job(&job.id).await.unwrap();
    assert_eq!((outcome.translated, outcome.fallback), (3, 0));
    assert_eq!(provider.request_count(), 5);
}

#[tokio::test]
async fn test_malformedReplies_shouldExportKeywordFallbacks() {
    let dir = TempDir::new().unwrap();
    let store = JobStore::new_in_memory().unwrap();
    let items = read_keyword_file(&write_sheet(dir.path())).unwrap();
    let job = store.submit_job("Spanish", items, 50).await.unwrap();

    let worker = Worker::new(
        store.clone(),
        Arc::new(LlmTranslator::mock(MockProvider::malformed())),
        Arc::new(FileSystemSink::new(dir.path())),
        fast_worker_config(),
    );
    let outcome = worker.process_job(&job.id).await.unwrap();
    assert_eq!(outcome.fallback, 3);

    let rows = read_csv(&dir.path().join(export_file_name(&job.id, ExportFormat::Csv)));
    for row in rows {
        assert_eq!(row[4], row[0]);
        assert_eq!(row[5], row[0]);
    }
}

#[tokio::test]
async fn test_xlsxExport_shouldBeReadableWorkbook() {
    let dir = TempDir::new().unwrap();
    let store = JobStore::new_in_memory().unwrap();
    let items = read_keyword_file(&write_sheet(dir.path())).unwrap();
    let job = store.submit_job("Italian", items, 50).await.unwrap();

    let worker = Worker::new(
        store.clone(),
        Arc::new(LlmTranslator::mock(MockProvider::working())),
        Arc::new(FileSystemSink::new(dir.path())),
        fast_worker_config(),
    )
    .with_export_format(ExportFormat::Xlsx);
    worker.process_job(&job.id).await.unwrap();

    let path = dir.path().join(export_file_name(&job.id, ExportFormat::Xlsx));
    let mut workbook = open_workbook_auto(&path).unwrap();
    let range = workbook.worksheet_range("Translated Keywords").unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();

    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0][0], "keyword");
    assert_eq!(rows[0][5], "translated_variant_2");
    assert_eq!(rows[3][0], "stove");
    assert_eq!(rows[3][4], "stove [Italian]");
}
