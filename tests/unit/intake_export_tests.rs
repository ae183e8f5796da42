/*!
 * Keyword sheet intake and export rendering tests
 */

use calamine::{open_workbook_auto, Reader};
use tempfile::TempDir;

use kwtrans::export::{export_file_name, EXPORT_HEADERS, XLSX_SHEET_NAME};
use kwtrans::intake::read_keyword_csv;
use kwtrans::{read_keyword_file, render_export, ExportFormat, ExportSink, FileSystemSink, ItemRecord};

fn translated(position: i64, keyword: &str, fallback: bool) -> ItemRecord {
    let (v1, v2) = if fallback {
        (keyword.to_string(), keyword.to_string())
    } else {
        (format!("{} (fr)", keyword), format!("{} (fr alt)", keyword))
    };
    ItemRecord {
        id: format!("item-{}", position),
        job_id: "job-1".to_string(),
        position,
        keyword: keyword.to_string(),
        category: Some("Outdoor".to_string()),
        subcategory: None,
        product_category: None,
        translated_variant_1: Some(v1),
        translated_variant_2: Some(v2),
        is_fallback: fallback,
    }
}

#[test]
fn test_readKeywordCsv_reorderedAndExtraColumns() {
    let data = "notes,PRODUCT-CATEGORY,keyword\n\
                ignore me,Sports,running shoes\n\
                x,,\"tent, 2 person\"\n";
    let items = read_keyword_csv(data.as_bytes()).unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].keyword, "running shoes");
    assert_eq!(items[0].product_category.as_deref(), Some("Sports"));
    assert_eq!(items[1].keyword, "tent, 2 person");
    assert_eq!(items[1].product_category, None);
}

#[test]
fn test_readKeywordCsv_shortRows_shouldBeAccepted() {
    let items = read_keyword_csv("keyword,category\nshoes\nsocks,apparel\n".as_bytes()).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].category, None);
    assert_eq!(items[1].category.as_deref(), Some("apparel"));
}

#[test]
fn test_readKeywordFile_missingFile_shouldFail() {
    let dir = TempDir::new().unwrap();
    assert!(read_keyword_file(&dir.path().join("absent.csv")).is_err());
}

#[test]
fn test_renderCsv_fallbackRows_shouldRepeatKeyword() {
    let items = vec![translated(1, "stove", false), translated(2, "lantern", true)];
    let bytes = render_export(&items, ExportFormat::Csv).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), EXPORT_HEADERS.join(","));
    assert_eq!(lines.next().unwrap(), "stove,Outdoor,,,stove (fr),stove (fr alt)");
    assert_eq!(lines.next().unwrap(), "lantern,Outdoor,,,lantern,lantern");
    assert_eq!(lines.next(), None);
}

#[test]
fn test_renderCsv_noItems_shouldStillHaveHeader() {
    let bytes = render_export(&[], ExportFormat::Csv).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap().trim_end(), EXPORT_HEADERS.join(","));
}

#[tokio::test]
async fn test_xlsxExport_publishedThenReadBack() {
    let dir = TempDir::new().unwrap();
    let sink = FileSystemSink::new(dir.path().join("exports"));
    let items = vec![translated(1, "stove", false), translated(2, "lantern", true)];

    let bytes = render_export(&items, ExportFormat::Xlsx).unwrap();
    let reference = sink.publish("job-1", ExportFormat::Xlsx, bytes).await.unwrap();
    assert!(reference.ends_with(&export_file_name("job-1", ExportFormat::Xlsx)));

    let mut workbook = open_workbook_auto(&reference).unwrap();
    assert_eq!(workbook.sheet_names(), vec![XLSX_SHEET_NAME.to_string()]);
    let range = workbook.worksheet_range(XLSX_SHEET_NAME).unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();

    assert_eq!(rows[0], EXPORT_HEADERS.map(str::to_string).to_vec());
    assert_eq!(rows[1][4], "stove (fr)");
    assert_eq!(rows[2][4], "lantern");
    assert_eq!(rows[2][5], "lantern");
}

#[tokio::test]
async fn test_exportedWorkbook_shouldBeReadableAsKeywordSheet() {
    let dir = TempDir::new().unwrap();
    let sink = FileSystemSink::new(dir.path());
    let bytes = render_export(&[translated(1, "stove", false)], ExportFormat::Xlsx).unwrap();
    let reference = sink.publish("job-2", ExportFormat::Xlsx, bytes).await.unwrap();

    // The export carries a keyword column, so it can be resubmitted as-is
    let items = read_keyword_file(std::path::Path::new(&reference)).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].keyword, "stove");
    assert_eq!(items[0].category.as_deref(), Some("Outdoor"));
}
