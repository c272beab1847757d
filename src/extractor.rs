use std::path::{Path, PathBuf};

use calamine::{Data, Reader};
use tracing::{debug, info};

use crate::cache::CACHE_SUFFIX;
use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::models::{format_number, RawPageTable};

/// Boundary to whatever tool detects tables on a document's pages. One
/// [`RawPageTable`] per page, in page order.
pub trait PageExtractor {
    fn extract_pages(&self, source: &Path, key: Option<&str>) -> Result<Vec<RawPageTable>, ExtractionError>;
}

/// A directory of per-page CSV files, read in file-name order.
pub struct CsvPagesExtractor;

impl PageExtractor for CsvPagesExtractor {
    fn extract_pages(&self, source: &Path, key: Option<&str>) -> Result<Vec<RawPageTable>, ExtractionError> {
        if key.is_some() {
            debug!("CSV page exports are never encrypted; ignoring key");
        }
        let entries = std::fs::read_dir(source)
            .map_err(|e| ExtractionError::unreadable(format!("{}: {e}", source.display())))?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map_or(false, |e| e.eq_ignore_ascii_case("csv")))
            .filter(|p| !p.to_string_lossy().ends_with(CACHE_SUFFIX))
            .collect();
        files.sort();

        let mut pages = Vec::with_capacity(files.len());
        for file in &files {
            pages.push(read_csv_page(file)?);
        }
        info!(source = %source.display(), pages = pages.len(), "extracted CSV page tables");
        Ok(pages)
    }
}

fn read_csv_page(path: &Path) -> Result<RawPageTable, ExtractionError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ExtractionError::unreadable(format!("{}: {e}", path.display())))?;
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| ExtractionError::unreadable(format!("{}: {e}", path.display())))?;
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        rows.push(cells);
    }
    Ok(RawPageTable::new(rows))
}

/// A workbook with one sheet per page.
pub struct WorkbookExtractor;

impl PageExtractor for WorkbookExtractor {
    fn extract_pages(&self, source: &Path, key: Option<&str>) -> Result<Vec<RawPageTable>, ExtractionError> {
        let mut workbook = calamine::open_workbook_auto(source).map_err(|e| workbook_error(e, key))?;
        let mut pages = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ExtractionError::unreadable(format!("sheet {name}: {e}")))?;
            let rows: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
                .filter(|cells| cells.iter().any(|c| !c.is_empty()))
                .collect();
            pages.push(RawPageTable::new(rows));
        }
        info!(source = %source.display(), pages = pages.len(), "extracted workbook page tables");
        Ok(pages)
    }
}

fn workbook_error(err: calamine::Error, key: Option<&str>) -> ExtractionError {
    match err {
        calamine::Error::Xlsx(calamine::XlsxError::Password) | calamine::Error::Xls(calamine::XlsError::Password) => {
            let detail = if key.is_some() {
                "workbook is password protected and the key could not be applied"
            } else {
                "workbook is password protected; a decryption key is required"
            };
            ExtractionError::decryption(detail)
        }
        other => ExtractionError::unreadable(other.to_string()),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Pick an extractor from the shape of `source`.
pub fn extractor_for(source: &Path) -> Result<Box<dyn PageExtractor>, ExtractionError> {
    if source.is_dir() {
        return Ok(Box::new(CsvPagesExtractor));
    }
    if !source.exists() {
        return Err(ExtractionError::unreadable(format!("{} not found", source.display())));
    }
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => Ok(Box::new(WorkbookExtractor)),
        _ => Err(ExtractionError::new(
            ExtractionErrorKind::Unsupported,
            format!(
                "no page-table extractor for {}; export the statement's tables as a workbook or a directory of per-page CSV files",
                source.display()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_pages_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page-02.csv"), "Date,Particulars\n02/04/2024,B\n").unwrap();
        std::fs::write(dir.path().join("page-01.csv"), "Date,Particulars\n01/04/2024, A \n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let pages = CsvPagesExtractor.extract_pages(dir.path(), None).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows[1], vec!["01/04/2024".to_string(), "A".to_string()]);
        assert_eq!(pages[1].rows[1][1], "B");
    }

    #[test]
    fn test_csv_pages_skip_cache_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_processed.csv"), "Date,Particulars,Category\n01/04/2024,A,Food\n").unwrap();
        std::fs::write(dir.path().join("page-01.csv"), "Date,Particulars\n01/04/2024,A\n").unwrap();
        let pages = CsvPagesExtractor.extract_pages(dir.path(), None).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].header().unwrap(), ["Date".to_string(), "Particulars".to_string()]);
    }

    #[test]
    fn test_csv_page_keeps_ragged_rows_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p1.csv"), "A,B\n,\n1,2,3\n").unwrap();
        let pages = CsvPagesExtractor.extract_pages(dir.path(), None).unwrap();
        assert_eq!(pages[0].rows.len(), 2);
        assert_eq!(pages[0].rows[1].len(), 3);
    }

    #[test]
    fn test_empty_page_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p1.csv"), "").unwrap();
        let pages = CsvPagesExtractor.extract_pages(dir.path(), None).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_extractor_for_rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("statement.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let err = extractor_for(&pdf).err().unwrap();
        assert_eq!(err.kind, ExtractionErrorKind::Unsupported);
        let missing = extractor_for(&dir.path().join("nope.xlsx")).err().unwrap();
        assert_eq!(missing.kind, ExtractionErrorKind::Unreadable);
        assert!(extractor_for(dir.path()).is_ok());
    }

    #[test]
    fn test_cell_text_renders_numbers() {
        assert_eq!(cell_text(&Data::Float(1500.0)), "1500");
        assert_eq!(cell_text(&Data::Float(250.75)), "250.75");
        assert_eq!(cell_text(&Data::Int(42)), "42");
        assert_eq!(cell_text(&Data::String("  RENT ".into())), "RENT");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_password_errors_map_to_decryption() {
        let err = workbook_error(calamine::Error::Xlsx(calamine::XlsxError::Password), None);
        assert_eq!(err.kind, ExtractionErrorKind::Decryption);
        let err = workbook_error(calamine::Error::Xls(calamine::XlsError::Password), Some("guess"));
        assert_eq!(err.kind, ExtractionErrorKind::Decryption);
        assert!(err.detail.contains("key could not be applied"));
        let err = workbook_error(calamine::Error::Msg("bad sheet"), None);
        assert_eq!(err.kind, ExtractionErrorKind::Unreadable);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_workbook_sheets_become_pages() {
        use rust_xlsxwriter::Workbook;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stmt.xlsx");
        let mut workbook = Workbook::new();
        for (page, (desc, amount)) in [("SALARY APRIL", 50000.0), ("UPI/SWIGGY", 250.75)].iter().enumerate() {
            let sheet = workbook.add_worksheet();
            sheet.set_name(format!("Page {}", page + 1)).unwrap();
            sheet.write_string(0, 0, "Particulars").unwrap();
            sheet.write_string(0, 1, "Balance").unwrap();
            sheet.write_string(1, 0, *desc).unwrap();
            sheet.write_number(1, 1, *amount).unwrap();
        }
        workbook.save(&path).unwrap();

        let pages = WorkbookExtractor.extract_pages(&path, None).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].rows[0], vec!["Particulars".to_string(), "Balance".to_string()]);
        assert_eq!(pages[0].rows[1], vec!["SALARY APRIL".to_string(), "50000".to_string()]);
        assert_eq!(pages[1].rows[1], vec!["UPI/SWIGGY".to_string(), "250.75".to_string()]);
    }

    #[test]
    fn test_corrupt_workbook_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        let err = WorkbookExtractor.extract_pages(&path, None).unwrap_err();
        assert_ne!(err.kind, ExtractionErrorKind::Unsupported);
    }
}
