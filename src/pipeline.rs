use std::path::Path;

use tracing::{info, warn};

use crate::cache;
use crate::categorizer::Categorizer;
use crate::consolidator::consolidate_with_report;
use crate::error::{CategorizationError, ExtractionError, SchemaMismatch};
use crate::extractor::PageExtractor;
use crate::models::{ColumnRole, ConsolidatedTable};

/// One document's outcome. Only extraction failures abort processing;
/// everything else is carried here so callers can still show the data.
#[derive(Debug, Default)]
pub struct ProcessedDocument {
    pub table: Option<ConsolidatedTable>,
    pub from_cache: bool,
    pub schema_mismatches: Vec<SchemaMismatch>,
    pub categorization_error: Option<CategorizationError>,
    pub notices: Vec<String>,
}

pub struct Pipeline<'a> {
    pub extractor: &'a dyn PageExtractor,
    pub categorizer: &'a dyn Categorizer,
    pub use_cache: bool,
}

impl Pipeline<'_> {
    pub fn process(&self, source: &Path, key: Option<&str>) -> Result<ProcessedDocument, ExtractionError> {
        let mut doc = ProcessedDocument::default();

        if self.use_cache {
            match cache::load(source) {
                Ok(Some(table)) => {
                    info!(source = %source.display(), rows = table.len(), "using cached table");
                    doc.from_cache = true;
                    doc.table = Some(if table.find_column(ColumnRole::Category).is_some() {
                        table
                    } else {
                        self.categorize(table, &mut doc)
                    });
                    return Ok(doc);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "cache unreadable; re-extracting");
                    doc.notices.push(format!("Cache ignored: {e}"));
                }
            }
        }

        let pages = self.extractor.extract_pages(source, key)?;
        let consolidation = consolidate_with_report(&pages);
        for mismatch in &consolidation.mismatches {
            doc.notices.push(mismatch.to_string());
        }
        doc.schema_mismatches = consolidation.mismatches;

        let Some(table) = consolidation.table else {
            doc.notices.push("No transaction table found in the document.".to_string());
            return Ok(doc);
        };
        let table = self.categorize(table, &mut doc);

        if self.use_cache {
            if let Err(e) = cache::store(source, &table) {
                warn!(error = %e, "cache write failed");
                doc.notices.push(format!("Could not write cache: {e}"));
            }
        }
        doc.table = Some(table);
        Ok(doc)
    }

    fn categorize(&self, table: ConsolidatedTable, doc: &mut ProcessedDocument) -> ConsolidatedTable {
        match self.categorizer.categorize(&table) {
            Ok(categorized) => categorized,
            Err(e) => {
                warn!(error = %e, "continuing with uncategorized transactions");
                doc.notices.push(format!("{e}; showing uncategorized transactions."));
                doc.categorization_error = Some(e);
                table
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{RuleCategorizer, CATEGORY_COLUMN};
    use crate::error::ExtractionErrorKind;
    use crate::models::RawPageTable;
    use std::cell::Cell;

    struct StubPages {
        pages: Vec<RawPageTable>,
        calls: Cell<usize>,
    }

    impl PageExtractor for StubPages {
        fn extract_pages(&self, _source: &Path, _key: Option<&str>) -> Result<Vec<RawPageTable>, ExtractionError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.pages.clone())
        }
    }

    struct Locked;

    impl PageExtractor for Locked {
        fn extract_pages(&self, _source: &Path, key: Option<&str>) -> Result<Vec<RawPageTable>, ExtractionError> {
            match key {
                Some("secret") => Ok(Vec::new()),
                _ => Err(ExtractionError::decryption("wrong key")),
            }
        }
    }

    struct Broken;

    impl Categorizer for Broken {
        fn categorize(&self, _table: &ConsolidatedTable) -> Result<ConsolidatedTable, CategorizationError> {
            Err(CategorizationError("model not loaded".into()))
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn stub() -> StubPages {
        let header = row(&["Date", "Particulars", "Withdrawal", "Deposit", "Balance"]);
        StubPages {
            pages: vec![RawPageTable::new(vec![
                header,
                row(&["01/04/2024", "SALARY APRIL", "", "50000", "50000"]),
                row(&["02/04/2024", "UPI/SWIGGY", "400", "", "49600"]),
            ])],
            calls: Cell::new(0),
        }
    }

    #[test]
    fn test_process_categorizes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stmt.xlsx");
        let extractor = stub();
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &categorizer, use_cache: true };

        let doc = pipeline.process(&source, None).unwrap();
        let table = doc.table.unwrap();
        assert!(!doc.from_cache);
        assert_eq!(table.len(), 2);
        assert!(table.column_index(CATEGORY_COLUMN).is_some());
        assert!(cache::cache_path(&source).exists());

        let again = pipeline.process(&source, None).unwrap();
        assert!(again.from_cache);
        assert_eq!(again.table.unwrap().text_rows(), table.text_rows());
        assert_eq!(extractor.calls.get(), 1);
    }

    #[test]
    fn test_cache_disabled_always_extracts() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stmt.xlsx");
        let extractor = stub();
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &categorizer, use_cache: false };
        pipeline.process(&source, None).unwrap();
        pipeline.process(&source, None).unwrap();
        assert_eq!(extractor.calls.get(), 2);
        assert!(!cache::cache_path(&source).exists());
    }

    #[test]
    fn test_categorization_failure_keeps_table() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = stub();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &Broken, use_cache: false };
        let doc = pipeline.process(&dir.path().join("s.xlsx"), None).unwrap();
        assert!(doc.categorization_error.is_some());
        let table = doc.table.unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.find_column(ColumnRole::Category).is_none());
        assert!(!doc.notices.is_empty());
    }

    #[test]
    fn test_decryption_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &Locked, categorizer: &categorizer, use_cache: false };
        let err = pipeline.process(&dir.path().join("s.xlsx"), None).unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Decryption);
        let err = pipeline.process(&dir.path().join("s.xlsx"), Some("guess")).unwrap_err();
        assert_eq!(err.kind, ExtractionErrorKind::Decryption);
        let doc = pipeline.process(&dir.path().join("s.xlsx"), Some("secret")).unwrap();
        assert!(doc.table.is_none());
    }

    #[test]
    fn test_unreadable_cache_falls_back_to_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stmt.xlsx");
        std::fs::write(cache::cache_path(&source), [0xff, 0xfe, b',', b'\n']).unwrap();
        let extractor = stub();
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &categorizer, use_cache: true };
        let doc = pipeline.process(&source, None).unwrap();
        assert!(!doc.from_cache);
        assert_eq!(extractor.calls.get(), 1);
        assert!(doc.notices.iter().any(|n| n.starts_with("Cache ignored")));
    }

    #[test]
    fn test_uncategorized_cache_gains_category() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("stmt.xlsx");
        let uncategorized = ConsolidatedTable::from_text_rows(
            vec!["Date".into(), "Particulars".into(), "Withdrawal".into(), "Balance".into()],
            vec![vec!["02/04/2024".into(), "UPI/SWIGGY".into(), "400".into(), "49600".into()]],
        );
        cache::store(&source, &uncategorized).unwrap();

        let extractor = stub();
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &categorizer, use_cache: true };
        let doc = pipeline.process(&source, None).unwrap();
        assert!(doc.from_cache);
        assert_eq!(extractor.calls.get(), 0);
        let table = doc.table.unwrap();
        let idx = table.column_index(CATEGORY_COLUMN).unwrap();
        assert_eq!(table.rows()[0][idx].render(), "Food & Dining");
    }

    #[test]
    fn test_page_directory_with_trailing_slash_keeps_cache_outside() {
        use crate::extractor::CsvPagesExtractor;

        let dir = tempfile::tempdir().unwrap();
        let pages = dir.path().join("stmt");
        std::fs::create_dir_all(&pages).unwrap();
        std::fs::write(
            pages.join("page-01.csv"),
            "Date,Particulars,Withdrawal,Deposit,Balance\n\
             01/04/2024,SALARY APRIL,,50000,50000\n\
             02/04/2024,UPI/SWIGGY,400,,49600\n",
        )
        .unwrap();
        let source = std::path::PathBuf::from(format!("{}/", pages.display()));
        let categorizer = RuleCategorizer::with_defaults().unwrap();

        let cached = Pipeline { extractor: &CsvPagesExtractor, categorizer: &categorizer, use_cache: true };
        cached.process(&source, None).unwrap();
        assert!(dir.path().join("stmt_processed.csv").exists());
        assert_eq!(std::fs::read_dir(&pages).unwrap().count(), 1);

        let fresh = Pipeline { extractor: &CsvPagesExtractor, categorizer: &categorizer, use_cache: false };
        let doc = fresh.process(&source, None).unwrap();
        assert!(doc.schema_mismatches.is_empty());
        assert_eq!(doc.table.unwrap().len(), 2);
    }

    #[test]
    fn test_schema_mismatch_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut extractor = stub();
        extractor.pages.push(RawPageTable::new(vec![row(&["Txn Date", "Narration", "Debit", "Credit", "Balance"])]));
        let categorizer = RuleCategorizer::with_defaults().unwrap();
        let pipeline = Pipeline { extractor: &extractor, categorizer: &categorizer, use_cache: false };
        let doc = pipeline.process(&dir.path().join("s.xlsx"), None).unwrap();
        assert_eq!(doc.schema_mismatches.len(), 1);
        assert_eq!(doc.table.unwrap().len(), 3);
    }
}
