use tracing::{debug, info, warn};

use crate::error::SchemaMismatch;
use crate::models::{ColumnRole, ConsolidatedTable, RawPageTable};

/// Position of the spurious separator cell some statement layouts emit
/// after the fifth column.
pub const STRAY_CELL_INDEX: usize = 5;

pub struct Consolidation {
    pub table: Option<ConsolidatedTable>,
    pub mismatches: Vec<SchemaMismatch>,
}

pub fn consolidate(pages: &[RawPageTable]) -> Option<ConsolidatedTable> {
    consolidate_with_report(pages).table
}

/// Merge per-page extracts into one table under the first page's header.
///
/// Later pages repeating that header exactly are continuations. A page with
/// any other header is appended whole, header row included, and reported as
/// a [`SchemaMismatch`]; no column re-mapping is attempted.
pub fn consolidate_with_report(pages: &[RawPageTable]) -> Consolidation {
    let mut schema: Option<Vec<String>> = None;
    let mut pool: Vec<Vec<String>> = Vec::new();
    let mut mismatches = Vec::new();

    for (page_no, page) in pages.iter().enumerate() {
        let Some(header) = page.header() else {
            debug!(page = page_no, "no table on page");
            continue;
        };
        match &schema {
            None => {
                schema = Some(header.to_vec());
                pool.extend(page.rows.iter().skip(1).cloned());
            }
            Some(canonical) if canonical.as_slice() == header => {
                pool.extend(page.rows.iter().skip(1).cloned());
            }
            Some(_) => {
                let mismatch = SchemaMismatch {
                    page: page_no,
                    header: header.to_vec(),
                };
                warn!(page = page_no, header = ?mismatch.header, "page header differs from canonical schema");
                pool.extend(page.rows.iter().cloned());
                mismatches.push(mismatch);
            }
        }
    }

    let Some(columns) = schema else {
        info!(pages = pages.len(), "no table found on any page");
        return Consolidation {
            table: None,
            mismatches,
        };
    };

    let width = columns.len();
    let rows: Vec<Vec<String>> = pool
        .into_iter()
        .map(|row| drop_stray_cell(row, width))
        .collect();
    let table = ConsolidatedTable::from_text_rows(columns, rows);
    let pooled = table.len();
    let table = drop_incomplete_rows(&table);

    info!(
        pages = pages.len(),
        pooled,
        kept = table.len(),
        mismatches = mismatches.len(),
        "consolidated statement tables"
    );
    Consolidation {
        table: Some(table),
        mismatches,
    }
}

/// Rows exactly one cell wider than the schema lose the cell at
/// [`STRAY_CELL_INDEX`]. Every other row passes through untouched.
pub fn drop_stray_cell(mut row: Vec<String>, width: usize) -> Vec<String> {
    if row.len() == width + 1 && row.len() > STRAY_CELL_INDEX {
        row.remove(STRAY_CELL_INDEX);
    }
    row
}

/// Drop footer and banner rows: no Particulars value, or no Balance value.
fn drop_incomplete_rows(table: &ConsolidatedTable) -> ConsolidatedTable {
    let particulars = table.find_column(ColumnRole::Particulars);
    let balance = table.find_column(ColumnRole::Balance);
    table.filter_rows(|row| {
        particulars.map_or(true, |idx| !row[idx].is_empty()) && balance.map_or(true, |idx| !row[idx].is_empty())
    })
}
