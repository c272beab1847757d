use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PersistenceError;
use crate::models::ConsolidatedTable;

pub const CACHE_SUFFIX: &str = "_processed.csv";

/// `<source>_processed.csv`, next to the source. Trailing separators on a
/// directory source are ignored so the cache never lands inside it.
pub fn cache_path(source: &Path) -> PathBuf {
    let Some(file_name) = source.file_name() else {
        let mut name = source.as_os_str().to_os_string();
        name.push(CACHE_SUFFIX);
        return PathBuf::from(name);
    };
    let mut name = file_name.to_os_string();
    name.push(CACHE_SUFFIX);
    match source.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// A cached table if one exists. A present file is always trusted.
pub fn load(source: &Path) -> Result<Option<ConsolidatedTable>, PersistenceError> {
    let path = cache_path(source);
    if !path.exists() {
        return Ok(None);
    }
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    debug!(path = %path.display(), rows = rows.len(), "cache hit");
    Ok(Some(ConsolidatedTable::from_text_rows(columns, rows)))
}

pub fn store(source: &Path, table: &ConsolidatedTable) -> Result<PathBuf, PersistenceError> {
    let path = cache_path(source);
    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record(table.columns())?;
    for row in table.text_rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = table.len(), "cache written");
    Ok(path)
}
