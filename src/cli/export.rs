use std::path::PathBuf;

use crate::cli::{document, ExportFormat, SourceArgs};
use crate::error::Result;
use crate::export::{export_csv, filter_view};
use crate::settings::shellexpand_path;

pub fn run(args: &SourceArgs, format: ExportFormat, output: &str, search: Option<&str>) -> Result<()> {
    let Some(data) = document::load(args)? else {
        return Ok(());
    };
    let view = filter_view(&data, search.unwrap_or(""));
    let path = PathBuf::from(shellexpand_path(output));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        ExportFormat::Csv => export_csv(&view, &path)?,
        ExportFormat::Xlsx => write_xlsx(&view, &path)?,
    }
    println!("Wrote {} rows to {}", view.len(), path.display());
    Ok(())
}

#[cfg(feature = "xlsx")]
fn write_xlsx(view: &crate::models::ConsolidatedTable, path: &std::path::Path) -> Result<()> {
    crate::export::export_xlsx(view, path)
}

#[cfg(not(feature = "xlsx"))]
fn write_xlsx(_view: &crate::models::ConsolidatedTable, _path: &std::path::Path) -> Result<()> {
    Err(crate::error::TallyError::Export(
        "this build has no spreadsheet support (enable the `xlsx` feature)".to_string(),
    ))
}
