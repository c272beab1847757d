use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::models::ConsolidatedTable;

pub const SHEET_NAME: &str = "Transactions";

/// Rows where any cell contains `query`, case-insensitively. A blank query
/// keeps every row.
pub fn filter_view(table: &ConsolidatedTable, query: &str) -> ConsolidatedTable {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return table.clone();
    }
    table.filter_rows(|row| row.iter().any(|v| v.render().to_lowercase().contains(&needle)))
}

pub fn write_csv<W: Write>(view: &ConsolidatedTable, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(view.columns())?;
    for row in view.text_rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv(view: &ConsolidatedTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(view, file)?;
    info!(path = %path.display(), rows = view.len(), "exported CSV");
    Ok(())
}

#[cfg(feature = "xlsx")]
pub fn export_xlsx(view: &ConsolidatedTable, path: &Path) -> Result<()> {
    use crate::error::TallyError;
    use crate::models::Value;
    use rust_xlsxwriter::{Format, Workbook};

    let xlsx_err = |e: rust_xlsxwriter::XlsxError| TallyError::Export(e.to_string());

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_err)?;

    for (col, name) in view.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &bold).map_err(xlsx_err)?;
    }
    for (r, row) in view.rows().iter().enumerate() {
        let r = (r + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            match value {
                Value::Number(n) => {
                    sheet.write_number(r, col, *n).map_err(xlsx_err)?;
                }
                Value::Text(s) => {
                    sheet.write_string(r, col, s).map_err(xlsx_err)?;
                }
                Value::Empty => {}
            }
        }
    }
    workbook.save(path).map_err(xlsx_err)?;
    info!(path = %path.display(), rows = view.len(), "exported spreadsheet");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConsolidatedTable {
        ConsolidatedTable::from_text_rows(
            vec!["Date".into(), "Particulars".into(), "Withdrawal".into(), "Category".into()],
            vec![
                vec!["01/04/2024".into(), "UPI/Swiggy \"late\"".into(), "250.75".into(), "Food".into()],
                vec!["02/04/2024".into(), "RENT, April".into(), "15000".into(), "Rent".into()],
                vec!["03/04/2024".into(), "ZOMATO".into(), "".into(), "Food".into()],
            ],
        )
    }

    #[test]
    fn test_filter_view_case_insensitive() {
        let view = filter_view(&sample(), "food");
        assert_eq!(view.len(), 2);
        assert_eq!(filter_view(&sample(), "  ").len(), 3);
        assert_eq!(filter_view(&sample(), "15000").len(), 1);
    }

    #[test]
    fn test_csv_export_reparses_identically() {
        let view = filter_view(&sample(), "04/2024");
        let mut buf = Vec::new();
        write_csv(&view, &mut buf).unwrap();

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, view.columns());
        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows.len(), view.len());
        assert_eq!(rows, view.text_rows());
    }

    #[test]
    fn test_export_csv_writes_utf8_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let view = ConsolidatedTable::from_text_rows(
            vec!["Particulars".into()],
            vec![vec!["Café ₹".into()]],
        );
        export_csv(&view, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["Particulars", "Café ₹"]);
    }

    #[cfg(feature = "xlsx")]
    #[test]
    fn test_xlsx_export_readable() {
        use calamine::{Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let view = filter_view(&sample(), "food");
        export_xlsx(&view, &path).unwrap();

        let mut workbook = calamine::open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        let rows: Vec<_> = range.rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][1], Data::String("Particulars".into()));
        assert_eq!(rows[1][2], Data::Float(250.75));
        assert_eq!(rows[2][3], Data::String("Food".into()));
    }
}
