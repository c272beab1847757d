use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{document, SourceArgs};
use crate::error::Result;
use crate::fmt::amount;
use crate::models::{ColumnKind, Value};

pub fn run(args: &SourceArgs) -> Result<()> {
    let Some(data) = document::load(args)? else {
        return Ok(());
    };

    let mut table = Table::new();
    table.set_header(data.columns().to_vec());
    for row in data.rows() {
        table.add_row(row.iter().enumerate().map(|(idx, value)| {
            let numeric = data.kind(idx) == ColumnKind::Numeric;
            match value {
                Value::Number(n) if numeric => Cell::new(amount(*n)).set_alignment(CellAlignment::Right),
                other => Cell::new(other.render()),
            }
        }));
    }
    println!("Transactions ({})\n{table}", data.len());
    Ok(())
}
