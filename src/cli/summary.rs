use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cli::{document, SourceArgs};
use crate::error::Result;
use crate::fmt::amount;
use crate::reports::{category_summary, compute_category_summary};

fn right(text: impl std::fmt::Display) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn run(args: &SourceArgs) -> Result<()> {
    let Some(data) = document::load(args)? else {
        return Ok(());
    };
    let Some(summary) = compute_category_summary(&data) else {
        println!("{}", category_summary(&data));
        return Ok(());
    };

    let mut table = Table::new();
    if !summary.has_amounts {
        table.set_header(vec!["Category", "Transactions"]);
        for cat in &summary.categories {
            table.add_row(vec![Cell::new(&cat.name), right(cat.count)]);
        }
        println!("Category Summary\n{table}");
        return Ok(());
    }

    table.set_header(vec!["Category", "Transactions", "Amount"]);
    let expenses = summary.expenses_desc();
    if !expenses.is_empty() {
        table.add_row(vec![Cell::new("EXPENSES".red().bold()), Cell::new(""), Cell::new("")]);
        for cat in expenses {
            table.add_row(vec![Cell::new(format!("  {}", cat.name)), right(cat.count), right(amount(cat.expense))]);
        }
        table.add_row(vec![Cell::new("Total Expenses".bold()), Cell::new(""), right(amount(summary.total_expense))]);
        table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
    }

    let incomes = summary.incomes_desc();
    if !incomes.is_empty() {
        table.add_row(vec![Cell::new("INCOME".green().bold()), Cell::new(""), Cell::new("")]);
        for cat in incomes {
            table.add_row(vec![Cell::new(format!("  {}", cat.name)), right(cat.count), right(amount(cat.income))]);
        }
        table.add_row(vec![Cell::new("Total Income".bold()), Cell::new(""), right(amount(summary.total_income))]);
    }
    println!("Category Summary\n{table}");

    let net = format!("Net Flow: {} ({})", amount(summary.net_flow), summary.flow_label());
    if summary.net_flow >= 0.0 {
        println!("{}", net.green().bold());
    } else {
        println!("{}", net.red().bold());
    }
    Ok(())
}
