use std::collections::HashMap;

use chrono::NaiveDate;

use crate::fmt::amount;
use crate::models::{CategorySummary, CategoryTotals, ColumnRole, ConsolidatedTable, PromptDigest};

/// Upper bound on digest length; the advice service rejects larger inputs.
pub const DIGEST_MAX_CHARS: usize = 8000;
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

const TOP_PARTICULARS: usize = 5;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d-%b-%Y", "%d %b %Y", "%d-%b-%y", "%d/%m/%y", "%m/%d/%Y"];

// ---------------------------------------------------------------------------
// Category totals
// ---------------------------------------------------------------------------

/// Per-category expense/income totals. `None` when the table has no
/// Category column. Unparseable amounts count as zero.
pub fn compute_category_summary(table: &ConsolidatedTable) -> Option<CategorySummary> {
    let cat_idx = table.find_column(ColumnRole::Category)?;
    let withdrawal = table.find_column(ColumnRole::Withdrawal);
    let deposit = table.find_column(ColumnRole::Deposit);

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, CategoryTotals> = HashMap::new();
    for row in table.rows() {
        let name = match row[cat_idx].render() {
            s if s.is_empty() => "Uncategorized".to_string(),
            s => s,
        };
        let expense = withdrawal.and_then(|i| row[i].as_number()).unwrap_or(0.0);
        let income = deposit.and_then(|i| row[i].as_number()).unwrap_or(0.0);
        let entry = totals.entry(name.clone()).or_insert_with(|| {
            order.push(name.clone());
            CategoryTotals {
                name,
                count: 0,
                expense: 0.0,
                income: 0.0,
            }
        });
        entry.count += 1;
        entry.expense += expense;
        entry.income += income;
    }

    let categories: Vec<CategoryTotals> = order.iter().filter_map(|n| totals.remove(n)).collect();
    let total_expense: f64 = categories.iter().map(|c| c.expense).sum();
    let total_income: f64 = categories.iter().map(|c| c.income).sum();
    Some(CategorySummary {
        categories,
        has_amounts: withdrawal.is_some() || deposit.is_some(),
        total_expense,
        total_income,
        net_flow: total_income - total_expense,
    })
}

// ---------------------------------------------------------------------------
// Human-readable summary
// ---------------------------------------------------------------------------

/// Human-readable category breakdown. Never fails; missing columns produce
/// an explanatory message instead.
pub fn category_summary(table: &ConsolidatedTable) -> String {
    match compute_category_summary(table) {
        Some(summary) => render_summary(&summary),
        None => "Category information is unavailable for this statement, so no category breakdown can be shown."
            .to_string(),
    }
}

pub fn render_summary(summary: &CategorySummary) -> String {
    let mut out = String::from("Category Summary\n");
    if !summary.has_amounts {
        out.push_str("\nWithdrawal/Deposit columns not found; showing transaction counts.\n");
        out.push_str("\nTransactions by Category:\n");
        let mut counts: Vec<_> = summary.categories.iter().collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        for c in counts {
            out.push_str(&format!("- {}: {}\n", c.name, c.count));
        }
        return out;
    }

    let expenses = summary.expenses_desc();
    if !expenses.is_empty() {
        out.push_str("\nExpenses by Category:\n");
        for c in expenses {
            out.push_str(&format!("- {}: {}\n", c.name, amount(c.expense)));
        }
    }
    let incomes = summary.incomes_desc();
    if !incomes.is_empty() {
        out.push_str("\nIncome by Category:\n");
        for c in incomes {
            out.push_str(&format!("- {}: {}\n", c.name, amount(c.income)));
        }
    }
    out.push_str(&format!("\nTotal Expenses: {}\n", amount(summary.total_expense)));
    out.push_str(&format!("Total Income: {}\n", amount(summary.total_income)));
    out.push_str(&format!(
        "Net Flow: {} ({})\n",
        amount(summary.net_flow),
        summary.flow_label()
    ));
    out
}

// ---------------------------------------------------------------------------
// Advice digest
// ---------------------------------------------------------------------------

pub fn digest_for_advice(table: &ConsolidatedTable) -> PromptDigest {
    let summary = compute_category_summary(table);
    let total = table.len();

    let mut out = String::from("Transaction Data Summary\n");
    out.push_str(&format!("Total Transactions: {total}\n"));
    out.push_str(&format!("Date Range: {}\n", date_range(table)));

    out.push_str("\nCategory Distribution:\n");
    match &summary {
        Some(s) => {
            let mut by_count: Vec<_> = s.categories.iter().collect();
            by_count.sort_by(|a, b| b.count.cmp(&a.count));
            for c in by_count {
                let pct = if total > 0 { c.count as f64 / total as f64 * 100.0 } else { 0.0 };
                out.push_str(&format!("- {}: {} transactions ({pct:.1}%)\n", c.name, c.count));
            }
            if s.has_amounts {
                out.push_str("\nExpense Breakdown:\n");
                for c in s.expenses_desc() {
                    out.push_str(&format!("- {}: {}\n", c.name, amount(c.expense)));
                }
                out.push_str("\nIncome Breakdown:\n");
                for c in s.incomes_desc() {
                    out.push_str(&format!("- {}: {}\n", c.name, amount(c.income)));
                }
                out.push_str(&format!("\nTotal Expenses: {}\n", amount(s.total_expense)));
                out.push_str(&format!("Total Income: {}\n", amount(s.total_income)));
                out.push_str(&format!("Net Cash Flow: {} ({})\n", amount(s.net_flow), s.flow_label()));
            }
        }
        None => out.push_str("- Category information unavailable\n"),
    }

    if let Some(idx) = table.find_column(ColumnRole::Particulars) {
        out.push_str("\nMost Frequent Transactions:\n");
        for (desc, count) in top_values(table, idx, TOP_PARTICULARS) {
            out.push_str(&format!("- {desc}: {count} occurrences\n"));
        }
    }

    let (text, truncated) = bound_digest(&out);
    let summary_text = match &summary {
        Some(s) => render_summary(s),
        None => category_summary(table),
    };
    PromptDigest {
        text,
        truncated,
        summary,
        summary_text,
    }
}

/// Collapse carriage returns and tabs, then cap at [`DIGEST_MAX_CHARS`]
/// characters plus [`TRUNCATION_MARKER`].
pub fn bound_digest(raw: &str) -> (String, bool) {
    let clean: String = raw
        .chars()
        .map(|c| if c == '\r' || c == '\t' { ' ' } else { c })
        .collect();
    if clean.chars().count() <= DIGEST_MAX_CHARS {
        return (clean, false);
    }
    let mut cut: String = clean.chars().take(DIGEST_MAX_CHARS).collect();
    cut.push_str(TRUNCATION_MARKER);
    (cut, true)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw.trim(), f).ok())
}

/// Earliest and latest Date values, as written in the statement.
fn date_range(table: &ConsolidatedTable) -> String {
    let Some(idx) = table.find_column(ColumnRole::Date) else {
        return "Unknown".to_string();
    };
    let values: Vec<String> = table
        .column_values(idx)
        .map(|v| v.render())
        .filter(|s| !s.is_empty())
        .collect();
    let dated: Vec<(NaiveDate, &String)> = values.iter().filter_map(|s| parse_date(s).map(|d| (d, s))).collect();

    let bounds = if dated.is_empty() {
        values.iter().min().zip(values.iter().max())
    } else {
        let min = dated.iter().min_by_key(|(d, _)| *d).map(|(_, s)| *s);
        let max = dated.iter().max_by_key(|(d, _)| *d).map(|(_, s)| *s);
        min.zip(max)
    };
    match bounds {
        Some((min, max)) => format!("{min} to {max}"),
        None => "Unknown".to_string(),
    }
}

/// Most frequent distinct non-empty values of a column; ties keep
/// first-seen order.
fn top_values(table: &ConsolidatedTable, idx: usize, limit: usize) -> Vec<(String, usize)> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in table.column_values(idx) {
        let text = value.render();
        if text.is_empty() {
            continue;
        }
        let count = counts.entry(text.clone()).or_insert_with(|| {
            order.push(text.clone());
            0
        });
        *count += 1;
    }
    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|v| {
            let c = counts[&v];
            (v, c)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}
