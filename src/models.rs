use std::str::FromStr;

/// One page's worth of extracted cells, before cross-page reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPageTable {
    pub rows: Vec<Vec<String>>,
}

impl RawPageTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }
}

/// Parse a cell as a number. Thousands separators, quotes and
/// parenthesized negatives are tolerated; non-finite results are rejected.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('"', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let value = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        -inner.trim().parse::<f64>().ok()?
    } else {
        s.parse::<f64>().ok()?
    };
    value.is_finite().then_some(value)
}

pub fn format_number(val: f64) -> String {
    if val == 0.0 {
        return "0".to_string();
    }
    if val.fract() == 0.0 && val.abs() < 1e15 {
        format!("{val:.0}")
    } else {
        format!("{val}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Empty,
}

impl Value {
    fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Value::Empty
        } else {
            Value::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view of the cell; text that does not parse yields `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_number(s),
            Value::Empty => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Empty => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// Conventional statement columns, matched by header aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    Particulars,
    Withdrawal,
    Deposit,
    Balance,
    Category,
}

impl ColumnRole {
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &["date", "txn date", "tran date", "transaction date", "value date", "posting date"],
            Self::Particulars => &[
                "particulars",
                "description",
                "narration",
                "details",
                "transaction details",
                "remarks",
                "payee",
            ],
            Self::Withdrawal => &["withdrawal", "withdrawl", "withdrawals", "withdrawal amt", "debit", "debits", "dr"],
            Self::Deposit => &["deposit", "deposits", "deposit amt", "credit", "credits", "cr"],
            Self::Balance => &["balance", "closing balance", "running balance", "running bal"],
            Self::Category => &["category"],
        }
    }

    pub fn matches(&self, header: &str) -> bool {
        let name = normalize_header(header);
        self.aliases().iter().any(|alias| {
            name == *alias
                || name.starts_with(&format!("{alias} "))
                || name.starts_with(&format!("{alias}("))
        })
    }
}

fn normalize_header(header: &str) -> String {
    let lowered = header.to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('.').to_string()
}

/// Schema-consistent record set. Built once, never mutated in place: every
/// transformation returns a new table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedTable {
    columns: Vec<String>,
    kinds: Vec<ColumnKind>,
    rows: Vec<Vec<Value>>,
}

impl ConsolidatedTable {
    /// Build from raw text rows. Short rows are padded, long rows truncated
    /// to the schema width, then every column goes through type coercion.
    pub fn from_text_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|row| {
                if row.len() > width {
                    tracing::debug!(cells = row.len(), width, "truncating over-long row");
                }
                let mut cells: Vec<Value> = row.iter().take(width).map(|c| Value::from_cell(c)).collect();
                cells.resize(width, Value::Empty);
                cells
            })
            .collect();
        let mut table = Self {
            kinds: vec![ColumnKind::Text; width],
            columns,
            rows,
        };
        table.coerce_columns();
        table
    }

    /// A column is numeric only if it has values and every one of them
    /// parses; otherwise the whole column stays text.
    fn coerce_columns(&mut self) {
        for idx in 0..self.columns.len() {
            let mut any = false;
            let all_numeric = self.rows.iter().all(|row| match &row[idx] {
                Value::Empty => true,
                v => {
                    any = true;
                    v.as_number().is_some()
                }
            });
            if !(any && all_numeric) {
                self.kinds[idx] = ColumnKind::Text;
                continue;
            }
            self.kinds[idx] = ColumnKind::Numeric;
            for row in &mut self.rows {
                if let Some(n) = row[idx].as_number() {
                    row[idx] = Value::Number(n);
                }
            }
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn kind(&self, idx: usize) -> ColumnKind {
        self.kinds[idx]
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// First column whose header is an alias of `role`.
    pub fn find_column(&self, role: ColumnRole) -> Option<usize> {
        self.columns.iter().position(|c| role.matches(c))
    }

    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            kinds: self.kinds.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Return a copy with a text column set to `values`. An existing column
    /// of that name is overwritten in place, otherwise one is appended.
    pub fn with_text_column(&self, name: &str, values: Vec<String>) -> Self {
        let mut next = self.clone();
        let idx = match next.column_index(name) {
            Some(idx) => {
                next.kinds[idx] = ColumnKind::Text;
                idx
            }
            None => {
                next.columns.push(name.to_string());
                next.kinds.push(ColumnKind::Text);
                for row in &mut next.rows {
                    row.push(Value::Empty);
                }
                next.columns.len() - 1
            }
        };
        for (row, value) in next.rows.iter_mut().zip(values) {
            row[idx] = Value::from_cell(&value);
        }
        next
    }

    /// Rows as rendered strings, the form used for export and caching.
    pub fn text_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Value::render).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotals {
    pub name: String,
    pub count: usize,
    pub expense: f64,
    pub income: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    /// In first-seen order.
    pub categories: Vec<CategoryTotals>,
    /// False when Withdrawal/Deposit columns are absent; totals are then zero.
    pub has_amounts: bool,
    pub total_expense: f64,
    pub total_income: f64,
    pub net_flow: f64,
}

impl CategorySummary {
    /// Categories with nonzero expense, largest first.
    pub fn expenses_desc(&self) -> Vec<&CategoryTotals> {
        let mut items: Vec<_> = self.categories.iter().filter(|c| c.expense != 0.0).collect();
        items.sort_by(|a, b| b.expense.total_cmp(&a.expense));
        items
    }

    /// Categories with nonzero income, largest first.
    pub fn incomes_desc(&self) -> Vec<&CategoryTotals> {
        let mut items: Vec<_> = self.categories.iter().filter(|c| c.income != 0.0).collect();
        items.sort_by(|a, b| b.income.total_cmp(&a.income));
        items
    }

    pub fn flow_label(&self) -> &'static str {
        if self.net_flow >= 0.0 {
            "Positive"
        } else {
            "Negative"
        }
    }
}

/// Size-bounded text for the generative service, plus the local summary it
/// was built from so a fallback can be computed without the table.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptDigest {
    pub text: String,
    pub truncated: bool,
    pub summary: Option<CategorySummary>,
    pub summary_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceSource {
    Generated,
    Fallback,
}

impl std::fmt::Display for AdviceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => f.write_str("generated"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdviceResult {
    pub text: String,
    pub source: AdviceSource,
}

impl AdviceResult {
    pub fn generated(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: AdviceSource::Generated,
        }
    }

    pub fn fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: AdviceSource::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceTopic {
    SavingStrategies,
    DebtManagement,
    InvestmentOptions,
    BudgetPlanning,
    ExpenseReduction,
}

impl AdviceTopic {
    pub const ALL: [AdviceTopic; 5] = [
        Self::SavingStrategies,
        Self::DebtManagement,
        Self::InvestmentOptions,
        Self::BudgetPlanning,
        Self::ExpenseReduction,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::SavingStrategies => "Saving Strategies",
            Self::DebtManagement => "Debt Management",
            Self::InvestmentOptions => "Investment Options",
            Self::BudgetPlanning => "Budget Planning",
            Self::ExpenseReduction => "Expense Reduction",
        }
    }
}

impl std::fmt::Display for AdviceTopic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AdviceTopic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .iter()
            .find(|t| t.name().replace(' ', "").to_lowercase() == key)
            .copied()
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|t| t.name()).collect();
                format!("Unknown topic '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Available,
    /// A response arrived but none of the known shapes matched.
    Degraded,
    Unavailable,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => f.write_str("available"),
            Self::Degraded => f.write_str("degraded"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}
