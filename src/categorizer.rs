use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CategorizationError;
use crate::models::{ColumnRole, ConsolidatedTable};

pub const CATEGORY_COLUMN: &str = "Category";
pub const UNMATCHED_CATEGORY: &str = "Other";

/// Attach a Category label to every record. Implementations must keep row
/// count, row order and every existing value.
pub trait Categorizer {
    fn categorize(&self, table: &ConsolidatedTable) -> Result<ConsolidatedTable, CategorizationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Contains,
    StartsWith,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    #[serde(default = "default_match_type")]
    pub match_type: MatchType,
    pub category: String,
    #[serde(default)]
    pub priority: i64,
}

fn default_match_type() -> MatchType {
    MatchType::Contains
}

// (pattern, match_type, category, priority)
const DEFAULT_RULES: &[(&str, MatchType, &str, i64)] = &[
    ("SALARY", MatchType::Contains, "Salary", 10),
    ("PAYROLL", MatchType::Contains, "Salary", 10),
    ("INTEREST", MatchType::Contains, "Interest", 5),
    ("DIVIDEND", MatchType::Contains, "Investments", 5),
    ("MUTUAL FUND", MatchType::Contains, "Investments", 5),
    (r"\bSIP\b", MatchType::Regex, "Investments", 4),
    ("ZERODHA", MatchType::Contains, "Investments", 5),
    (r"\bEMI\b", MatchType::Regex, "Loans & EMI", 6),
    ("LOAN", MatchType::Contains, "Loans & EMI", 6),
    (r"\bRENT\b", MatchType::Regex, "Rent", 6),
    ("INSURANCE", MatchType::Contains, "Insurance", 5),
    (r"\bLIC\b", MatchType::Regex, "Insurance", 4),
    ("SWIGGY", MatchType::Contains, "Food & Dining", 3),
    ("ZOMATO", MatchType::Contains, "Food & Dining", 3),
    ("RESTAURANT", MatchType::Contains, "Food & Dining", 2),
    ("CAFE", MatchType::Contains, "Food & Dining", 2),
    ("GROCER", MatchType::Contains, "Groceries", 3),
    ("BIGBASKET", MatchType::Contains, "Groceries", 3),
    ("SUPERMARKET", MatchType::Contains, "Groceries", 3),
    ("PETROL", MatchType::Contains, "Fuel & Transport", 3),
    ("FUEL", MatchType::Contains, "Fuel & Transport", 3),
    ("UBER", MatchType::Contains, "Fuel & Transport", 3),
    (r"\bOLA\b", MatchType::Regex, "Fuel & Transport", 2),
    ("IRCTC", MatchType::Contains, "Travel", 3),
    ("AIRLINE", MatchType::Contains, "Travel", 3),
    ("ELECTRICITY", MatchType::Contains, "Utilities", 4),
    ("BROADBAND", MatchType::Contains, "Utilities", 4),
    ("RECHARGE", MatchType::Contains, "Utilities", 3),
    ("AMAZON", MatchType::Contains, "Shopping", 2),
    ("FLIPKART", MatchType::Contains, "Shopping", 2),
    ("MYNTRA", MatchType::Contains, "Shopping", 2),
    ("NETFLIX", MatchType::Contains, "Entertainment", 3),
    ("SPOTIFY", MatchType::Contains, "Entertainment", 3),
    ("HOSPITAL", MatchType::Contains, "Health", 3),
    ("PHARMA", MatchType::Contains, "Health", 3),
    (r"\bATM\b", MatchType::Regex, "Cash Withdrawal", 4),
    ("CASH", MatchType::Contains, "Cash Withdrawal", 2),
    ("CHARGES", MatchType::Contains, "Bank Charges", 3),
    ("NEFT", MatchType::Contains, "Transfers", 0),
    ("IMPS", MatchType::Contains, "Transfers", 0),
    ("RTGS", MatchType::Contains, "Transfers", 0),
    ("UPI", MatchType::Contains, "Transfers", -1),
];

pub fn default_rules() -> Vec<Rule> {
    DEFAULT_RULES
        .iter()
        .map(|(pattern, match_type, category, priority)| Rule {
            pattern: pattern.to_string(),
            match_type: *match_type,
            category: category.to_string(),
            priority: *priority,
        })
        .collect()
}

pub fn load_rules(path: &Path) -> Result<Vec<Rule>, CategorizationError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CategorizationError(format!("cannot read rules {}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| CategorizationError(format!("invalid rules {}: {e}", path.display())))
}

enum Matcher {
    Contains(String),
    StartsWith(String),
    Regex(Regex),
}

impl Matcher {
    fn is_match(&self, description: &str) -> bool {
        match self {
            Self::Contains(pat) => description.to_uppercase().contains(pat),
            Self::StartsWith(pat) => description.to_uppercase().starts_with(pat),
            Self::Regex(re) => re.is_match(description),
        }
    }
}

/// Keyword rules matched against the Particulars column. Highest priority
/// wins; equal priorities keep declaration order.
pub struct RuleCategorizer {
    rules: Vec<(Matcher, String)>,
}

impl RuleCategorizer {
    pub fn new(mut rules: Vec<Rule>) -> Result<Self, CategorizationError> {
        // stable sort keeps file order among equal priorities
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        let compiled = rules
            .into_iter()
            .map(|rule| {
                let matcher = match rule.match_type {
                    MatchType::Contains => Matcher::Contains(rule.pattern.to_uppercase()),
                    MatchType::StartsWith => Matcher::StartsWith(rule.pattern.to_uppercase()),
                    MatchType::Regex => Matcher::Regex(
                        Regex::new(&format!("(?i){}", rule.pattern))
                            .map_err(|e| CategorizationError(format!("bad regex '{}': {e}", rule.pattern)))?,
                    ),
                };
                Ok((matcher, rule.category))
            })
            .collect::<Result<Vec<_>, CategorizationError>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn with_defaults() -> Result<Self, CategorizationError> {
        Self::new(default_rules())
    }

    /// Rules from `path` when given, otherwise the built-in set.
    pub fn from_rules_file(path: Option<&Path>) -> Result<Self, CategorizationError> {
        match path {
            Some(p) => Self::new(load_rules(p)?),
            None => Self::with_defaults(),
        }
    }

    pub fn label(&self, description: &str) -> &str {
        self.rules
            .iter()
            .find(|(m, _)| m.is_match(description))
            .map(|(_, category)| category.as_str())
            .unwrap_or(UNMATCHED_CATEGORY)
    }
}

impl Categorizer for RuleCategorizer {
    fn categorize(&self, table: &ConsolidatedTable) -> Result<ConsolidatedTable, CategorizationError> {
        let idx = table
            .find_column(ColumnRole::Particulars)
            .ok_or_else(|| CategorizationError("no description column to categorize on".to_string()))?;
        let labels: Vec<String> = table
            .column_values(idx)
            .map(|v| self.label(&v.render()).to_string())
            .collect();
        let unmatched = labels.iter().filter(|l| *l == UNMATCHED_CATEGORY).count();
        info!(rows = labels.len(), unmatched, "categorized transactions");
        debug!(rules = self.rules.len(), "rule set size");
        Ok(table.with_text_column(CATEGORY_COLUMN, labels))
    }
}
