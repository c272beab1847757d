use tracing::{info, warn};

use crate::error::AdviceServiceError;
use crate::fmt::amount;
use crate::genai::{decode_response, Decoded, GeminiClient, TextGenerator};
use crate::models::{AdviceResult, AdviceTopic, ColumnRole, ConsolidatedTable, PromptDigest, ServiceStatus};
use crate::reports::{category_summary, compute_category_summary};
use crate::settings::AdviceConfig;

pub const PROBE_PROMPT: &str = "Reply with the single word: OK";

const GENERIC_TIPS: [&str; 2] = [
    "Keep an emergency fund that covers three to six months of essential expenses.",
    "Review your statement every month and set a budget for your top spending categories.",
];

/// Wraps the generative-text service: builds prompts, normalizes replies and
/// falls back to local analysis whenever the service cannot answer.
pub struct Advisor {
    generator: Option<Box<dyn TextGenerator>>,
}

impl Advisor {
    pub fn new(generator: Option<Box<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// Without a credential every advice path uses the local fallback.
    pub fn from_config(config: &AdviceConfig) -> Self {
        let generator = GeminiClient::from_config(config).map(|c| Box::new(c) as Box<dyn TextGenerator>);
        Self::new(generator)
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub fn advise(&self, digest: &PromptDigest) -> AdviceResult {
        match self.request(&advice_prompt(&digest.text)) {
            Ok(text) => AdviceResult::generated(text),
            Err(e) => {
                warn!(error = %e, "advice service unavailable; using local analysis");
                AdviceResult::fallback(fallback_advice(digest))
            }
        }
    }

    pub fn advise_on_topic(&self, topic: AdviceTopic, table: &ConsolidatedTable) -> AdviceResult {
        let summary = category_summary(table);
        match self.request(&topic_prompt(topic, &summary)) {
            Ok(text) => AdviceResult::generated(text),
            Err(e) => {
                warn!(error = %e, topic = %topic, "advice service unavailable; using topic template");
                AdviceResult::fallback(topic_fallback(topic, table))
            }
        }
    }

    /// Status check for display only. Never fails.
    pub fn probe(&self) -> ServiceStatus {
        let Some(generator) = &self.generator else {
            return ServiceStatus::Unavailable;
        };
        let status = match generator.generate(PROBE_PROMPT) {
            Ok(payload) => match decode_response(&payload) {
                Decoded::Text(_) => ServiceStatus::Available,
                Decoded::Stringified(_) | Decoded::Unrecognized => ServiceStatus::Degraded,
            },
            Err(e) => {
                warn!(error = %e, "advice service probe failed");
                ServiceStatus::Unavailable
            }
        };
        info!(status = %status, "advice service probe");
        status
    }

    fn request(&self, prompt: &str) -> Result<String, AdviceServiceError> {
        let generator = self.generator.as_ref().ok_or(AdviceServiceError::MissingCredential)?;
        let payload = generator.generate(prompt)?;
        decode_response(&payload)
            .into_text()
            .ok_or_else(|| AdviceServiceError::Parse("empty response".to_string()))
    }
}

// ---------------------------------------------------------------------------
// Prompts
// ---------------------------------------------------------------------------

pub fn advice_prompt(digest_text: &str) -> String {
    let data = if digest_text.trim().is_empty() {
        "No transaction data was available for this statement."
    } else {
        digest_text
    };
    format!(
        "You are an experienced personal financial advisor. Study the bank statement \
summary below and give the account holder practical, specific advice.\n\n\
Answer with bullet points grouped under these sections:\n\
## Spending Overview\n\
## Areas of Concern\n\
## Recommendations\n\
## Savings Opportunities\n\n\
Statement summary:\n{data}\n"
    )
}

pub fn topic_prompt(topic: AdviceTopic, summary_text: &str) -> String {
    let data = if summary_text.trim().is_empty() {
        "No category summary was available for this statement."
    } else {
        summary_text
    };
    format!(
        "You are an experienced personal financial advisor. Using the spending summary \
below, give focused advice on {topic}.\n\n\
Answer with bullet points grouped under these sections:\n\
## Current Situation\n\
## {topic} Recommendations\n\
## Next Steps\n\n\
Spending summary:\n{data}\n"
    )
}

// ---------------------------------------------------------------------------
// Fallbacks
// ---------------------------------------------------------------------------

/// Deterministic analysis built only from the digest's local summary.
pub fn fallback_advice(digest: &PromptDigest) -> String {
    let mut out = digest.summary_text.trim_end().to_string();
    out.push_str("\n\nRecommendations:\n");
    match &digest.summary {
        Some(s) if s.has_amounts => {
            if s.net_flow < 0.0 {
                out.push_str(&format!(
                    "- You are overspending: expenses exceed income by {}.\n",
                    amount(-s.net_flow)
                ));
                if let Some(top) = s.expenses_desc().first() {
                    out.push_str(&format!(
                        "- Your highest expense category is {} ({}); look there first for cuts.\n",
                        top.name,
                        amount(top.expense)
                    ));
                }
            } else {
                out.push_str(&format!(
                    "- You have a surplus of {}. Move part of it into savings or investments.\n",
                    amount(s.net_flow)
                ));
            }
        }
        _ => out.push_str("- Amounts were not available, so cash-flow recommendations are limited.\n"),
    }
    for tip in GENERIC_TIPS {
        out.push_str(&format!("- {tip}\n"));
    }
    out
}

fn topic_template(topic: AdviceTopic) -> &'static [&'static str] {
    match topic {
        AdviceTopic::SavingStrategies => &[
            "Pay yourself first: move a fixed share of income to savings on payday.",
            "Automate transfers into a separate savings account.",
            "Build an emergency fund before taking on investment risk.",
            "Review recurring subscriptions and redirect unused ones to savings.",
        ],
        AdviceTopic::DebtManagement => &[
            "List every debt with its balance, interest rate and minimum payment.",
            "Pay minimums on all debts, then put extra money toward the highest-rate one.",
            "Avoid new borrowing while paying existing debt down.",
            "Ask lenders about consolidation or lower rates if payments are hard to meet.",
        ],
        AdviceTopic::InvestmentOptions => &[
            "Keep an emergency fund in place before investing.",
            "Diversify across asset classes rather than concentrating in one.",
            "Prefer low-cost index funds for long-term goals.",
            "Match each investment to a time horizon and risk level you are comfortable with.",
        ],
        AdviceTopic::BudgetPlanning => &[
            "Start from last month's actual spending by category.",
            "Split income across needs, wants and savings (for example 50/30/20).",
            "Set a limit for each category and check progress weekly.",
            "Adjust the budget monthly as income and priorities change.",
        ],
        AdviceTopic::ExpenseReduction => &[
            "Cancel subscriptions you have not used in the last month.",
            "Plan meals and groceries to cut food delivery and dining out.",
            "Compare providers for insurance, phone and internet plans.",
            "Wait 48 hours before any non-essential purchase.",
        ],
    }
}

/// Fixed per-topic advice. Expense Reduction is prefixed with the three
/// largest expense categories when the table carries them.
pub fn topic_fallback(topic: AdviceTopic, table: &ConsolidatedTable) -> String {
    let mut out = format!("{topic}\n\n");
    if topic == AdviceTopic::ExpenseReduction && table.find_column(ColumnRole::Withdrawal).is_some() {
        if let Some(summary) = compute_category_summary(table) {
            let top: Vec<_> = summary.expenses_desc().into_iter().take(3).collect();
            if !top.is_empty() {
                out.push_str("Your top expense categories:\n");
                for (i, c) in top.iter().enumerate() {
                    out.push_str(&format!("{}. {}: {}\n", i + 1, c.name, amount(c.expense)));
                }
                out.push('\n');
            }
        }
    }
    for line in topic_template(topic) {
        out.push_str(&format!("- {line}\n"));
    }
    out
}
