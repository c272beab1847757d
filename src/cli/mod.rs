pub mod advise;
pub mod config;
pub mod digest;
pub mod document;
pub mod export;
pub mod process;
pub mod status;
pub mod summary;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::models::AdviceTopic;

#[derive(Parser)]
#[command(name = "tally", about = "Consolidate bank statements, summarize spending and get financial advice.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command that reads a statement.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Statement source: a workbook (.xlsx/.xls/.ods) or a directory of per-page CSV files
    pub source: String,
    /// Prompt for the document's decryption key
    #[arg(long = "ask-key")]
    pub ask_key: bool,
    /// Ignore and do not write the processed-table cache
    #[arg(long = "no-cache")]
    pub no_cache: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Consolidate and categorize a statement, then show its transactions.
    Process {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show totals per category.
    Summary {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Show the bounded text digest sent to the advice service.
    Digest {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Get financial advice for a statement.
    Advise {
        #[command(flatten)]
        source: SourceArgs,
        /// Focus topic, e.g. "Saving Strategies" or expense-reduction
        #[arg(long, value_parser = parse_topic)]
        topic: Option<AdviceTopic>,
    },
    /// Export the (optionally filtered) transactions.
    Export {
        #[command(flatten)]
        source: SourceArgs,
        /// Output format
        #[arg(long, value_enum, default_value = "csv")]
        format: ExportFormat,
        /// Output file path
        #[arg(long)]
        output: String,
        /// Keep only rows containing this text (case-insensitive)
        #[arg(long)]
        search: Option<String>,
    },
    /// Check the advice service connection.
    Status,
    /// Show or change settings.
    Config {
        /// API key for the advice service
        #[arg(long = "api-key")]
        api_key: Option<String>,
        /// Model name for the advice service
        #[arg(long)]
        model: Option<String>,
        /// Path to a categorization rules JSON file
        #[arg(long = "rules-file")]
        rules_file: Option<String>,
        /// Disable the processed-table cache
        #[arg(long = "no-cache", conflicts_with = "cache")]
        no_cache: bool,
        /// Enable the processed-table cache
        #[arg(long)]
        cache: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

fn parse_topic(s: &str) -> std::result::Result<AdviceTopic, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_advise_with_topic() {
        let cli = Cli::try_parse_from(["tally", "advise", "stmt.xlsx", "--topic", "debt-management", "--no-cache"]).unwrap();
        match cli.command {
            Commands::Advise { source, topic } => {
                assert_eq!(source.source, "stmt.xlsx");
                assert!(source.no_cache);
                assert!(!source.ask_key);
                assert_eq!(topic, Some(AdviceTopic::DebtManagement));
            }
            _ => panic!("expected advise"),
        }
    }

    #[test]
    fn test_unknown_topic_rejected() {
        assert!(Cli::try_parse_from(["tally", "advise", "stmt.xlsx", "--topic", "lottery"]).is_err());
    }

    #[test]
    fn test_config_cache_flags_conflict() {
        assert!(Cli::try_parse_from(["tally", "config", "--cache", "--no-cache"]).is_err());
    }
}
