use std::path::PathBuf;

use colored::Colorize;
use tracing::warn;
use zeroize::Zeroize;

use crate::cache::cache_path;
use crate::categorizer::{Categorizer, RuleCategorizer};
use crate::cli::SourceArgs;
use crate::error::{CategorizationError, Result};
use crate::extractor::extractor_for;
use crate::models::ConsolidatedTable;
use crate::pipeline::Pipeline;
use crate::settings::{load_settings, shellexpand_path};

/// Stands in when the configured rules cannot be loaded, so the pipeline
/// still produces the uncategorized table.
struct Unavailable(CategorizationError);

impl Categorizer for Unavailable {
    fn categorize(&self, _table: &ConsolidatedTable) -> std::result::Result<ConsolidatedTable, CategorizationError> {
        Err(self.0.clone())
    }
}

fn build_categorizer(rules_file: Option<&str>) -> Box<dyn Categorizer> {
    let path = rules_file.map(|p| PathBuf::from(shellexpand_path(p)));
    match RuleCategorizer::from_rules_file(path.as_deref()) {
        Ok(c) => Box::new(c),
        Err(e) => {
            warn!(error = %e, "categorization rules unavailable");
            Box::new(Unavailable(e))
        }
    }
}

/// Runs the full pipeline for one source and prints any notices to stderr.
/// `None` when no page carried a table.
pub fn load(args: &SourceArgs) -> Result<Option<ConsolidatedTable>> {
    let settings = load_settings();
    let source = PathBuf::from(shellexpand_path(&args.source));
    let extractor = extractor_for(&source)?;
    let categorizer = build_categorizer(settings.rules_file.as_deref());
    let pipeline = Pipeline {
        extractor: extractor.as_ref(),
        categorizer: categorizer.as_ref(),
        use_cache: settings.use_cache && !args.no_cache,
    };

    let mut key = if args.ask_key { Some(rpassword::prompt_password("Decryption key: ")?) } else { None };
    let result = pipeline.process(&source, key.as_deref());
    if let Some(k) = key.as_mut() {
        k.zeroize();
    }
    let doc = result?;

    for notice in &doc.notices {
        eprintln!("{}", notice.yellow());
    }
    if doc.from_cache {
        eprintln!("{}", format!("Loaded from cache: {}", cache_path(&source).display()).dimmed());
    }
    if doc.table.is_none() {
        println!("No transactions found in {}", source.display());
    }
    Ok(doc.table)
}
