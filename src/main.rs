mod advisor;
mod cache;
mod categorizer;
mod cli;
mod consolidator;
mod error;
mod export;
mod extractor;
mod fmt;
mod genai;
mod models;
mod pipeline;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::config::ConfigUpdate;
use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process { source } => cli::process::run(&source),
        Commands::Summary { source } => cli::summary::run(&source),
        Commands::Digest { source } => cli::digest::run(&source),
        Commands::Advise { source, topic } => cli::advise::run(&source, topic),
        Commands::Export {
            source,
            format,
            output,
            search,
        } => cli::export::run(&source, format, &output, search.as_deref()),
        Commands::Status => cli::status::run(),
        Commands::Config {
            api_key,
            model,
            rules_file,
            no_cache,
            cache,
        } => cli::config::run(ConfigUpdate {
            api_key,
            model,
            rules_file,
            use_cache: match (cache, no_cache) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
