use colored::Colorize;

use crate::advisor::Advisor;
use crate::cli::{document, SourceArgs};
use crate::error::Result;
use crate::models::{AdviceResult, AdviceSource, AdviceTopic};
use crate::reports::digest_for_advice;
use crate::settings::{load_settings, AdviceConfig};

const WRAP_WIDTH: usize = 88;

pub fn run(args: &SourceArgs, topic: Option<AdviceTopic>) -> Result<()> {
    let Some(data) = document::load(args)? else {
        return Ok(());
    };
    let advisor = Advisor::from_config(&AdviceConfig::resolve(&load_settings()));

    let result = match topic {
        Some(topic) => advisor.advise_on_topic(topic, &data),
        None => advisor.advise(&digest_for_advice(&data)),
    };
    print_advice(&result);
    Ok(())
}

fn print_advice(result: &AdviceResult) {
    let tag = match result.source {
        AdviceSource::Generated => "[generated]".green(),
        AdviceSource::Fallback => "[local analysis]".yellow(),
    };
    println!("{} {tag}\n", "Financial Advice".bold());
    println!("{}", textwrap::fill(result.text.trim_end(), WRAP_WIDTH));
}
