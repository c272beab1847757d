use colored::Colorize;

use crate::cli::{document, SourceArgs};
use crate::error::Result;
use crate::reports::{digest_for_advice, DIGEST_MAX_CHARS};

pub fn run(args: &SourceArgs) -> Result<()> {
    let Some(data) = document::load(args)? else {
        return Ok(());
    };
    let digest = digest_for_advice(&data);
    println!("{}", digest.text);
    if digest.truncated {
        eprintln!("{}", format!("Digest truncated to {DIGEST_MAX_CHARS} characters.").yellow());
    }
    Ok(())
}
