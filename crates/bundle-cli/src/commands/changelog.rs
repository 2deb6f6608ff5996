//! Bundle changelog command

use std::path::Path;

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Print or write the changelog between two bundle releases.
pub fn run_bundle_changelog(ctx: &Context, from: &str, to: &str, output: Option<&Path>) -> Result<()> {
    let mut bundle = ctx.open_bundle()?;
    let text = bundle.changelog(from, to)?.render();
    match output {
        Some(path) => {
            std::fs::write(path, &text)?;
            println!("{} Changelog written to {}", "OK".green().bold(), path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}
