//! Archive command

use std::path::Path;

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Export the bundle release `tag` into `output`.
pub fn run_archive(ctx: &Context, tag: &str, output: &Path) -> Result<()> {
    let mut bundle = ctx.open_bundle()?;
    let written = bundle.archive(tag, output)?;
    println!(
        "{} Archive of {} written to {}",
        "OK".green().bold(),
        tag.cyan(),
        written.display()
    );
    Ok(())
}
