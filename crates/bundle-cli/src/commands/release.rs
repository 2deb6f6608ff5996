//! Release commands

use std::path::PathBuf;

use bundle_core::{ReleaseMode, Released, release_multiple};
use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Release a single repository of the bundle.
pub fn run_release_clone(ctx: &Context, target: &str) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    bundle.make_clones()?;
    match bundle.release_clone(target, &ctx.release_options())? {
        Some(tag) => println!("{} {} released as {}", "OK".green().bold(), target.cyan(), tag.cyan()),
        None => println!("{} {} is not managed by bundler", "=>".blue().bold(), target.cyan()),
    }
    Ok(())
}

/// Release the whole bundle under `name`.
pub fn run_release_bundle(ctx: &Context, name: &str) -> Result<()> {
    let mut bundle = ctx.open_bundle()?;
    bundle.make_clones()?;
    let released = bundle.release(name, &ctx.release_options(), ReleaseMode::default())?;
    print_released(&released);
    println!("{} Bundle released as {}", "OK".green().bold(), name.cyan());
    Ok(())
}

/// Release several bundles together under `name`.
pub fn run_release_multiple(ctx: &Context, name: &str, bundles: &[PathBuf]) -> Result<()> {
    let outcome = release_multiple(
        bundles,
        name,
        &ctx.provider,
        &ctx.config,
        &ctx.release_options(),
    )?;
    for (dir, released) in &outcome {
        println!("{}", dir.display().to_string().bold());
        print_released(released);
    }
    println!(
        "{} {} bundle(s) released as {}",
        "OK".green().bold(),
        outcome.len(),
        name.cyan()
    );
    Ok(())
}

fn print_released(released: &Released) {
    for (target, tag) in released {
        println!("  {} {} {}", "+".green(), target, tag.cyan());
    }
}
