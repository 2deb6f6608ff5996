//! Clone management commands

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Clone every missing repository of the bundle.
pub fn run_make_clones(ctx: &Context) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    let created = bundle.make_clones()?;
    println!(
        "{} {} clone(s) or link(s) created",
        "=>".blue().bold(),
        created.to_string().cyan()
    );
    Ok(())
}

/// Update every clone to its declared tag or branch.
pub fn run_update_clones(ctx: &Context) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    bundle.make_clones()?;
    bundle.update_clones()?;
    println!("{} Clones updated", "OK".green().bold());
    Ok(())
}

/// Rewrite remote URLs of every clone.
pub fn run_refresh_urls(ctx: &Context) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    let changed = bundle.refresh_urls()?;
    println!(
        "{} {} clone(s) with new remote URLs",
        "=>".blue().bold(),
        changed.to_string().cyan()
    );
    Ok(())
}

/// Print the local path of every clone.
pub fn run_clones_list(ctx: &Context, json: bool) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    let paths = bundle.clones_list();
    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
    } else {
        for path in paths {
            println!("{path}");
        }
    }
    Ok(())
}

/// Report changesets not pushed yet.
pub fn run_clones_out(ctx: &Context, json: bool) -> Result<()> {
    let bundle = ctx.open_bundle()?;
    let outgoing = bundle.clones_out()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outgoing)?);
        return Ok(());
    }
    if outgoing.is_empty() {
        println!("{} Nothing to push", "OK".green().bold());
        return Ok(());
    }
    for out in &outgoing {
        println!(
            "{} {} ({} changeset(s))",
            "!".yellow().bold(),
            out.path.cyan(),
            out.changesets
        );
    }
    Ok(())
}
