//! `vhostctl check` - validate and render every vhost without writing

use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::engine::{compose_all, composer_for};
use crate::ui;

use super::{load_manifest, report_failures, report_warnings};

pub fn run(ctx: &Context) -> Result<()> {
    let manifest = load_manifest(ctx)?;

    let composer = composer_for(&manifest);
    let vhosts = manifest.select(None)?;
    let composition = compose_all(&composer, &vhosts);

    if !ctx.quiet {
        ui::header("Vhosts");
        for composed in &composition.vhosts {
            println!(
                "  {} {:<30} {}",
                "✓".green(),
                composed.plan.vhost,
                format!("{} fragments", composed.files.len()).dimmed()
            );
        }
    }
    report_warnings(ctx, composition.warnings());
    report_failures(&composition.failures);

    if composition.has_failures() {
        bail!(
            "{} of {} vhosts failed validation",
            composition.failures.len(),
            vhosts.len()
        );
    }

    if !ctx.quiet {
        println!();
        ui::success(&format!("{} vhosts OK", composition.vhosts.len()));
    }
    Ok(())
}
