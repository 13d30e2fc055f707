//! `vhostctl diff` and `vhostctl apply`
//!
//! - `diff` - Preview what apply would change, with content diffs
//! - `apply` - Make the fragment files match the manifest

use anyhow::{Result, bail};
use declarative::{Resource, compute_diffs};

use crate::Context;
use crate::engine::differ::{display_diff, show_fragment_diff};
use crate::engine::{ExecuteOptions, compose_all, composer_for, execute, service_for};
use crate::ui;

use super::{load_manifest, report_failures, report_warnings};

pub fn diff(ctx: &Context, target: Option<&str>) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let composer = composer_for(&manifest);
    let vhosts = manifest.select(target)?;
    let composition = compose_all(&composer, &vhosts);
    report_warnings(ctx, composition.warnings());

    let fragments = composition.fragments();
    let resources: Vec<Box<dyn Resource>> = fragments
        .iter()
        .cloned()
        .map(|f| Box::new(f) as Box<dyn Resource>)
        .collect();
    let diffs = compute_diffs(&resources);
    display_diff(&diffs);

    // ssl material is compared by digest only
    for fragment in fragments.iter().filter(|f| f.file.kind.is_fragment()) {
        if diffs.iter().any(|d| d.resource_id == fragment.id()) {
            show_fragment_diff(fragment);
        }
    }

    report_failures(&composition.failures);
    if composition.has_failures() {
        bail!("{} vhosts failed to compose", composition.failures.len());
    }
    Ok(())
}

pub fn apply(ctx: &Context, target: Option<&str>, dry_run: bool, yes: bool) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let composer = composer_for(&manifest);
    let service = service_for(&manifest)?;
    let vhosts = manifest.select(target)?;

    let composition = compose_all(&composer, &vhosts);
    report_warnings(ctx, composition.warnings());
    report_failures(&composition.failures);
    let failures = composition.failures.len();

    if !ctx.quiet {
        ui::info(&format!(
            "Converging {} of {} vhosts",
            composition.vhosts.len(),
            vhosts.len()
        ));
    }

    let opts = ExecuteOptions {
        dry_run,
        yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    let summary = execute(composition.into_plan(service), &opts)?;

    if failures > 0 {
        bail!("{} vhosts failed to compose and were skipped", failures);
    }
    if !summary.is_success() {
        bail!("{} resources failed to apply", summary.failed);
    }
    Ok(())
}
