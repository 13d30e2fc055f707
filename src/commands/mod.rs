//! Command implementations

pub mod apply;
pub mod check;
pub mod plan;
pub mod render;

use anyhow::Result;
use nginxkit::ConfigWarning;

use crate::Context;
use crate::config::Manifest;
use crate::engine::planner::VhostFailure;
use crate::paths;
use crate::ui;

/// Load the manifest named by `--config`, or the default one
pub fn load_manifest(ctx: &Context) -> Result<Manifest> {
    let path = paths::manifest_path(ctx.config.as_deref())?;
    log::debug!("Using manifest {}", path.display());
    Ok(Manifest::load(&path)?)
}

/// Print warnings unless `--quiet`
pub fn report_warnings<'a>(ctx: &Context, warnings: impl IntoIterator<Item = &'a ConfigWarning>) {
    if ctx.quiet {
        return;
    }
    for warning in warnings {
        ui::warn(&warning.to_string());
    }
}

/// Print failed vhosts
pub fn report_failures(failures: &[VhostFailure]) {
    for failure in failures {
        ui::error(&format!("{}: {}", failure.name, failure.error));
    }
}
