//! `vhostctl render` - print what a vhost's fragments will contain

use anyhow::Result;
use colored::Colorize;
use nginxkit::{FragmentBody, FragmentKind};

use crate::Context;
use crate::engine::composer_for;
use crate::ui;

use super::{load_manifest, report_warnings};

pub fn run(ctx: &Context, vhost: &str, kind: Option<FragmentKind>) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let composer = composer_for(&manifest);
    let selected = manifest.select(Some(vhost))?;

    for spec in selected {
        let composed = composer.compose(spec)?;
        report_warnings(ctx, &composed.warnings);

        for descriptor in &composed.plan.descriptors {
            if kind.is_some_and(|k| k != descriptor.kind) {
                continue;
            }
            for target in &descriptor.targets {
                if !ctx.quiet {
                    println!("{}", format!("# {} ({})", target.display(), descriptor.kind).dimmed());
                }
                match &descriptor.body {
                    // never echo key material
                    FragmentBody::Copy { source } => {
                        ui::kv("copied from", &source.display().to_string());
                    }
                    _ => {
                        let file = composed.files.iter().find(|f| &f.path == target);
                        match file.and_then(|f| f.content.as_deref()) {
                            Some(bytes) => print!("{}", String::from_utf8_lossy(bytes)),
                            None => ui::dim("(absent)"),
                        }
                    }
                }
            }
        }
    }
    Ok(())
}
