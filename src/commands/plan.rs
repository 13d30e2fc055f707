//! `vhostctl plan` - list the fragments each vhost would produce

use anyhow::{Result, bail};
use colored::Colorize;
use nginxkit::{Composer, Ensure, FragmentKind, VhostPlan, VhostSpec};
use serde::Serialize;
use std::path::PathBuf;

use crate::Context;
use crate::engine::composer_for;
use crate::ui;

use super::load_manifest;

/// Serializable view of one planned vhost
#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub vhost: String,
    pub ensure: Ensure,
    pub ssl_only: bool,
    pub warnings: Vec<String>,
    pub fragments: Vec<FragmentEntry>,
}

#[derive(Debug, Serialize)]
pub struct FragmentEntry {
    pub kind: FragmentKind,
    pub stage: Option<String>,
    pub targets: Vec<PathBuf>,
    pub ensure: Ensure,
    pub notify: bool,
}

impl PlanEntry {
    fn new(plan: &VhostPlan, warnings: Vec<String>) -> Self {
        Self {
            vhost: plan.vhost.clone(),
            ensure: plan.ensure,
            ssl_only: plan.ssl_only,
            warnings,
            fragments: plan
                .descriptors
                .iter()
                .map(|d| FragmentEntry {
                    kind: d.kind,
                    stage: d.stage.map(|s| s.to_string()),
                    targets: d.targets.clone(),
                    ensure: d.ensure,
                    notify: d.notify,
                })
                .collect(),
        }
    }
}

/// Validate and plan each vhost, collecting entries and error messages
pub fn plan_entries(composer: &Composer, vhosts: &[&VhostSpec]) -> (Vec<PlanEntry>, Vec<String>) {
    let mut entries = Vec::new();
    let mut errors = Vec::new();
    for spec in vhosts {
        match composer.validate(spec) {
            Ok(validated) => {
                let warnings = validated.warnings.iter().map(ToString::to_string).collect();
                entries.push(PlanEntry::new(&composer.plan(&validated), warnings));
            }
            Err(e) => errors.push(format!("{}: {}", spec.name, e)),
        }
    }
    (entries, errors)
}

pub fn run(ctx: &Context, target: Option<&str>, json: bool) -> Result<()> {
    let manifest = load_manifest(ctx)?;
    let composer = composer_for(&manifest);
    let vhosts = manifest.select(target)?;
    let (entries, errors) = plan_entries(&composer, &vhosts);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            print_entry(ctx, entry);
        }
    }

    for error in &errors {
        ui::error(error);
    }
    if !errors.is_empty() {
        bail!("{} vhosts could not be planned", errors.len());
    }
    Ok(())
}

fn print_entry(ctx: &Context, entry: &PlanEntry) {
    let mode = if entry.ssl_only { " (ssl only)" } else { "" };
    ui::header(&format!("{} [{}]{}", entry.vhost, entry.ensure, mode));

    for fragment in &entry.fragments {
        let stage = fragment.stage.as_deref().unwrap_or("---");
        let notify = if fragment.notify {
            " [reload]".cyan().to_string()
        } else {
            String::new()
        };
        for target in &fragment.targets {
            println!(
                "  {} {:<18} {}{}",
                stage.bold(),
                fragment.kind.to_string(),
                ui::truncate_path(&target.display().to_string(), 60).dimmed(),
                notify
            );
        }
    }

    if !ctx.quiet {
        for warning in &entry.warnings {
            ui::warn(warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nginxkit::{NginxParams, StaticHost};

    #[test]
    fn test_plan_entries_report_errors_per_vhost() {
        let composer = Composer::new(NginxParams::default()).with_host(StaticHost::dual_stack());
        let ok = VhostSpec {
            www_root: Some("/srv".into()),
            ssl: true,
            ssl_cert: Some("/tmp/server.crt".into()),
            ssl_key: Some("/tmp/server.pem".into()),
            ..VhostSpec::new("test2.local")
        };
        let broken = VhostSpec {
            ssl_key: None,
            ..ok.clone()
        };

        let (entries, errors) = plan_entries(&composer, &[&ok, &broken]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].fragments.len(), 7);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ssl_key"));
    }

    #[test]
    fn test_plan_json_shape() {
        let composer = Composer::new(NginxParams::default()).with_host(StaticHost::dual_stack());
        let spec = VhostSpec {
            proxy: Some("http://127.0.0.1:8080".into()),
            ..VhostSpec::new("api.local")
        };
        let (entries, _) = plan_entries(&composer, &[&spec]);
        let value = serde_json::to_value(&entries).unwrap();

        let fragments = &value[0]["fragments"];
        assert_eq!(fragments[0]["kind"], "header");
        assert_eq!(fragments[0]["stage"], "001");
        assert_eq!(fragments[1]["kind"], "default-location");
        assert_eq!(fragments[2]["notify"], false);
        assert_eq!(value[0]["ensure"], "present");
    }
}
