//! Execution planner - composes vhosts and turns their files into resources

use nginxkit::{ComposedVhost, Composer, ConfigError, ConfigWarning, VhostSpec};

use crate::config::Manifest;
use crate::resource::{Fragment, NginxService};
use declarative::ExecutionPlan;

/// A vhost whose compose step failed; it contributes nothing to the plan
#[derive(Debug)]
pub struct VhostFailure {
    pub name: String,
    pub error: ConfigError,
}

/// Result of composing every selected vhost
#[derive(Debug, Default)]
pub struct Composition {
    pub vhosts: Vec<ComposedVhost>,
    pub failures: Vec<VhostFailure>,
}

impl Composition {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Warnings from every composed vhost, in manifest order
    pub fn warnings(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.vhosts.iter().flat_map(|v| v.warnings.iter())
    }

    /// One fragment resource per target file, vhosts in manifest order and
    /// files in stage order
    pub fn fragments(&self) -> Vec<Fragment> {
        self.vhosts
            .iter()
            .flat_map(|v| {
                v.files
                    .iter()
                    .map(move |f| Fragment::new(&v.plan.vhost, f.clone()))
            })
            .collect()
    }

    /// Build the ordered execution plan, reloading via `service` on change
    pub fn into_plan(self, service: NginxService) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        plan.extend(
            self.fragments()
                .into_iter()
                .map(|f| Box::new(f) as declarative::BoxedResource),
        );
        plan.add_post_action(Box::new(service));
        plan
    }
}

/// Composer configured from the manifest's nginx and notify sections
pub fn composer_for(manifest: &Manifest) -> Composer {
    Composer::new(manifest.nginx.clone()).with_notify_policy(manifest.notify)
}

/// Reload service configured from the manifest
pub fn service_for(manifest: &Manifest) -> anyhow::Result<NginxService> {
    let (program, args) = manifest.service.argv()?;
    Ok(NginxService::new(&program, &args))
}

/// Compose vhosts one at a time; a failure is recorded and the rest continue
pub fn compose_all(composer: &Composer, vhosts: &[&VhostSpec]) -> Composition {
    let mut composition = Composition::default();
    for spec in vhosts {
        match composer.compose(spec) {
            Ok(composed) => composition.vhosts.push(composed),
            Err(error) => {
                log::error!("{}", error);
                composition.failures.push(VhostFailure {
                    name: spec.name.clone(),
                    error,
                });
            }
        }
    }
    composition
}
