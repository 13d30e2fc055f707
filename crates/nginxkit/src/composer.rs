//! The composer: validate, plan and render in one place.

use crate::error::{ConfigWarning, Result};
use crate::host::{HostFacts, SystemHost};
use crate::plan::{FragmentDescriptor, VhostPlan, plan};
use crate::render::{FragmentFile, Renderer};
use crate::types::{NginxParams, NotifyPolicy, VhostSpec};
use crate::validate::{ValidatedSpec, validate};

/// Everything needed to converge one vhost.
#[derive(Debug, Clone)]
pub struct ComposedVhost {
    pub plan: VhostPlan,
    /// One entry per target path, in plan order
    pub files: Vec<FragmentFile>,
    pub warnings: Vec<ConfigWarning>,
}

impl ComposedVhost {
    /// Files that carry content (ensure present)
    pub fn present_files(&self) -> impl Iterator<Item = &FragmentFile> {
        self.files.iter().filter(|f| f.content.is_some())
    }
}

/// Composes vhost fragments against fixed nginx params.
pub struct Composer {
    params: NginxParams,
    notify: NotifyPolicy,
    host: Box<dyn HostFacts>,
    renderer: Renderer,
}

impl Composer {
    /// Composer probing the running system for host facts
    pub fn new(params: NginxParams) -> Self {
        Self {
            params,
            notify: NotifyPolicy::default(),
            host: Box::new(SystemHost),
            renderer: Renderer::new(),
        }
    }

    pub fn with_notify_policy(mut self, notify: NotifyPolicy) -> Self {
        self.notify = notify;
        self
    }

    /// Replace the host probe, e.g. with a [`StaticHost`](crate::StaticHost)
    pub fn with_host(mut self, host: impl HostFacts + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn params(&self) -> &NginxParams {
        &self.params
    }

    pub fn notify_policy(&self) -> &NotifyPolicy {
        &self.notify
    }

    pub fn validate(&self, spec: &VhostSpec) -> Result<ValidatedSpec> {
        validate(spec, self.host.as_ref())
    }

    pub fn plan(&self, vhost: &ValidatedSpec) -> VhostPlan {
        plan(vhost, &self.params, &self.notify)
    }

    pub fn render(&self, descriptor: &FragmentDescriptor) -> Result<Vec<u8>> {
        self.renderer.render(descriptor)
    }

    /// Validate, plan and render a vhost.
    ///
    /// Every descriptor is rendered before anything is returned, so a
    /// failure leaves the caller with nothing half-built to write.
    pub fn compose(&self, spec: &VhostSpec) -> Result<ComposedVhost> {
        let validated = self.validate(spec)?;
        let plan = self.plan(&validated);

        let mut files = Vec::with_capacity(plan.len() + 1);
        for descriptor in &plan.descriptors {
            let content = self.render(descriptor)?;
            files.extend(FragmentFile::from_descriptor(descriptor, content));
        }

        log::debug!(
            "composed vhost '{}': {} descriptors, {} files",
            plan.vhost,
            plan.len(),
            files.len()
        );

        Ok(ComposedVhost {
            plan,
            files,
            warnings: validated.warnings,
        })
    }
}
