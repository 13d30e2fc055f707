//! The location sub-resource.
//!
//! Every vhost owns exactly one implicit location, `"<vhost>-default"`,
//! serving `/`. It inherits ensure, SSL flags and the content source from its
//! vhost and renders into the plain server block (stage 500), the SSL server
//! block (stage 800), or both.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::plan::Stage;
use crate::render::{Directive, directives};
use crate::types::{Ensure, NginxParams};
use crate::validate::{ContentKind, ValidatedSpec};

/// How the location serves requests, with defaults resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentSource {
    Proxy {
        target: String,
        read_timeout: String,
        cache: Option<String>,
        cache_valid: Option<String>,
    },
    Fastcgi {
        target: String,
        params: PathBuf,
        script: Option<String>,
        root: Option<PathBuf>,
    },
    Directory {
        root: PathBuf,
    },
}

/// A location block owned by a vhost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationSpec {
    /// Resource name, `"<vhost>-default"` for the implicit location
    pub name: String,
    pub vhost: String,
    pub ensure: Ensure,
    pub ssl: bool,
    pub ssl_only: bool,
    /// URL path, `/` for the default location
    pub location: String,
    /// `None` only when the owning vhost is absent and declared no source
    pub content: Option<ContentSource>,
    pub try_files: Vec<String>,
    pub index_files: Vec<String>,
    pub cfg_prepend: BTreeMap<String, String>,
    pub cfg_append: BTreeMap<String, String>,
}

impl LocationSpec {
    /// Build the implicit root location of a validated vhost.
    pub fn default_for(vhost: &ValidatedSpec, params: &NginxParams) -> Self {
        let spec = &vhost.spec;
        let content = vhost.content.and_then(|kind| match kind {
            ContentKind::Proxy => spec.proxy.clone().map(|target| ContentSource::Proxy {
                target,
                read_timeout: spec
                    .proxy_read_timeout
                    .clone()
                    .unwrap_or_else(|| params.proxy_read_timeout.clone()),
                cache: spec.proxy_cache.clone(),
                cache_valid: spec.proxy_cache_valid.clone(),
            }),
            ContentKind::Fastcgi => spec.fastcgi.clone().map(|target| ContentSource::Fastcgi {
                target,
                params: spec
                    .fastcgi_params
                    .clone()
                    .unwrap_or_else(|| params.fastcgi_params()),
                script: spec.fastcgi_script.clone(),
                root: spec.www_root.clone(),
            }),
            ContentKind::Directory => spec
                .www_root
                .clone()
                .map(|root| ContentSource::Directory { root }),
        });

        Self {
            name: format!("{}-default", spec.name),
            vhost: spec.name.clone(),
            ensure: spec.ensure,
            ssl: spec.ssl,
            ssl_only: vhost.ssl_only,
            location: "/".to_string(),
            content,
            try_files: spec.try_files.clone(),
            index_files: spec.index_files.clone(),
            cfg_prepend: BTreeMap::new(),
            cfg_append: BTreeMap::new(),
        }
    }

    /// Merge extra directives into the location after creation.
    ///
    /// Later values for an existing directive replace earlier ones.
    pub fn merge_cfg(&mut self, prepend: &BTreeMap<String, String>, append: &BTreeMap<String, String>) {
        self.cfg_prepend
            .extend(prepend.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.cfg_append
            .extend(append.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Fragment files this location renders into, in stage order.
    pub fn targets(&self, params: &NginxParams) -> Vec<PathBuf> {
        let dir = params.fragment_dir();
        let mut targets = Vec::with_capacity(2);
        if !self.ssl_only {
            targets.push(dir.join(Stage::LOCATION.file_name(&self.vhost, Some(&self.name))));
        }
        if self.ssl {
            targets.push(dir.join(Stage::SSL_LOCATION.file_name(&self.vhost, Some(&self.name))));
        }
        targets
    }

    pub(crate) fn context(&self) -> LocationContext<'_> {
        LocationContext {
            location: &self.location,
            content: self.content.as_ref(),
            try_files: &self.try_files,
            index_files: &self.index_files,
            cfg_prepend: directives(&self.cfg_prepend),
            cfg_append: directives(&self.cfg_append),
        }
    }
}

/// Template context for `location.conf`.
#[derive(Debug, Serialize)]
pub(crate) struct LocationContext<'a> {
    location: &'a str,
    content: Option<&'a ContentSource>,
    try_files: &'a [String],
    index_files: &'a [String],
    cfg_prepend: Vec<Directive>,
    cfg_append: Vec<Directive>,
}
