//! Fragment planning: which files a vhost needs, where, and from what.

use minijinja::Value;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::location::LocationSpec;
use crate::render::{TemplateId, VhostContext};
use crate::types::{Ensure, FileAttrs, NginxParams, NotifyPolicy};
use crate::validate::ValidatedSpec;

/// Concatenation key of a fragment; lower stages come first in the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Stage(u16);

impl Stage {
    pub const HEADER: Stage = Stage(1);
    pub const LOCATION: Stage = Stage(500);
    pub const FOOTER: Stage = Stage(699);
    pub const SSL_HEADER: Stage = Stage(700);
    pub const SSL_LOCATION: Stage = Stage(800);
    pub const SSL_FOOTER: Stage = Stage(999);

    /// Numeric key
    pub fn key(self) -> u16 {
        self.0
    }

    /// Stages from 700 up belong to the SSL server block
    pub fn is_ssl(self) -> bool {
        self.0 >= Self::SSL_HEADER.0
    }

    /// Fragment filename: `<vhost>-<stage>[-<label>][-ssl]`
    pub fn file_name(self, vhost: &str, label: Option<&str>) -> String {
        let mut name = format!("{}-{}", vhost, self);
        if let Some(label) = label {
            name.push('-');
            name.push_str(label);
        }
        if self.is_ssl() {
            name.push_str("-ssl");
        }
        name
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// What a descriptor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    Header,
    DefaultLocation,
    Footer,
    SslHeader,
    SslFooter,
    SslCert,
    SslKey,
}

impl FragmentKind {
    /// Every kind, in plan order
    pub const ALL: [FragmentKind; 7] = [
        Self::Header,
        Self::DefaultLocation,
        Self::Footer,
        Self::SslHeader,
        Self::SslFooter,
        Self::SslCert,
        Self::SslKey,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::DefaultLocation => "default-location",
            Self::Footer => "footer",
            Self::SslHeader => "ssl-header",
            Self::SslFooter => "ssl-footer",
            Self::SslCert => "ssl-cert-file",
            Self::SslKey => "ssl-key-file",
        }
    }

    /// Cert and key copies live in the conf dir, everything else is a fragment
    pub fn is_fragment(self) -> bool {
        !matches!(self, Self::SslCert | Self::SslKey)
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FragmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown fragment kind '{}'", s))
    }
}

/// Where a descriptor's bytes come from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FragmentBody {
    /// Expand a vhost-level template
    Template { template: TemplateId, context: Value },
    /// Delegate to the location sub-resource
    Location { location: LocationSpec },
    /// Copy a file verbatim
    Copy { source: PathBuf },
}

/// One planned file (or, for the default location, one planned block
/// written to each of its targets).
#[derive(Debug, Clone, Serialize)]
pub struct FragmentDescriptor {
    pub kind: FragmentKind,
    /// `None` for the cert/key copies, which are not concatenated
    pub stage: Option<Stage>,
    /// Never empty; all targets receive the same content
    pub targets: Vec<PathBuf>,
    pub ensure: Ensure,
    pub body: FragmentBody,
    /// Whether a change to this file reloads nginx
    pub notify: bool,
    pub attrs: FileAttrs,
}

impl FragmentDescriptor {
    /// First target path
    pub fn path(&self) -> Option<&Path> {
        self.targets.first().map(PathBuf::as_path)
    }
}

/// The ordered descriptor list for one vhost.
#[derive(Debug, Clone, Serialize)]
pub struct VhostPlan {
    pub vhost: String,
    pub ensure: Ensure,
    pub ssl_only: bool,
    pub descriptors: Vec<FragmentDescriptor>,
}

impl VhostPlan {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Kinds in plan order
    pub fn kinds(&self) -> Vec<FragmentKind> {
        self.descriptors.iter().map(|d| d.kind).collect()
    }

    /// Find the descriptor of a given kind
    pub fn get(&self, kind: FragmentKind) -> Option<&FragmentDescriptor> {
        self.descriptors.iter().find(|d| d.kind == kind)
    }

    pub fn contains(&self, kind: FragmentKind) -> bool {
        self.get(kind).is_some()
    }
}

/// Build the fixed-order descriptor list for a validated vhost.
///
/// Order: header, default location, footer, ssl header, ssl footer, cert,
/// key. The SSL entries are skipped when SSL is off.
///
/// The plain header and footer are skipped only for SSL-only vhosts, not on
/// every `listen_port == ssl_port`: a non-SSL vhost listening on 443 keeps
/// its header and footer, otherwise its location fragment would sit outside
/// any `server` block. See [`ValidatedSpec::has_plain_listener`].
pub fn plan(vhost: &ValidatedSpec, params: &NginxParams, notify: &NotifyPolicy) -> VhostPlan {
    let spec = &vhost.spec;
    let dir = params.fragment_dir();
    let context = Value::from_serialize(VhostContext::new(vhost, params));

    let templated = |kind: FragmentKind, stage: Stage, template: TemplateId| FragmentDescriptor {
        kind,
        stage: Some(stage),
        targets: vec![dir.join(stage.file_name(&spec.name, None))],
        ensure: spec.ensure,
        body: FragmentBody::Template {
            template,
            context: context.clone(),
        },
        notify: notify.for_kind(kind),
        attrs: params.file.clone(),
    };

    let mut descriptors = Vec::with_capacity(7);

    if vhost.has_plain_listener() {
        descriptors.push(templated(FragmentKind::Header, Stage::HEADER, TemplateId::Header));
    }

    let mut location = LocationSpec::default_for(vhost, params);
    location.merge_cfg(&spec.location_cfg_prepend, &spec.location_cfg_append);
    descriptors.push(FragmentDescriptor {
        kind: FragmentKind::DefaultLocation,
        stage: Some(if location.ssl_only {
            Stage::SSL_LOCATION
        } else {
            Stage::LOCATION
        }),
        targets: location.targets(params),
        ensure: location.ensure,
        body: FragmentBody::Location { location },
        notify: notify.for_kind(FragmentKind::DefaultLocation),
        attrs: params.file.clone(),
    });

    if vhost.has_plain_listener() {
        descriptors.push(templated(FragmentKind::Footer, Stage::FOOTER, TemplateId::Footer));
    }

    if spec.ssl {
        descriptors.push(templated(
            FragmentKind::SslHeader,
            Stage::SSL_HEADER,
            TemplateId::SslHeader,
        ));
        descriptors.push(templated(
            FragmentKind::SslFooter,
            Stage::SSL_FOOTER,
            TemplateId::SslFooter,
        ));

        let copies = [
            (FragmentKind::SslCert, spec.ssl_cert.as_ref(), "crt"),
            (FragmentKind::SslKey, spec.ssl_key.as_ref(), "key"),
        ];
        for (kind, source, ext) in copies {
            // validation guarantees both are set when ssl is on
            let Some(source) = source else { continue };
            descriptors.push(FragmentDescriptor {
                kind,
                stage: None,
                targets: vec![
                    params
                        .conf_dir
                        .join(format!("{}.{}", spec.sanitized_name(), ext)),
                ],
                ensure: spec.ensure,
                body: FragmentBody::Copy {
                    source: source.clone(),
                },
                notify: notify.for_kind(kind),
                attrs: params.file.clone(),
            });
        }
    }

    log::debug!(
        "planned {} descriptors for vhost '{}' (ssl_only={})",
        descriptors.len(),
        spec.name,
        vhost.ssl_only
    );

    VhostPlan {
        vhost: spec.name.clone(),
        ensure: spec.ensure,
        ssl_only: vhost.ssl_only,
        descriptors,
    }
}
