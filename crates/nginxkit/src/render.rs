//! Template expansion and fragment rendering.
//!
//! Rendering is a pure function of the descriptor: templates are embedded
//! at compile time, contexts are built from sorted collections, and nothing
//! time- or host-dependent reaches the output.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::plan::{FragmentBody, FragmentDescriptor, FragmentKind};
use crate::types::{Ensure, FileAttrs, NginxParams};
use crate::validate::ValidatedSpec;

/// Embedded templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateId {
    Header,
    Footer,
    SslHeader,
    SslFooter,
    Location,
}

impl TemplateId {
    pub fn name(self) -> &'static str {
        match self {
            Self::Header => "vhost_header.conf",
            Self::Footer => "vhost_footer.conf",
            Self::SslHeader => "vhost_ssl_header.conf",
            Self::SslFooter => "vhost_ssl_footer.conf",
            Self::Location => "location.conf",
        }
    }

    fn source(self) -> &'static str {
        match self {
            Self::Header => include_str!("templates/vhost_header.conf"),
            Self::Footer => include_str!("templates/vhost_footer.conf"),
            Self::SslHeader => include_str!("templates/vhost_ssl_header.conf"),
            Self::SslFooter => include_str!("templates/vhost_ssl_footer.conf"),
            Self::Location => include_str!("templates/location.conf"),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `key value;` directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub key: String,
    pub value: String,
}

/// Flatten a directive map into key order.
pub fn directives(map: &BTreeMap<String, String>) -> Vec<Directive> {
    map.iter()
        .map(|(key, value)| Directive {
            key: key.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Context shared by the vhost-level templates.
#[derive(Debug, Serialize)]
pub(crate) struct VhostContext<'a> {
    name: &'a str,
    /// Sanitized name used for log and certificate files
    file_name: String,
    log_name: String,
    listen_ip: &'a str,
    listen_port: u16,
    listen_options: Option<&'a str>,
    ipv6_enable: bool,
    ipv6_listen_ip: &'a str,
    ipv6_listen_port: u16,
    ipv6_listen_options: Option<&'a str>,
    ssl_port: u16,
    server_name: Vec<String>,
    www_redirects: Vec<String>,
    auth_basic: Option<&'a str>,
    auth_basic_user_file: Option<&'a Path>,
    log_dir: &'a Path,
    conf_dir: &'a Path,
    include_files: &'a [PathBuf],
    vhost_cfg_append: Vec<Directive>,
}

impl<'a> VhostContext<'a> {
    pub(crate) fn new(vhost: &'a ValidatedSpec, params: &'a NginxParams) -> Self {
        let spec = &vhost.spec;
        let (server_name, www_redirects) = if spec.rewrite_www_to_non_www {
            let bare = strip_www(&spec.server_name);
            (bare.clone(), bare)
        } else {
            (spec.server_name.clone(), Vec::new())
        };

        Self {
            name: &spec.name,
            file_name: spec.sanitized_name(),
            log_name: spec.sanitized_name(),
            listen_ip: &spec.listen_ip,
            listen_port: spec.listen_port,
            listen_options: spec.listen_options.as_deref(),
            ipv6_enable: spec.ipv6_enable,
            ipv6_listen_ip: &spec.ipv6_listen_ip,
            ipv6_listen_port: spec.ipv6_listen_port,
            ipv6_listen_options: spec.ipv6_listen_options.as_deref(),
            ssl_port: spec.ssl_port,
            server_name,
            www_redirects,
            auth_basic: spec.auth_basic.as_deref(),
            auth_basic_user_file: spec.auth_basic_user_file.as_deref(),
            log_dir: &params.log_dir,
            conf_dir: &params.conf_dir,
            include_files: &spec.include_files,
            vhost_cfg_append: directives(&spec.vhost_cfg_append),
        }
    }
}

/// Drop a leading `www.` from each name, keeping first-seen order.
fn strip_www(names: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let bare = name.strip_prefix("www.").unwrap_or(name);
        if !out.iter().any(|n| n == bare) {
            out.push(bare.to_string());
        }
    }
    out
}

/// Expands descriptors into bytes.
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        Self { env }
    }

    /// Expand one template with a serializable context.
    ///
    /// `path` names the fragment being rendered, for error reporting.
    pub fn render_template<S: Serialize>(
        &self,
        template: TemplateId,
        context: S,
        path: &Path,
    ) -> Result<String> {
        let wrap = |source| ConfigError::Template {
            template,
            path: path.to_path_buf(),
            source,
        };
        self.env
            .template_from_named_str(template.name(), template.source())
            .map_err(wrap)?
            .render(context)
            .map_err(wrap)
    }

    /// Produce the bytes a descriptor writes to each of its targets.
    ///
    /// Absent descriptors render to nothing; copies read their source
    /// verbatim.
    pub fn render(&self, descriptor: &FragmentDescriptor) -> Result<Vec<u8>> {
        if !descriptor.ensure.is_present() {
            return Ok(Vec::new());
        }

        let path = descriptor.path().unwrap_or_else(|| Path::new(""));
        match &descriptor.body {
            FragmentBody::Template { template, context } => self
                .render_template(*template, context, path)
                .map(String::into_bytes),
            FragmentBody::Location { location } => self
                .render_template(TemplateId::Location, location.context(), path)
                .map(String::into_bytes),
            FragmentBody::Copy { source } => {
                std::fs::read(source).map_err(|e| ConfigError::FragmentWrite {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

/// A rendered file ready to be converged onto disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentFile {
    pub kind: FragmentKind,
    pub path: PathBuf,
    pub ensure: Ensure,
    /// `None` when the file should be absent
    pub content: Option<Vec<u8>>,
    pub notify: bool,
    pub attrs: FileAttrs,
}

impl FragmentFile {
    /// Expand a descriptor's rendered bytes onto each of its targets.
    pub fn from_descriptor(descriptor: &FragmentDescriptor, content: Vec<u8>) -> Vec<Self> {
        let content = descriptor.ensure.is_present().then_some(content);
        descriptor
            .targets
            .iter()
            .map(|path| Self {
                kind: descriptor.kind,
                path: path.clone(),
                ensure: descriptor.ensure,
                content: content.clone(),
                notify: descriptor.notify,
                attrs: descriptor.attrs.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticHost;
    use crate::plan::plan;
    use crate::types::{NotifyPolicy, VhostSpec};
    use crate::validate::validate;
    use std::io::Write;

    fn rendered(spec: &VhostSpec, kind: FragmentKind) -> String {
        let validated = validate(spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let descriptor = plan.get(kind).unwrap();
        String::from_utf8(Renderer::new().render(descriptor).unwrap()).unwrap()
    }

    fn site() -> VhostSpec {
        VhostSpec {
            www_root: Some("/var/www/site".into()),
            ..VhostSpec::new("site.local")
        }
    }

    #[test]
    fn header_renders_listener_and_names() {
        let out = rendered(&site(), FragmentKind::Header);
        assert!(out.starts_with("server {\n"));
        assert!(out.contains("  listen                *:80;\n"));
        assert!(out.contains("  server_name           site.local;\n"));
        assert!(out.contains("access_log            /var/log/nginx/site.local.access.log;"));
        assert!(!out.contains("ipv6only"));
        assert!(!out.contains("auth_basic"));
    }

    #[test]
    fn header_renders_ipv6_and_auth() {
        let spec = VhostSpec {
            ipv6_enable: true,
            listen_options: Some("default_server".into()),
            auth_basic: Some("Restricted".into()),
            auth_basic_user_file: Some("/etc/nginx/htpasswd".into()),
            ..site()
        };
        let out = rendered(&spec, FragmentKind::Header);
        assert!(out.contains("listen                *:80 default_server;\n"));
        assert!(out.contains("listen                [::]:80 default ipv6only=on;\n"));
        assert!(out.contains("auth_basic            \"Restricted\";\n"));
        assert!(out.contains("auth_basic_user_file  /etc/nginx/htpasswd;\n"));
    }

    #[test]
    fn footer_closes_block_with_appended_directives() {
        let spec = VhostSpec {
            vhost_cfg_append: BTreeMap::from([
                ("client_max_body_size".to_string(), "10m".to_string()),
                ("charset".to_string(), "utf-8".to_string()),
            ]),
            include_files: vec!["/etc/nginx/extra.conf".into()],
            ..site()
        };
        let out = rendered(&spec, FragmentKind::Footer);
        assert_eq!(
            out,
            "  include               /etc/nginx/extra.conf;\n  charset utf-8;\n  client_max_body_size 10m;\n}\n"
        );
    }

    #[test]
    fn www_rewrite_strips_names_and_adds_redirects() {
        let spec = VhostSpec {
            server_name: vec!["www.example.com".into(), "example.com".into()],
            rewrite_www_to_non_www: true,
            ..site()
        };
        let header = rendered(&spec, FragmentKind::Header);
        assert!(header.contains("server_name           example.com;\n"));

        let footer = rendered(&spec, FragmentKind::Footer);
        assert!(footer.contains("server_name           www.example.com;\n"));
        assert!(footer.contains("return                301 http://example.com$request_uri;\n"));
        assert_eq!(footer.matches("server {").count(), 1);
    }

    #[test]
    fn ssl_header_points_at_sanitized_copies() {
        let spec = VhostSpec {
            name: "my site".into(),
            ssl: true,
            ssl_cert: Some("/tmp/server.crt".into()),
            ssl_key: Some("/tmp/server.pem".into()),
            ..site()
        };
        let out = rendered(&spec, FragmentKind::SslHeader);
        assert!(out.contains("listen                *:443 ssl;\n"));
        assert!(out.contains("ssl_certificate       /etc/nginx/my_site.crt;\n"));
        assert!(out.contains("ssl_certificate_key   /etc/nginx/my_site.key;\n"));
        assert!(out.contains("server_name           my site;\n"));
    }

    #[test]
    fn directory_location() {
        let spec = VhostSpec {
            try_files: vec!["$uri".into(), "$uri/".into(), "=404".into()],
            location_cfg_prepend: BTreeMap::from([("expires".to_string(), "1h".to_string())]),
            location_cfg_append: BTreeMap::from([("gzip".to_string(), "on".to_string())]),
            ..site()
        };
        let out = rendered(&spec, FragmentKind::DefaultLocation);
        assert_eq!(
            out,
            "  location / {\n    expires 1h;\n    root                  /var/www/site;\n    try_files             $uri $uri/ =404;\n    index                 index.html index.htm index.php;\n    gzip on;\n  }\n"
        );
    }

    #[test]
    fn proxy_location() {
        let spec = VhostSpec {
            proxy: Some("http://127.0.0.1:8080".into()),
            proxy_cache: Some("app".into()),
            proxy_cache_valid: Some("200 10m".into()),
            www_root: None,
            ..site()
        };
        let out = rendered(&spec, FragmentKind::DefaultLocation);
        assert!(out.contains("proxy_pass            http://127.0.0.1:8080;\n"));
        assert!(out.contains("proxy_read_timeout    90;\n"));
        assert!(out.contains("proxy_cache           app;\n"));
        assert!(out.contains("proxy_cache_valid     200 10m;\n"));
        assert!(!out.contains("root"));
    }

    #[test]
    fn fastcgi_location() {
        let spec = VhostSpec {
            fastcgi: Some("127.0.0.1:9000".into()),
            fastcgi_script: Some("/var/www/site/index.php".into()),
            ..site()
        };
        let out = rendered(&spec, FragmentKind::DefaultLocation);
        assert!(out.contains("root                  /var/www/site;\n"));
        assert!(out.contains("include               /etc/nginx/fastcgi_params;\n"));
        assert!(out.contains("fastcgi_pass          127.0.0.1:9000;\n"));
        assert!(out.contains("fastcgi_param         SCRIPT_FILENAME /var/www/site/index.php;\n"));
        assert!(!out.contains("index                 "));
    }

    #[test]
    fn rendering_is_idempotent() {
        let spec = VhostSpec {
            ssl: true,
            ssl_cert: Some("/tmp/server.crt".into()),
            ssl_key: Some("/tmp/server.pem".into()),
            vhost_cfg_append: BTreeMap::from([
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
            ]),
            ..site()
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let renderer = Renderer::new();

        for d in plan.descriptors.iter().filter(|d| d.kind.is_fragment()) {
            let first = renderer.render(d).unwrap();
            let second = Renderer::new().render(d).unwrap();
            assert_eq!(first, second, "{} not stable", d.kind);
            assert!(!first.is_empty());
        }
    }

    #[test]
    fn copy_reads_source_verbatim() {
        let mut cert = tempfile::NamedTempFile::new().unwrap();
        cert.write_all(b"-----BEGIN CERTIFICATE-----\nabc\n").unwrap();
        let spec = VhostSpec {
            ssl: true,
            ssl_cert: Some(cert.path().to_path_buf()),
            ssl_key: Some(cert.path().to_path_buf()),
            ..site()
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let bytes = Renderer::new()
            .render(plan.get(FragmentKind::SslCert).unwrap())
            .unwrap();
        assert_eq!(bytes, b"-----BEGIN CERTIFICATE-----\nabc\n");
    }

    #[test]
    fn missing_copy_source_names_the_target() {
        let spec = VhostSpec {
            ssl: true,
            ssl_cert: Some("/nonexistent/server.crt".into()),
            ssl_key: Some("/nonexistent/server.key".into()),
            ..site()
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let err = Renderer::new()
            .render(plan.get(FragmentKind::SslKey).unwrap())
            .unwrap_err();
        match err {
            ConfigError::FragmentWrite { path, .. } => {
                assert_eq!(path, PathBuf::from("/etc/nginx/site.local.key"))
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn absent_descriptors_render_nothing() {
        let spec = VhostSpec {
            ensure: Ensure::Absent,
            ssl: true,
            ssl_cert: Some("/nonexistent/server.crt".into()),
            ssl_key: Some("/nonexistent/server.key".into()),
            ..site()
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let renderer = Renderer::new();
        for d in &plan.descriptors {
            assert!(renderer.render(d).unwrap().is_empty());
        }
    }

    #[test]
    fn strict_mode_reports_missing_keys() {
        let err = Renderer::new()
            .render_template(
                TemplateId::Header,
                BTreeMap::from([("listen_ip", "*")]),
                Path::new("/tmp/x-001"),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Template {
                template: TemplateId::Header,
                ..
            }
        ));
    }

    #[test]
    fn location_fragment_files_share_content() {
        let spec = VhostSpec {
            ssl: true,
            ssl_cert: Some("/c".into()),
            ssl_key: Some("/k".into()),
            ..site()
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        let plan = plan(&validated, &NginxParams::default(), &NotifyPolicy::default());
        let d = plan.get(FragmentKind::DefaultLocation).unwrap();
        let files = FragmentFile::from_descriptor(d, Renderer::new().render(d).unwrap());

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].content, files[1].content);
        assert!(files[0].path.ends_with("site.local-500-site.local-default"));
        assert!(files[1].path.ends_with("site.local-800-site.local-default-ssl"));
    }
}
