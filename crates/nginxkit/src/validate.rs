//! Vhost validation and normalization.

use serde::Serialize;

use crate::error::{ConfigError, ConfigWarning, Result, SslMaterial};
use crate::host::HostFacts;
use crate::types::VhostSpec;

/// The content source that takes effect for a vhost's default location.
///
/// Precedence when several are set: proxy, then fastcgi, then www_root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Proxy,
    Fastcgi,
    Directory,
}

impl ContentKind {
    /// Name of the vhost parameter that selects this source
    pub fn param(self) -> &'static str {
        match self {
            Self::Proxy => "proxy",
            Self::Fastcgi => "fastcgi",
            Self::Directory => "www_root",
        }
    }
}

/// A vhost that passed validation, with derived fields filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSpec {
    /// Normalized spec: `server_name` is never empty, IPv6 is cleared when unsupported
    pub spec: VhostSpec,
    /// SSL is the only listener (`ssl && ssl_port == listen_port`)
    pub ssl_only: bool,
    /// `None` only for absent vhosts that declare no source
    pub content: Option<ContentKind>,
    pub warnings: Vec<ConfigWarning>,
}

impl ValidatedSpec {
    /// Vhost name
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Whether the plain (non-SSL) listener block is emitted
    ///
    /// Only an SSL listener sharing the plain port suppresses it; a non-SSL
    /// vhost on port 443 still gets its server block.
    pub fn has_plain_listener(&self) -> bool {
        !self.ssl_only
    }
}

/// Validate a vhost against the host it will run on.
///
/// Fatal problems return an error and nothing downstream runs. IPv6 on an
/// IPv4-only host and overlapping content sources are recorded as warnings.
pub fn validate(spec: &VhostSpec, host: &dyn HostFacts) -> Result<ValidatedSpec> {
    check_name(&spec.name)?;

    if spec.ssl {
        if spec.ssl_cert.is_none() {
            return Err(ConfigError::MissingSslMaterial {
                name: spec.name.clone(),
                missing: SslMaterial::Cert,
            });
        }
        if spec.ssl_key.is_none() {
            return Err(ConfigError::MissingSslMaterial {
                name: spec.name.clone(),
                missing: SslMaterial::Key,
            });
        }
    }

    let mut warnings = Vec::new();
    let content = select_content(spec, &mut warnings);
    if content.is_none() && spec.ensure.is_present() {
        return Err(ConfigError::MissingContentSource {
            name: spec.name.clone(),
        });
    }

    let mut normalized = spec.clone();
    if normalized.server_name.is_empty() {
        normalized.server_name = vec![spec.name.clone()];
    }

    if normalized.ipv6_enable && !host.has_ipv6() {
        warnings.push(ConfigWarning::IncompatibleListener {
            name: spec.name.clone(),
        });
        normalized.ipv6_enable = false;
    }

    // reported to the user by the caller
    for warning in &warnings {
        log::debug!("{}", warning);
    }

    let ssl_only = spec.ssl && spec.ssl_port == spec.listen_port;

    Ok(ValidatedSpec {
        spec: normalized,
        ssl_only,
        content,
        warnings,
    })
}

/// Names become fragment filenames, so they must be a single path component.
fn check_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name.contains('/') {
        Some("name contains '/'")
    } else if name.contains('\0') {
        Some("name contains a NUL byte")
    } else if name == "." || name == ".." {
        Some("name is a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn select_content(spec: &VhostSpec, warnings: &mut Vec<ConfigWarning>) -> Option<ContentKind> {
    let declared: Vec<ContentKind> = [
        (spec.proxy.is_some(), ContentKind::Proxy),
        (spec.fastcgi.is_some(), ContentKind::Fastcgi),
        (spec.www_root.is_some(), ContentKind::Directory),
    ]
    .into_iter()
    .filter_map(|(set, kind)| set.then_some(kind))
    .collect();

    let (&used, ignored) = declared.split_first()?;
    if !ignored.is_empty() {
        warnings.push(ConfigWarning::ShadowedContentSource {
            name: spec.name.clone(),
            used: used.param(),
            ignored: ignored.iter().map(|k| k.param()).collect(),
        });
    }
    Some(used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticHost;
    use crate::types::Ensure;

    fn static_site(name: &str) -> VhostSpec {
        VhostSpec {
            www_root: Some("/var/www/nginx-default".into()),
            ..VhostSpec::new(name)
        }
    }

    fn ssl_site(name: &str) -> VhostSpec {
        VhostSpec {
            ssl: true,
            ssl_cert: Some("/tmp/server.crt".into()),
            ssl_key: Some("/tmp/server.pem".into()),
            ..static_site(name)
        }
    }

    #[test]
    fn missing_key_is_fatal() {
        let spec = VhostSpec {
            ssl_key: None,
            ..ssl_site("test2.local")
        };
        let err = validate(&spec, &StaticHost::dual_stack()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSslMaterial {
                missing: SslMaterial::Key,
                ..
            }
        ));
        assert!(err.is_validation());
    }

    #[test]
    fn missing_cert_is_fatal() {
        let spec = VhostSpec {
            ssl_cert: None,
            ..ssl_site("test2.local")
        };
        let err = validate(&spec, &StaticHost::dual_stack()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSslMaterial {
                missing: SslMaterial::Cert,
                ..
            }
        ));
    }

    #[test]
    fn ssl_material_is_not_needed_without_ssl() {
        let validated = validate(&static_site("plain"), &StaticHost::dual_stack()).unwrap();
        assert!(!validated.ssl_only);
    }

    #[test]
    fn server_name_defaults_to_vhost_name() {
        let validated = validate(&static_site("test.local"), &StaticHost::dual_stack()).unwrap();
        assert_eq!(validated.spec.server_name, vec!["test.local".to_string()]);

        let explicit = VhostSpec {
            server_name: vec!["a.local".into(), "b.local".into()],
            ..static_site("test.local")
        };
        let validated = validate(&explicit, &StaticHost::dual_stack()).unwrap();
        assert_eq!(validated.spec.server_name, vec!["a.local", "b.local"]);
    }

    #[test]
    fn ssl_only_when_ports_match() {
        let same_port = VhostSpec {
            listen_port: 443,
            ..ssl_site("s")
        };
        let validated = validate(&same_port, &StaticHost::dual_stack()).unwrap();
        assert!(validated.ssl_only);
        assert!(!validated.has_plain_listener());

        let validated = validate(&ssl_site("s"), &StaticHost::dual_stack()).unwrap();
        assert!(!validated.ssl_only);
        assert!(validated.has_plain_listener());
    }

    #[test]
    fn matching_ports_without_ssl_are_not_ssl_only() {
        let spec = VhostSpec {
            listen_port: 443,
            ..static_site("s")
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        assert!(!validated.ssl_only);
        assert!(validated.has_plain_listener());
    }

    #[test]
    fn ipv6_on_ipv4_host_is_a_warning() {
        let spec = VhostSpec {
            ipv6_enable: true,
            ..static_site("v6")
        };

        let validated = validate(&spec, &StaticHost::ipv4_only()).unwrap();
        assert!(!validated.spec.ipv6_enable);
        assert_eq!(
            validated.warnings,
            vec![ConfigWarning::IncompatibleListener { name: "v6".into() }]
        );

        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        assert!(validated.spec.ipv6_enable);
        assert!(validated.warnings.is_empty());
    }

    #[test]
    fn proxy_wins_over_fastcgi_and_www_root() {
        let spec = VhostSpec {
            proxy: Some("http://127.0.0.1:8080".into()),
            fastcgi: Some("127.0.0.1:9000".into()),
            ..static_site("mixed")
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        assert_eq!(validated.content, Some(ContentKind::Proxy));
        assert_eq!(
            validated.warnings,
            vec![ConfigWarning::ShadowedContentSource {
                name: "mixed".into(),
                used: "proxy",
                ignored: vec!["fastcgi", "www_root"],
            }]
        );
    }

    #[test]
    fn fastcgi_wins_over_www_root() {
        let spec = VhostSpec {
            fastcgi: Some("127.0.0.1:9000".into()),
            ..static_site("php")
        };
        let validated = validate(&spec, &StaticHost::dual_stack()).unwrap();
        assert_eq!(validated.content, Some(ContentKind::Fastcgi));
    }

    #[test]
    fn present_vhost_needs_a_content_source() {
        let err = validate(&VhostSpec::new("empty"), &StaticHost::dual_stack()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingContentSource { .. }));

        let absent = VhostSpec {
            ensure: Ensure::Absent,
            ..VhostSpec::new("empty")
        };
        let validated = validate(&absent, &StaticHost::dual_stack()).unwrap();
        assert_eq!(validated.content, None);
    }

    #[test]
    fn names_must_be_single_path_components() {
        for bad in ["", "  ", "a/b", "..", "."] {
            let err = validate(&static_site(bad), &StaticHost::dual_stack()).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidName { .. }), "{bad:?}");
        }
        assert!(validate(&static_site("my site"), &StaticHost::dual_stack()).is_ok());
    }
}
