//! Vhost parameters, nginx params and fragment attributes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::plan::FragmentKind;

/// Whether a vhost (and so each of its fragments) should exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// Fragments are written
    #[default]
    #[serde(alias = "enable")]
    Present,
    /// Fragments are removed
    Absent,
}

impl Ensure {
    /// Check if this is `present`
    pub fn is_present(self) -> bool {
        matches!(self, Self::Present)
    }
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// A virtual host resource, as declared by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VhostSpec {
    /// Vhost identifier, used for fragment filenames and as the default server name
    pub name: String,
    pub ensure: Ensure,

    pub listen_ip: String,
    pub listen_port: u16,
    pub listen_options: Option<String>,

    pub ipv6_enable: bool,
    pub ipv6_listen_ip: String,
    pub ipv6_listen_port: u16,
    pub ipv6_listen_options: Option<String>,

    pub ssl: bool,
    pub ssl_cert: Option<PathBuf>,
    pub ssl_key: Option<PathBuf>,
    pub ssl_port: u16,

    /// Reverse proxy target, e.g. `http://127.0.0.1:8080`
    pub proxy: Option<String>,
    /// Falls back to [`NginxParams::proxy_read_timeout`]
    pub proxy_read_timeout: Option<String>,
    pub proxy_cache: Option<String>,
    pub proxy_cache_valid: Option<String>,

    /// FastCGI upstream, e.g. `127.0.0.1:9000`
    pub fastcgi: Option<String>,
    /// Falls back to `<conf_dir>/fastcgi_params`
    pub fastcgi_params: Option<PathBuf>,
    pub fastcgi_script: Option<String>,

    /// Static document root
    pub www_root: Option<PathBuf>,
    pub index_files: Vec<String>,
    pub try_files: Vec<String>,

    /// Empty means "use the vhost name"
    pub server_name: Vec<String>,
    pub rewrite_www_to_non_www: bool,

    pub location_cfg_prepend: BTreeMap<String, String>,
    pub location_cfg_append: BTreeMap<String, String>,

    /// Basic auth realm
    pub auth_basic: Option<String>,
    pub auth_basic_user_file: Option<PathBuf>,

    /// Trailing directives emitted before each closing brace, sorted by key
    pub vhost_cfg_append: BTreeMap<String, String>,
    pub include_files: Vec<PathBuf>,
}

impl Default for VhostSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            ensure: Ensure::Present,
            listen_ip: "*".to_string(),
            listen_port: 80,
            listen_options: None,
            ipv6_enable: false,
            ipv6_listen_ip: "::".to_string(),
            ipv6_listen_port: 80,
            ipv6_listen_options: Some("default".to_string()),
            ssl: false,
            ssl_cert: None,
            ssl_key: None,
            ssl_port: 443,
            proxy: None,
            proxy_read_timeout: None,
            proxy_cache: None,
            proxy_cache_valid: None,
            fastcgi: None,
            fastcgi_params: None,
            fastcgi_script: None,
            www_root: None,
            index_files: vec![
                "index.html".to_string(),
                "index.htm".to_string(),
                "index.php".to_string(),
            ],
            try_files: Vec::new(),
            server_name: Vec::new(),
            rewrite_www_to_non_www: false,
            location_cfg_prepend: BTreeMap::new(),
            location_cfg_append: BTreeMap::new(),
            auth_basic: None,
            auth_basic_user_file: None,
            vhost_cfg_append: BTreeMap::new(),
            include_files: Vec::new(),
        }
    }
}

impl VhostSpec {
    /// A present vhost with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name with spaces replaced by underscores, used for conf-dir files
    pub fn sanitized_name(&self) -> String {
        sanitize_name(&self.name)
    }
}

/// Replace spaces with underscores so a vhost name can be used in conf paths.
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Ownership and permission bits applied to every written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileAttrs {
    pub mode: u32,
    pub owner: String,
    pub group: String,
}

impl Default for FileAttrs {
    fn default() -> Self {
        Self {
            mode: 0o644,
            owner: "root".to_string(),
            group: "root".to_string(),
        }
    }
}

/// Site-wide nginx settings shared by all vhosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NginxParams {
    /// Where certificate and key copies land
    pub conf_dir: PathBuf,
    /// Root of the fragment staging area
    pub temp_dir: PathBuf,
    /// Subdirectory of `temp_dir` shared by all vhost fragments
    pub vhost_set: String,
    pub log_dir: PathBuf,
    pub proxy_read_timeout: String,
    pub file: FileAttrs,
}

impl Default for NginxParams {
    fn default() -> Self {
        Self {
            conf_dir: PathBuf::from("/etc/nginx"),
            temp_dir: PathBuf::from("/tmp/nginx.mod"),
            vhost_set: "nginx.d".to_string(),
            log_dir: PathBuf::from("/var/log/nginx"),
            proxy_read_timeout: "90".to_string(),
            file: FileAttrs::default(),
        }
    }
}

impl NginxParams {
    /// Directory holding every vhost fragment: `<temp_dir>/<vhost_set>`
    pub fn fragment_dir(&self) -> PathBuf {
        self.temp_dir.join(&self.vhost_set)
    }

    /// Default FastCGI params include file
    pub fn fastcgi_params(&self) -> PathBuf {
        self.conf_dir.join("fastcgi_params")
    }
}

/// Which fragment kinds notify the nginx service when they change.
///
/// The defaults reproduce the long-standing behavior where the plain footer
/// does not notify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyPolicy {
    pub header: bool,
    pub default_location: bool,
    pub plain_footer: bool,
    pub ssl_header: bool,
    pub ssl_footer: bool,
    pub ssl_cert: bool,
    pub ssl_key: bool,
}

impl Default for NotifyPolicy {
    fn default() -> Self {
        Self {
            header: true,
            default_location: true,
            plain_footer: false,
            ssl_header: true,
            ssl_footer: true,
            ssl_cert: true,
            ssl_key: true,
        }
    }
}

impl NotifyPolicy {
    /// Every fragment kind notifies
    pub fn all() -> Self {
        Self {
            plain_footer: true,
            ..Self::default()
        }
    }

    /// Notify flag for a fragment kind
    pub fn for_kind(&self, kind: FragmentKind) -> bool {
        match kind {
            FragmentKind::Header => self.header,
            FragmentKind::DefaultLocation => self.default_location,
            FragmentKind::Footer => self.plain_footer,
            FragmentKind::SslHeader => self.ssl_header,
            FragmentKind::SslFooter => self.ssl_footer,
            FragmentKind::SslCert => self.ssl_cert,
            FragmentKind::SslKey => self.ssl_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_spaces() {
        assert_eq!(sanitize_name("my site"), "my_site");
        assert_eq!(sanitize_name("a b  c"), "a_b__c");
        assert_eq!(sanitize_name("plain.local"), "plain.local");
    }

    #[test]
    fn vhost_defaults_from_toml() {
        let spec: VhostSpec = toml::from_str(r#"name = "test.local""#).unwrap();
        assert_eq!(spec.ensure, Ensure::Present);
        assert_eq!(spec.listen_ip, "*");
        assert_eq!(spec.listen_port, 80);
        assert_eq!(spec.ssl_port, 443);
        assert!(!spec.ssl);
        assert_eq!(spec.index_files.len(), 3);
    }

    #[test]
    fn enable_is_an_alias_for_present() {
        let spec: VhostSpec = toml::from_str(
            r#"
name = "x"
ensure = "enable"
"#,
        )
        .unwrap();
        assert_eq!(spec.ensure, Ensure::Present);
    }

    #[test]
    fn unknown_vhost_keys_are_rejected() {
        let err = toml::from_str::<VhostSpec>(
            r#"
name = "x"
ssl_crt = "/tmp/a"
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn notify_policy_footer_is_silent_by_default() {
        let policy = NotifyPolicy::default();
        assert!(!policy.for_kind(FragmentKind::Footer));
        assert!(policy.for_kind(FragmentKind::Header));
        assert!(NotifyPolicy::all().for_kind(FragmentKind::Footer));
    }

    #[test]
    fn fragment_dir_joins_vhost_set() {
        let params = NginxParams::default();
        assert_eq!(params.fragment_dir(), PathBuf::from("/tmp/nginx.mod/nginx.d"));
    }
}
