//! The vhost manifest: nginx params, reload command, notify policy and vhosts.
//!
//! ```toml
//! [nginx]
//! conf_dir = "/etc/nginx"
//! temp_dir = "/tmp/nginx.mod"
//!
//! [service]
//! reload_command = "systemctl reload nginx"
//!
//! [[vhost]]
//! name = "site.local"
//! www_root = "/var/www/site"
//! ```

use nginxkit::{NginxParams, NotifyPolicy, VhostSpec};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("could not read manifest {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("vhost '{0}' is declared more than once")]
    DuplicateVhost(String),

    #[error("vhosts '{first}' and '{second}' would both write {stem}.crt and {stem}.key")]
    SslMaterialConflict {
        first: String,
        second: String,
        stem: String,
    },

    #[error("service.reload_command is empty")]
    EmptyReloadCommand,

    #[error("no vhost matches '{0}'")]
    UnknownTarget(String),
}

/// How nginx is told to pick up new fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Run once after a notifying fragment changes; split on whitespace, no shell
    pub reload_command: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reload_command: "nginx -s reload".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Program and arguments of the reload command
    pub fn argv(&self) -> Result<(String, Vec<String>), ManifestError> {
        let mut parts = self.reload_command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ManifestError::EmptyReloadCommand)?;
        Ok((program, parts.collect()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub nginx: NginxParams,
    pub service: ServiceConfig,
    pub notify: NotifyPolicy,
    #[serde(rename = "vhost")]
    pub vhosts: Vec<VhostSpec>,
}

impl Manifest {
    /// Load, expand and check a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: Self = toml::from_str(&content).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        manifest.expand_paths();
        manifest.validate()?;
        log::debug!(
            "Loaded {} vhosts from {}",
            manifest.vhosts.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Checks that span vhosts; per-vhost checks belong to the composer
    pub fn validate(&self) -> Result<(), ManifestError> {
        let mut seen = HashSet::new();
        for vhost in &self.vhosts {
            if !seen.insert(vhost.name.as_str()) {
                return Err(ManifestError::DuplicateVhost(vhost.name.clone()));
            }
        }

        // cert and key land in conf_dir under the sanitized name, absent or not
        let mut stems: HashMap<String, &str> = HashMap::new();
        for vhost in self.vhosts.iter().filter(|v| v.ssl) {
            let stem = vhost.sanitized_name();
            if let Some(first) = stems.insert(stem.clone(), vhost.name.as_str()) {
                return Err(ManifestError::SslMaterialConflict {
                    first: first.to_string(),
                    second: vhost.name.clone(),
                    stem,
                });
            }
        }
        self.service.argv()?;
        Ok(())
    }

    /// Expand `~` and `$VAR` in every path-valued setting
    pub fn expand_paths(&mut self) {
        paths::expand_in_place(&mut self.nginx.conf_dir);
        paths::expand_in_place(&mut self.nginx.temp_dir);
        paths::expand_in_place(&mut self.nginx.log_dir);

        for vhost in &mut self.vhosts {
            let optional = [
                &mut vhost.ssl_cert,
                &mut vhost.ssl_key,
                &mut vhost.www_root,
                &mut vhost.fastcgi_params,
                &mut vhost.auth_basic_user_file,
            ];
            for path in optional.into_iter().flatten() {
                paths::expand_in_place(path);
            }
            for path in &mut vhost.include_files {
                paths::expand_in_place(path);
            }
        }
    }

    /// Vhosts selected by an optional name filter, in manifest order
    pub fn select(&self, target: Option<&str>) -> Result<Vec<&VhostSpec>, ManifestError> {
        let Some(target) = target else {
            return Ok(self.vhosts.iter().collect());
        };
        let selected: Vec<_> = self.vhosts.iter().filter(|v| v.name == target).collect();
        if selected.is_empty() {
            return Err(ManifestError::UnknownTarget(target.to_string()));
        }
        Ok(selected)
    }
}
