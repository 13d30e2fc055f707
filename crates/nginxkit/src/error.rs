//! Error and warning types for vhost composition.
//!
//! Errors abort the whole vhost before anything is written. Warnings are
//! collected on the validated spec and logged; processing continues.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::render::TemplateId;

/// Which piece of SSL material is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMaterial {
    Cert,
    Key,
}

impl fmt::Display for SslMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cert => write!(f, "ssl_cert"),
            Self::Key => write!(f, "ssl_key"),
        }
    }
}

/// Fatal errors while validating, rendering or writing a vhost.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// SSL is enabled but the certificate or key path is unset
    #[error("vhost '{name}': ssl is enabled but {missing} is not set")]
    MissingSslMaterial { name: String, missing: SslMaterial },

    /// A present vhost has nothing to serve
    #[error("vhost '{name}': no content source, set one of proxy, fastcgi or www_root")]
    MissingContentSource { name: String },

    /// The vhost name cannot be used as a fragment filename
    #[error("invalid vhost name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Template expansion failed
    #[error("failed to render {template} for {}: {source}", .path.display())]
    Template {
        template: TemplateId,
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    /// Reading a copy source or writing a target failed
    #[error("failed to write fragment {}: {source}", .path.display())]
    FragmentWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Whether the error was raised by validation (nothing was rendered)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingSslMaterial { .. } | Self::MissingContentSource { .. } | Self::InvalidName { .. }
        )
    }
}

/// Non-fatal findings recorded during validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// IPv6 was requested on a host without IPv6; the IPv6 listeners are dropped
    #[error("vhost '{name}': ipv6_enable is set but the host has no IPv6 support, skipping IPv6 listeners")]
    IncompatibleListener { name: String },

    /// More than one content source was set; only `used` takes effect
    #[error("vhost '{name}': {used} takes precedence, ignoring {}", .ignored.join(", "))]
    ShadowedContentSource {
        name: String,
        used: &'static str,
        ignored: Vec<&'static str>,
    },
}

/// Result type for composer operations
pub type Result<T> = std::result::Result<T, ConfigError>;
