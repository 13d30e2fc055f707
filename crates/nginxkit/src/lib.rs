//! # nginxkit
//!
//! Compose nginx virtual host configuration from declarative parameters.
//!
//! A vhost is split into staged fragments that an external step
//! concatenates into the final server configuration:
//!
//! | stage | fragment                         |
//! |-------|----------------------------------|
//! | 001   | plain server block header        |
//! | 500   | default location (plain)         |
//! | 699   | plain server block footer        |
//! | 700   | SSL server block header          |
//! | 800   | default location (SSL)           |
//! | 999   | SSL server block footer          |
//!
//! Certificate and key are copied into the nginx conf dir as
//! `<name>.crt` and `<name>.key`.
//!
//! ## Example
//!
//! ```no_run
//! use nginxkit::{Composer, NginxParams, VhostSpec};
//!
//! let composer = Composer::new(NginxParams::default());
//! let spec = VhostSpec {
//!     www_root: Some("/var/www/site".into()),
//!     ..VhostSpec::new("site.local")
//! };
//!
//! let composed = composer.compose(&spec).expect("invalid vhost");
//! for file in &composed.files {
//!     println!("{} -> {}", file.kind, file.path.display());
//! }
//! ```

pub mod composer;
pub mod error;
pub mod host;
pub mod location;
pub mod plan;
pub mod render;
pub mod types;
pub mod validate;

pub use composer::{ComposedVhost, Composer};
pub use error::{ConfigError, ConfigWarning, Result, SslMaterial};
pub use host::{HostFacts, StaticHost, SystemHost};
pub use location::{ContentSource, LocationSpec};
pub use plan::{FragmentBody, FragmentDescriptor, FragmentKind, Stage, VhostPlan, plan};
pub use render::{Directive, FragmentFile, Renderer, TemplateId};
pub use types::{Ensure, FileAttrs, NginxParams, NotifyPolicy, VhostSpec, sanitize_name};
pub use validate::{ContentKind, ValidatedSpec, validate};
