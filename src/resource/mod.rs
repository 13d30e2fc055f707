//! Resources that converge composed vhosts onto the host
//!
//! Every rendered fragment is a [`Fragment`] resource with:
//! - State detection (absent, or present with a content digest)
//! - Apply function (atomic write or removal)
//! - A notify flag that schedules the nginx reload
//!
//! The reload itself is an [`NginxService`] post-apply action.

pub mod fragment;
pub mod service;

pub use declarative::{ApplyContext, ApplyResult, Resource, ResourceState};
pub use fragment::Fragment;
pub use service::NginxService;
