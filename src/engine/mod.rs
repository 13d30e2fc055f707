//! Execution engine for vhostctl
//!
//! The engine orchestrates:
//! 1. Planning - Compose every vhost and build the fragment resources
//! 2. Diffing - Compute current vs desired state
//! 3. Executing - Apply changes in stage order and reload nginx once

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{ExecuteOptions, execute};
pub use planner::{compose_all, composer_for, service_for};
