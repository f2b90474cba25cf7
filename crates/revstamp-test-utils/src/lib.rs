#![deny(unsafe_code)]

//! Shared test utilities for the revstamp workspace.
//!
//! Provides a scriptable stand-in for the VCS binary, config builders, and
//! tracing helpers so that individual crate tests stay concise and
//! consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! revstamp-test-utils = { workspace = true }
//! ```

pub mod config;
#[cfg(unix)]
pub mod fake_vcs;
pub mod fixtures;
pub mod tracing_setup;
