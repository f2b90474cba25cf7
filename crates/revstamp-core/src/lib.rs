#![deny(unsafe_code)]

//! revstamp core: revision metadata for build stamping.
//!
//! Locates a VCS binary, asks it for the latest commit and the working-tree
//! state under a hard timeout, and renders that metadata through a small
//! placeholder language. The [`patcher`] applies the rendered templates to
//! assembly info files.

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// VCS binary discovery.
pub mod locator;
/// Attribute-line patching with encoding preservation.
pub mod patcher;
/// VCS queries with bounded run time.
pub mod resolver;
/// Resolved revision value types.
pub mod revision;
/// Run policy over resolution and patching.
pub mod stamp;
/// Placeholder template engine.
pub mod template;

pub use locator::VcsLocator;
pub use patcher::{BracketStyle, PatchError, PatchReport, TextEncoding};
pub use resolver::{ResolveError, RevisionResolver};
pub use revision::{CommitHash, RevisionInfo};
pub use stamp::{StampError, StampRequest, Stamper};
pub use template::render;
