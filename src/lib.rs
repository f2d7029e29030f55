//! nixbazel - use prebuilt Nix store paths as Bazel dependencies
//!
//! This crate resolves package names to Nix store paths, locks their
//! closures, unpacks them from a binary cache with relocated RPATHs, and
//! generates the `BUILD.bazel` files that expose them to Bazel.

pub mod codegen;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod store;
pub mod util;

/// Test utilities and mocks for nixbazel unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides an in-memory metadata and archive source plus NAR fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{Manifest, PackageNode, PackageTable};
pub use resolver::{Lockfile, ResolveError};
pub use util::context::GlobalContext;
