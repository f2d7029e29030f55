//! Core data structures for nixbazel.
//!
//! This module contains the foundational types used throughout nixbazel:
//! - Store path conventions
//! - Package nodes and the package table
//! - The input configuration

pub mod manifest;
pub mod package;
pub mod store_path;

pub use manifest::{Manifest, RepositoryConfig, MANIFEST_NAME};
pub use package::{PackageNode, PackageTable};
