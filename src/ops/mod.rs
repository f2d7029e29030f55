//! High-level operations.
//!
//! This module contains the implementation of nixbazel commands.

pub mod fetch;
pub mod generate;
pub mod lockfile;
pub mod resolve;

pub use fetch::{fetch_all, fetch_repository, FetchOptions, FetchSummary};
pub use generate::generate_from_lockfile;
pub use lockfile::{load_lockfile, require_lockfile, save_lockfile};
pub use resolve::{resolve_all, ResolveOptions};
