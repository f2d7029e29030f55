//! Materializing store paths on disk.
//!
//! Archives stream from the download through the decompressor into a
//! staging directory. Once both hashes check out the staged tree is
//! relocated and renamed to `<out>/<basename>`.

pub mod decompress;
pub mod errors;
pub mod nar;
pub mod relocate;
pub mod unpack;

pub use errors::FetchError;
pub use unpack::{materialize, unpack_archive, Outcome};

use std::path::PathBuf;

use crate::util::config::ToolsConfig;
use crate::util::process::find_tool;

/// Resolved paths of the external tools. `None` means unavailable.
#[derive(Debug, Clone, Default)]
pub struct Tools {
    pub patchelf: Option<PathBuf>,
    pub xz: Option<PathBuf>,
    pub bzip2: Option<PathBuf>,
    pub zstd: Option<PathBuf>,
}

impl Tools {
    /// Look up every tool, preferring configured paths.
    pub fn detect(config: &ToolsConfig) -> Self {
        let tools = Tools {
            patchelf: find_tool(config.patchelf.as_deref(), "patchelf"),
            xz: find_tool(config.xz.as_deref(), "xz"),
            bzip2: find_tool(config.bzip2.as_deref(), "bzip2"),
            zstd: find_tool(config.zstd.as_deref(), "zstd"),
        };
        tracing::debug!("external tools: {:?}", tools);
        tools
    }

    /// Warn once if binaries cannot be relocated.
    pub fn warn_missing(&self) {
        if self.patchelf.is_none() {
            tracing::warn!("patchelf not found, binaries will keep their /nix/store RPATHs");
        }
    }
}
