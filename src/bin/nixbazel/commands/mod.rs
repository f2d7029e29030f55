//! Command implementations

pub mod completions;
pub mod fetch;
pub mod generate;
pub mod resolve;
pub mod unpack;

use std::path::Path;

use nixbazel::codegen::GenerateOptions;
use nixbazel::util::fs::relative_path;
use nixbazel::util::GlobalContext;

use crate::cli::GenerateFlags;

/// Build generation options for `out_dir` from the command line.
///
/// The update script writes the lockfile relative to the Bazel workspace,
/// so an absolute lockfile path is made relative to the working directory.
pub fn generate_options(
    ctx: &GlobalContext,
    out_dir: &Path,
    lockfile: &Path,
    channel: Option<String>,
    flags: &GenerateFlags,
) -> GenerateOptions {
    let mut options = GenerateOptions::new(ctx.resolve_path(out_dir));
    options.repo_name = flags.repo_name.clone();
    options.config_name = flags.config_name.clone();
    options.lockfile_name = if lockfile.is_absolute() {
        relative_path(ctx.cwd(), lockfile).display().to_string()
    } else {
        lockfile.display().to_string()
    };
    options.channel = channel;
    options
}
