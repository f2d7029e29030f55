//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use nixbazel::core::MANIFEST_NAME;
use nixbazel::resolver::LOCKFILE_NAME;

/// nixbazel - use prebuilt Nix store paths as Bazel dependencies
#[derive(Parser)]
#[command(name = "nixbazel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve declared repositories and write the lockfile
    Resolve(ResolveArgs),

    /// Download and unpack locked packages
    Fetch(FetchArgs),

    /// Generate BUILD.bazel files for a lockfile
    Generate(GenerateArgs),

    /// Unpack a single archive into the tree
    Unpack(UnpackArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by commands that write generated files.
#[derive(Args, Clone)]
pub struct GenerateFlags {
    /// Bazel repository name the tree is mounted as
    #[arg(long, default_value = "nix_deps")]
    pub repo_name: String,

    /// Config file name the update script passes back to `resolve`
    #[arg(long, default_value = MANIFEST_NAME)]
    pub config_name: String,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Repository declarations
    #[arg(long, default_value = MANIFEST_NAME)]
    pub config: PathBuf,

    /// Lockfile to read and write
    #[arg(long, default_value = LOCKFILE_NAME)]
    pub lockfile: PathBuf,

    /// Hydra jobset to resolve names in (e.g. nixos/release-24.05)
    #[arg(long, env = "NIXBAZEL_CHANNEL")]
    pub channel: Option<String>,

    /// Re-resolve repositories that are already locked
    #[arg(long)]
    pub force: bool,

    /// Fetch and generate build files after resolving
    #[arg(long, requires = "out")]
    pub fetch: bool,

    /// Output directory for --fetch
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Number of parallel downloads for --fetch
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Bazel repository name the tree is mounted as
    #[arg(long, default_value = "nix_deps")]
    pub repo_name: String,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Lockfile to materialize
    #[arg(long, default_value = LOCKFILE_NAME)]
    pub lockfile: PathBuf,

    /// Output directory
    #[arg(long)]
    pub out: PathBuf,

    /// Only fetch the closure of this repository
    #[arg(long)]
    pub repo: Option<String>,

    /// Number of parallel downloads
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip build file generation
    #[arg(long)]
    pub no_generate: bool,

    /// Channel recorded in the update script
    #[arg(long, env = "NIXBAZEL_CHANNEL")]
    pub channel: Option<String>,

    #[command(flatten)]
    pub generate: GenerateFlags,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Lockfile to generate for
    #[arg(long, default_value = LOCKFILE_NAME)]
    pub lockfile: PathBuf,

    /// Output directory
    #[arg(long)]
    pub out: PathBuf,

    /// Channel recorded in the update script
    #[arg(long, env = "NIXBAZEL_CHANNEL")]
    pub channel: Option<String>,

    #[command(flatten)]
    pub generate: GenerateFlags,
}

#[derive(Args)]
pub struct UnpackArgs {
    /// Archive file or URL
    #[arg(long)]
    pub archive: String,

    /// Store path the archive contains
    #[arg(long)]
    pub store_path: String,

    /// Output directory
    #[arg(long)]
    pub out: PathBuf,

    /// Comma-separated reference basenames to relocate against
    #[arg(long, value_delimiter = ',')]
    pub refs: Vec<String>,

    /// Compression (xz, bzip2, zstd, none); inferred from the name if unset
    #[arg(long)]
    pub compression: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
