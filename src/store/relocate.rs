//! Binary relocation.
//!
//! Binaries in the cache have an RPATH pointing into `/nix/store`. After
//! extraction every package lives at `<out>/<basename>`, so each dynamic
//! object is pointed at the `lib` and `lib64` directories of its package's
//! direct references, relative to `$ORIGIN`. Deeper dependencies are found
//! through the RPATHs of the libraries in between.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::core::store_path;
use crate::store::errors::FetchError;
use crate::store::Tools;
use crate::util::fs::{mode_of, relative_path};
use crate::util::process::ProcessBuilder;

/// `libfoo.so.1`, `libfoo.so.1.2.3`
static SO_VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.so\.[0-9]").expect("valid regex"));

const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Outcome of relocating one package.
#[derive(Debug, Default)]
pub struct RelocationSummary {
    pub candidates: usize,
    pub patched: usize,
    pub failures: Vec<FetchError>,
}

/// Whether a regular file should have its RPATH rewritten.
pub fn is_candidate(file_name: &str, mode: u32) -> bool {
    mode & 0o111 != 0 || file_name.ends_with(".so") || SO_VERSION_SUFFIX.is_match(file_name)
}

/// The RPATH for a file whose final directory is `file_dir`.
///
/// References may be basenames or store paths. They are sorted and
/// de-duplicated; each contributes `lib` then `lib64`.
pub fn rpath_for(file_dir: &Path, out_root: &Path, references: &[String]) -> String {
    let rel = relative_path(file_dir, out_root);
    let rel = if rel.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        rel
    };
    let rel = rel.to_string_lossy().replace('\\', "/");

    let mut names: Vec<&str> = references.iter().map(|r| store_path::basename(r)).collect();
    names.sort_unstable();
    names.dedup();

    names
        .iter()
        .flat_map(|name| {
            [
                format!("$ORIGIN/{}/{}/lib", rel, name),
                format!("$ORIGIN/{}/{}/lib64", rel, name),
            ]
        })
        .collect::<Vec<_>>()
        .join(":")
}

fn is_elf(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    fs::File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == ELF_MAGIC)
        .unwrap_or(false)
}

/// Rewrite the RPATH of every candidate under `package_dir`.
///
/// `package_dir` is where the files are now; `final_dir` is where the
/// package will live, which is what relative paths are computed from.
/// Failures are logged and collected, never fatal.
pub fn relocate(
    package_dir: &Path,
    final_dir: &Path,
    references: &[String],
    out_root: &Path,
    tools: &Tools,
) -> RelocationSummary {
    let mut summary = RelocationSummary::default();

    let Some(patchelf) = tools.patchelf.as_deref() else {
        tracing::debug!(
            "patchelf not found, skipping relocation of {}",
            final_dir.display()
        );
        return summary;
    };

    if references.is_empty() {
        return summary;
    }

    for entry in WalkDir::new(package_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let mode = entry.metadata().map(|m| mode_of(&m)).unwrap_or(0);
        if !is_candidate(&name, mode) {
            continue;
        }
        summary.candidates += 1;

        let path = entry.path();
        if !is_elf(path) {
            tracing::debug!("{} is not an ELF object", path.display());
            continue;
        }

        let rel = path.strip_prefix(package_dir).unwrap_or(path);
        let final_file = final_dir.join(rel);
        let final_parent = final_file.parent().unwrap_or(final_dir);
        let rpath = rpath_for(final_parent, out_root, references);

        let result = ProcessBuilder::new(patchelf)
            .arg("--set-rpath")
            .arg(&rpath)
            .arg(path)
            .exec_and_check();

        match result {
            Ok(_) => {
                tracing::debug!("set RPATH of {} to {}", final_file.display(), rpath);
                summary.patched += 1;
            }
            Err(e) => {
                let err = FetchError::RelocationFailed {
                    path: final_file,
                    reason: format!("{:#}", e),
                };
                tracing::warn!("{}", err);
                summary.failures.push(err);
            }
        }
    }

    summary
}
