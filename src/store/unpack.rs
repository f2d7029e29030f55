//! Archive materialization.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::store_path;
use crate::core::PackageNode;
use crate::sources::{ArchiveStream, Source};
use crate::store::decompress::decompress;
use crate::store::errors::FetchError;
use crate::store::nar::{EntryKind, NarReader};
use crate::store::relocate::relocate;
use crate::store::Tools;
use crate::util::fs::{set_mode, symlink};
use crate::util::hash::HashingReader;

/// File left by codegen in a package directory that has not been fetched.
const BUILD_FILE: &str = "BUILD.bazel";

/// What `materialize` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The destination already existed.
    Skipped,
    /// The archive was unpacked; `patched` objects were relocated.
    Unpacked { patched: usize },
}

/// Whether `dest` holds a materialized package.
///
/// A directory holding nothing but a generated `BUILD.bazel` does not count.
pub fn is_materialized(dest: &Path) -> bool {
    let Ok(meta) = dest.symlink_metadata() else {
        return false;
    };
    if !meta.is_dir() {
        return true;
    }
    match fs::read_dir(dest) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .any(|e| e.file_name() != BUILD_FILE),
        Err(_) => true,
    }
}

/// Materialize one store path into `<out_root>/<basename>`.
///
/// The download is decompressed and unpacked into a staging directory as
/// it arrives; both hashes are checked once the stream ends, before
/// anything is moved into place. Existing destinations are never touched.
pub fn materialize(
    path: &str,
    node: &PackageNode,
    out_root: &Path,
    source: &dyn Source,
    tools: &Tools,
) -> Result<Outcome, FetchError> {
    let name = store_path::basename(path);
    let dest = out_root.join(name);

    if is_materialized(&dest) {
        tracing::debug!("{} already present", name);
        return Ok(Outcome::Skipped);
    }

    tracing::debug!("downloading {}", node.url);
    let mut archive = HashingReader::new(source.download(&node.url)?);

    let (staging, nar_hash) = decompress(&mut archive, &node.compression, tools, path, |nar| {
        let mut nar = HashingReader::new(nar);
        let staging = stage(path, &mut nar, out_root)?;
        Ok((staging, nar.finish()))
    })?;

    tracing::debug!("downloaded {} bytes for {}", archive.bytes_read(), name);
    verify(path, "file hash", &node.file_hash, &archive.finish())?;
    verify(path, "NAR hash", &node.nar_hash, &nar_hash)?;

    install(path, staging, out_root, &node.references, tools)
}

/// Materialize a single archive given by local path or URL.
pub fn unpack_archive(
    archive: &str,
    path: &str,
    references: &[String],
    compression: &str,
    out_root: &Path,
    source: &dyn Source,
    tools: &Tools,
) -> Result<Outcome, FetchError> {
    let dest = out_root.join(store_path::basename(path));
    if is_materialized(&dest) {
        tracing::info!("{} already present", dest.display());
        return Ok(Outcome::Skipped);
    }

    let mut input: ArchiveStream = if archive.starts_with("http://") || archive.starts_with("https://") {
        source.download(archive)?
    } else {
        let file = fs::File::open(archive).map_err(|e| FetchError::DownloadFailed {
            url: archive.to_string(),
            reason: e.to_string(),
        })?;
        Box::new(io::BufReader::new(file))
    };

    let staging = decompress(&mut input, compression, tools, path, |nar| {
        stage(path, nar, out_root)
    })?;
    install(path, staging, out_root, references, tools)
}

/// Infer the compression of an archive from its file name.
pub fn compression_from_name(archive: &str) -> &'static str {
    if archive.ends_with(".xz") {
        "xz"
    } else if archive.ends_with(".bz2") {
        "bzip2"
    } else if archive.ends_with(".zst") {
        "zstd"
    } else {
        "none"
    }
}

fn verify(path: &str, what: &'static str, expected: &str, actual: &str) -> Result<(), FetchError> {
    if expected.is_empty() || actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }
    Err(FetchError::HashMismatch {
        store_path: path.to_string(),
        what,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// Unpack a NAR stream into a fresh staging directory under `out_root`.
///
/// The stream is read to its end so hashes taken over it are complete.
/// The staging directory is removed when dropped.
fn stage(path: &str, nar: &mut dyn Read, out_root: &Path) -> Result<TempDir, FetchError> {
    let name = store_path::basename(path);

    fs::create_dir_all(out_root).map_err(|e| FetchError::unpack(path, e))?;
    let staging = tempfile::Builder::new()
        .prefix(&format!(".{}.", name))
        .tempdir_in(out_root)
        .map_err(|e| FetchError::unpack(path, e))?;

    extract_nar(path, &mut *nar, &staging.path().join(name))?;
    io::copy(nar, &mut io::sink()).map_err(|e| FetchError::unpack(path, e))?;

    Ok(staging)
}

/// Relocate a staged tree and move it into place.
fn install(
    path: &str,
    staging: TempDir,
    out_root: &Path,
    references: &[String],
    tools: &Tools,
) -> Result<Outcome, FetchError> {
    let name = store_path::basename(path);
    let dest = out_root.join(name);
    let tree = staging.path().join(name);

    let summary = relocate(&tree, &dest, references, out_root, tools);

    // Drop a codegen placeholder so the rename can land.
    if dest.is_dir() && !is_materialized(&dest) {
        let _ = fs::remove_dir_all(&dest);
    }

    match fs::rename(&tree, &dest) {
        Ok(()) => {
            tracing::debug!("unpacked {}", name);
            Ok(Outcome::Unpacked {
                patched: summary.patched,
            })
        }
        Err(_) if is_materialized(&dest) => {
            tracing::debug!("{} was materialized concurrently", name);
            Ok(Outcome::Skipped)
        }
        Err(e) => Err(FetchError::unpack(path, e)),
    }
}

/// Write the entries of a NAR stream under `dest`, which must not exist.
fn extract_nar(path: &str, nar: impl Read, dest: &Path) -> Result<(), FetchError> {
    let mut reader = NarReader::new(nar);

    while let Some(entry) = reader.next_entry().map_err(|e| FetchError::unpack(path, e))? {
        let target: PathBuf = if entry.path.as_os_str().is_empty() {
            dest.to_path_buf()
        } else {
            dest.join(&entry.path)
        };
        let io_err = |e: std::io::Error| {
            FetchError::unpack(path, format!("{}: {}", target.display(), e))
        };

        match entry.kind {
            EntryKind::Directory => {
                fs::create_dir(&target).map_err(io_err)?;
                set_mode(&target, 0o755).map_err(io_err)?;
            }
            EntryKind::File { executable, .. } => {
                let mut file = fs::File::create(&target).map_err(io_err)?;
                reader
                    .copy_contents(&mut file)
                    .map_err(|e| FetchError::unpack(path, e))?;
                drop(file);
                set_mode(&target, if executable { 0o755 } else { 0o644 }).map_err(io_err)?;
            }
            EntryKind::Symlink { target: link } => {
                symlink(Path::new(&link), &target).map_err(io_err)?;
            }
        }
    }

    Ok(())
}
