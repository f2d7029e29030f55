//! Lockfile I/O operations.

use std::path::Path;

use anyhow::Result;

use crate::resolver::Lockfile;
use crate::util::diagnostic::suggestions;

/// Load a lockfile from the given path, or `None` if there is none yet.
pub fn load_lockfile(path: &Path) -> Result<Option<Lockfile>> {
    if !path.exists() {
        return Ok(None);
    }

    let lockfile = Lockfile::load(path)?;
    tracing::debug!(
        "loaded {} repositories, {} packages from {}",
        lockfile.repositories.len(),
        lockfile.packages.len(),
        path.display()
    );
    Ok(Some(lockfile))
}

/// Load a lockfile that must exist.
pub fn require_lockfile(path: &Path) -> Result<Lockfile> {
    match load_lockfile(path)? {
        Some(lockfile) => Ok(lockfile),
        None => anyhow::bail!(
            "lockfile not found: {}\n{}",
            path.display(),
            suggestions::NO_LOCKFILE
        ),
    }
}

/// Save a lockfile atomically.
pub fn save_lockfile(path: &Path, lockfile: &Lockfile) -> Result<()> {
    lockfile.save(path)?;
    tracing::info!(
        "Wrote {} ({} repositories, {} packages)",
        path.display(),
        lockfile.repositories.len(),
        lockfile.packages.len()
    );
    Ok(())
}
