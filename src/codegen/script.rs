//! The `update_lock.sh` convenience script and the `nix_binary` macro.

/// Quote a word for POSIX sh.
pub fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '@' | '+' | '='))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Script that re-resolves the lockfile from inside `bazel run`.
pub fn update_lock_script(
    repo_name: &str,
    config_name: &str,
    lockfile_name: &str,
    channel: Option<&str>,
) -> String {
    let mut command = format!(
        "exec \"${{NIXBAZEL:-nixbazel}}\" resolve \\\n  --config {} \\\n  --lockfile \"$BUILD_WORKSPACE_DIRECTORY\"/{}",
        shell_quote(config_name),
        shell_quote(lockfile_name)
    );
    if let Some(channel) = channel.filter(|c| !c.is_empty()) {
        command.push_str(&format!(" \\\n  --channel {}", shell_quote(channel)));
    }

    format!(
        r#"#!/usr/bin/env bash
# Generated by nixbazel. Do not edit.
set -euo pipefail

if [ -z "${{BUILD_WORKSPACE_DIRECTORY:-}}" ]; then
  echo "error: BUILD_WORKSPACE_DIRECTORY is not set; run with 'bazel run @{repo}//:update_lock'" >&2
  exit 1
fi

cd "$BUILD_WORKSPACE_DIRECTORY"
{command}
"#,
        repo = repo_name,
        command = command
    )
}

/// Starlark definition of `nix_binary`, loaded by every package file.
pub const NIX_BINARY_BZL: &str = r#"# Generated by nixbazel. Do not edit.
"""Executable wrapper for binaries unpacked from a Nix binary cache."""

def nix_binary(name, src, data = [], references = [], **kwargs):
    """Expose `src` as a runnable target.

    Args:
      name: target name.
      src: the binary, relative to the package.
      data: runtime files, normally the package filegroup.
      references: store path basenames the binary was relocated against.
      **kwargs: passed to sh_binary.
    """
    native.sh_binary(
        name = name,
        srcs = [src],
        data = data,
        env = {"NIX_REFERENCES": " ".join(references)},
        **kwargs
    )
"#;
