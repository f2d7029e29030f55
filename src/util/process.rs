//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;

use anyhow::{bail, Context, Result};

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        cmd.output()
            .with_context(|| format!("failed to run `{}`", self.program.display()))
    }

    /// Run the command as a filter: `input` is copied to its stdin while
    /// `consume` reads its stdout.
    ///
    /// Neither side is buffered whole. Whatever `consume` leaves unread is
    /// drained so the command can finish. The outer result fails when
    /// `input` could not be read or the command did not exit successfully;
    /// otherwise it carries what `consume` returned.
    pub fn exec_piped<T, E>(
        &self,
        input: &mut (dyn Read + Send),
        consume: impl FnOnce(&mut dyn Read) -> std::result::Result<T, E>,
    ) -> Result<std::result::Result<T, E>> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let (Some(mut stdin), Some(mut stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            bail!("failed to open pipes to `{}`", self.program.display());
        };

        let (consumed, fed, errors, status) = thread::scope(|scope| {
            // Dropping `stdin` at the end of the copy closes the pipe.
            let writer = scope.spawn(move || io::copy(input, &mut stdin));
            let reader = scope.spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            });

            let consumed = consume(&mut stdout);
            let _ = io::copy(&mut stdout, &mut io::sink());
            drop(stdout);

            let status = child.wait();
            (consumed, writer.join(), reader.join(), status)
        });

        match fed {
            Ok(Ok(_)) => {}
            // The command exiting early closes the pipe; its status says why.
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => {
                return Err(e)
                    .with_context(|| format!("failed to feed `{}`", self.program.display()))
            }
            Err(_) => bail!("stdin writer for `{}` panicked", self.program.display()),
        }

        let status =
            status.with_context(|| format!("failed to wait for `{}`", self.program.display()))?;
        if !status.success() {
            let stderr = errors.unwrap_or_default();
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                status.code(),
                stderr.trim_end()
            );
        }

        Ok(consumed)
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                stderr.trim_end()
            );
        }
        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find an external tool, preferring an explicitly configured path.
///
/// A configured path that does not exist falls back to a PATH lookup of
/// the configured value, then of `name`.
pub fn find_tool(configured: Option<&Path>, name: &str) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        if let Some(found) = find_executable(&path.to_string_lossy()) {
            return Some(found);
        }
        tracing::debug!("configured {} at {} not found", name, path.display());
    }
    find_executable(name)
}
