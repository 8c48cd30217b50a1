//! The git commands a staging session depends on.

use error_set::error_set;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::debug;

error_set! {
    /// Errors from git command execution
    GitCommandError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Invalid UTF-8 in git diff output: {message}")]
        InvalidUtf8 { message: String },
        #[display("Failed to spawn git apply: {message}")]
        ApplySpawnFailed { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Failed to wait for git apply: {message}")]
        ApplyWaitFailed { message: String },
        #[display("git apply rejected the patch: {stderr}")]
        ApplyExitError { stderr: String },
    }
}

/// Diff retrieval and patch application for one repository.
pub trait GitBackend {
    /// Unstaged diff of `file`.
    ///
    /// `plain` requests output free of color codes, suitable for parsing.
    /// Otherwise the output is for display only.
    fn diff(&self, file: &str, plain: bool) -> Result<String, GitCommandError>;

    /// Apply `patch` to the index.
    fn apply_patch(&self, patch: &str) -> Result<(), GitCommandError>;

    /// Whether `file` differs between the index and the working tree.
    fn has_unstaged_changes(&self, file: &str) -> Result<bool, GitCommandError>;
}

/// [`GitBackend`] that shells out to the `git` executable
#[derive(Debug, Clone)]
pub struct GitRepo {
    path: PathBuf,
    context: u32,
}

impl GitRepo {
    /// Create a backend for the repository at `path`, diffing with
    /// `context` lines of unified context.
    pub fn new(path: impl Into<PathBuf>, context: u32) -> Self {
        Self {
            path: path.into(),
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.path);
        cmd
    }

    fn run_diff(&self, args: &[&str], file: &str) -> Result<Output, GitCommandError> {
        self.git()
            .args(["diff", "--no-ext-diff"])
            .args(args)
            .args(["--", file])
            .output()
            .map_err(|e| GitCommandError::DiffFailed {
                message: e.to_string(),
            })
    }
}

impl GitBackend for GitRepo {
    fn diff(&self, file: &str, plain: bool) -> Result<String, GitCommandError> {
        let context = format!("-U{}", self.context);
        let color = if plain { "--no-color" } else { "--color=always" };
        let output = self.run_diff(&[context.as_str(), color], file)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::DiffExitError {
                stderr: stderr.into_owned(),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| GitCommandError::InvalidUtf8 {
            message: e.to_string(),
        })
    }

    fn apply_patch(&self, patch: &str) -> Result<(), GitCommandError> {
        let mut cmd = self.git();
        cmd.args(["apply", "--cached"]);
        if self.context == 0 {
            cmd.arg("--unidiff-zero");
        }

        let mut child = cmd
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| GitCommandError::ApplySpawnFailed {
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(GitCommandError::ApplyStdinFailed)?
            .write_all(patch.as_bytes())
            .map_err(|e| GitCommandError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| GitCommandError::ApplyWaitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitCommandError::ApplyExitError {
                stderr: stderr.trim().to_string(),
            });
        }

        debug!(bytes = patch.len(), "git:apply --cached");
        Ok(())
    }

    fn has_unstaged_changes(&self, file: &str) -> Result<bool, GitCommandError> {
        let output = self.run_diff(&["--quiet"], file)?;

        // --quiet exits 1 when there are differences
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(GitCommandError::DiffExitError {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }
}
