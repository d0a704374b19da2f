//! Execution capability
//!
//! A [`Host`] is the only way units touch the outside world: `run` a shell
//! command and `put` a local file at a remote path. The reconciliation core
//! never opens connections itself.

use log::debug;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// How `Host::run` treats a failing command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Fail on a non-zero exit status (otherwise return captured stdout)
    pub check: bool,
    /// Surface "No such file or directory" as [`Error::MissingPath`]
    pub report_missing: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            check: true,
            report_missing: false,
        }
    }
}

impl RunOptions {
    /// Never fail on exit status, just return stdout
    pub fn unchecked() -> Self {
        Self {
            check: false,
            report_missing: false,
        }
    }

    /// Fail on exit status, distinguishing missing paths
    pub fn report_missing() -> Self {
        Self {
            check: true,
            report_missing: true,
        }
    }
}

/// Command runner and file transfer surface for one target host
///
/// Implementations represent a single logical session; concurrent callers
/// may be serialized underneath.
pub trait Host: Send + Sync {
    /// Name used in logs and reports
    fn name(&self) -> String;

    /// Run a shell command and return its captured stdout
    fn run(&self, command: &str, opts: RunOptions) -> Result<String>;

    /// Copy a local file to `remote_path`, overwriting it
    fn put(&self, remote_path: &str, local_path: &Path) -> Result<()>;
}

/// Marker printed by coreutils/findutils when an operand does not exist
const MISSING_PATH_MARKER: &str = "No such file or directory";

/// Translate a finished process into the `Host::run` contract
pub fn interpret_output(command: &str, output: &Output, opts: RunOptions) -> Result<String> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

    if output.status.success() {
        return Ok(stdout);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if opts.report_missing && stderr.contains(MISSING_PATH_MARKER) {
        return Err(Error::MissingPath {
            command: command.to_string(),
        });
    }

    if !opts.check {
        return Ok(stdout);
    }

    Err(Error::Command {
        command: command.to_string(),
        status: output.status.to_string(),
        stderr: stderr.trim().to_string(),
    })
}

/// Quote a value for interpolation into a POSIX shell command
pub fn shell_quote(input: &str) -> String {
    if !input.is_empty()
        && input
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '+'))
    {
        return input.to_string();
    }
    let mut escaped = String::from("'");
    for ch in input.chars() {
        if ch == '\'' {
            escaped.push_str("'\"'\"'");
        } else {
            escaped.push(ch);
        }
    }
    escaped.push('\'');
    escaped
}

/// The machine this process runs on
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl Host for LocalHost {
    fn name(&self) -> String {
        "localhost".to_string()
    }

    fn run(&self, command: &str, opts: RunOptions) -> Result<String> {
        debug!("[localhost] $ {command}");
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|e| Error::io("sh", e))?;
        interpret_output(command, &output, opts)
    }

    fn put(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        debug!("[localhost] put {} -> {remote_path}", local_path.display());
        fs::copy(local_path, remote_path).map_err(|e| Error::io(local_path, e))?;
        Ok(())
    }
}
