//! Concrete reconciliation units
//!
//! Files and directories on the target host, plus Debian packages. Every
//! path is shell-quoted before it reaches a command line.

use crate::error::Result;
use crate::host::{Host, RunOptions, shell_quote};

pub mod apt;
pub mod directory;
pub mod file;

pub use apt::{AptAbsent, AptPresent, AptUpgraded, Upgradable};
pub use directory::{DirectoryAbsent, DirectoryPresent};
pub use file::{FileAbsent, FileContent, FileCopy, FileHash, FilePresent};

/// Whether anything exists at `path` on the host
fn path_exists(host: &dyn Host, path: &str) -> Result<bool> {
    let command = format!("ls -d -- {}", shell_quote(path));
    Ok(!host.run(&command, RunOptions::unchecked())?.is_empty())
}

/// Whether a directory exists at `path` on the host
fn dir_exists(host: &dyn Host, path: &str) -> Result<bool> {
    let command = format!("if [ -d {} ]; then echo dir; fi", shell_quote(path));
    Ok(!host.run(&command, RunOptions::default())?.trim().is_empty())
}
