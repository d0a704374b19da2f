//! File units

use std::io::Write;
use std::path::{Path, PathBuf};

use super::path_exists;
use crate::error::{Error, Result};
use crate::fingerprint::{fingerprint_bytes, fingerprint_file, parse_sha256sum_line};
use crate::host::{Host, RunOptions, shell_quote};
use crate::unit::Unit;

/// A file exists at the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePresent {
    pub path: String,
}

impl FilePresent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Unit for FilePresent {
    fn unit_type(&self) -> &'static str {
        "file_present"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        path_exists(host, &self.path)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        host.run(&format!("touch -- {}", shell_quote(&self.path)), RunOptions::default())?;
        Ok(true)
    }
}

/// Nothing exists at the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAbsent {
    pub path: String,
}

impl FileAbsent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Unit for FileAbsent {
    fn unit_type(&self) -> &'static str {
        "file_absent"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        Ok(!path_exists(host, &self.path)?)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        host.run(&format!("rm -- {}", shell_quote(&self.path)), RunOptions::default())?;
        Ok(true)
    }
}

/// Fingerprint of the regular file at `path`
///
/// `None` when nothing is there or the path is not a regular file, such as
/// a directory standing where a file is wanted.
pub fn remote_fingerprint(host: &dyn Host, path: &str) -> Result<Option<String>> {
    let quoted = shell_quote(path);
    let command = format!("if [ -f {quoted} ]; then sha256sum -- {quoted}; fi");
    let output = host.run(&command, RunOptions::default())?;
    Ok(output
        .lines()
        .next()
        .and_then(parse_sha256sum_line)
        .map(|(_, fingerprint)| fingerprint))
}

/// The file at the path has the given fingerprint
///
/// This unit can only observe. Pair it with [`FileCopy`] or
/// [`FileContent`] to make the content converge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    pub path: String,
    pub fingerprint: String,
}

impl FileHash {
    pub fn new(path: impl Into<String>, fingerprint: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            fingerprint: fingerprint.into(),
        }
    }
}

impl Unit for FileHash {
    fn unit_type(&self) -> &'static str {
        "file_hash"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn description(&self) -> String {
        format!("file_hash {} = {}", self.path, self.fingerprint)
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        let remote = remote_fingerprint(host, &self.path)?;
        Ok(remote.as_deref() == Some(self.fingerprint.as_str()))
    }

    fn mutate(&self, _host: &dyn Host) -> Result<bool> {
        Err(Error::Unsupported {
            unit: self.description(),
            operation: "mutate",
        })
    }
}

/// The remote file is a copy of a local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCopy {
    pub remote_path: String,
    pub local_path: PathBuf,
    /// Remote fingerprint when already known, saves a round trip on inspect
    pub remote_fingerprint: Option<String>,
}

impl FileCopy {
    pub fn new(remote_path: impl Into<String>, local_path: impl AsRef<Path>) -> Self {
        Self {
            remote_path: remote_path.into(),
            local_path: local_path.as_ref().to_path_buf(),
            remote_fingerprint: None,
        }
    }

    pub fn with_remote_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.remote_fingerprint = fingerprint;
        self
    }
}

impl Unit for FileCopy {
    fn unit_type(&self) -> &'static str {
        "file_copy"
    }

    fn id(&self) -> String {
        self.remote_path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        let local = fingerprint_file(&self.local_path)?;
        match &self.remote_fingerprint {
            Some(remote) => Ok(*remote == local),
            None => FileHash::new(self.remote_path.as_str(), local).inspect(host),
        }
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        host.put(&self.remote_path, &self.local_path)?;
        Ok(true)
    }
}

/// The remote file holds exactly these bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub path: String,
    pub content: Vec<u8>,
}

impl FileContent {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

impl Unit for FileContent {
    fn unit_type(&self) -> &'static str {
        "file_content"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        FileHash::new(self.path.as_str(), fingerprint_bytes(&self.content)).inspect(host)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        let mut staged =
            tempfile::NamedTempFile::new().map_err(|e| Error::io(std::env::temp_dir(), e))?;
        staged
            .write_all(&self.content)
            .and_then(|()| staged.flush())
            .map_err(|e| Error::io(staged.path(), e))?;
        host.put(&self.path, staged.path())?;
        Ok(true)
    }
}
