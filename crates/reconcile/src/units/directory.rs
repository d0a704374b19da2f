//! Directory units

use super::{dir_exists, path_exists};
use crate::error::Result;
use crate::host::{Host, RunOptions, shell_quote};
use crate::unit::Unit;

/// A directory exists at the path (parents included)
///
/// A regular file at the path does not count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPresent {
    pub path: String,
}

impl DirectoryPresent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Unit for DirectoryPresent {
    fn unit_type(&self) -> &'static str {
        "directory_present"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        dir_exists(host, &self.path)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        host.run(
            &format!("mkdir -p -- {}", shell_quote(&self.path)),
            RunOptions::default(),
        )?;
        Ok(true)
    }
}

/// Nothing exists at the path
///
/// Removal only deletes directories: empty subdirectories go first,
/// deepest first, and any remaining regular file makes the command fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryAbsent {
    pub path: String,
}

impl DirectoryAbsent {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Unit for DirectoryAbsent {
    fn unit_type(&self) -> &'static str {
        "directory_absent"
    }

    fn id(&self) -> String {
        self.path.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        Ok(!path_exists(host, &self.path)?)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        let command = format!(
            "find {} -depth -type d -exec rmdir {{}} +",
            shell_quote(&self.path)
        );
        host.run(&command, RunOptions::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::RecordingHost;
    use crate::unit::UnitExt;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_directory_present_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b/c").to_string_lossy().into_owned();
        let host = RecordingHost::new();

        let unit = DirectoryPresent::new(&path);
        assert_eq!(unit.check(&host).unwrap(), false);
        assert_eq!(unit.apply(&host).unwrap(), true);
        assert_eq!(unit.apply(&host).unwrap(), false);
        assert!(Path::new(&path).is_dir());
    }

    #[test]
    fn test_directory_present_is_not_satisfied_by_a_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x");
        fs::write(&path, "not a dir").unwrap();

        let unit = DirectoryPresent::new(path.to_string_lossy());
        assert_eq!(unit.check(&RecordingHost::new()).unwrap(), false);
    }

    #[test]
    fn test_directory_absent_removes_nested_empty_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("old");
        fs::create_dir_all(root.join("x/y")).unwrap();
        fs::create_dir_all(root.join("z")).unwrap();
        let host = RecordingHost::new();

        let unit = DirectoryAbsent::new(root.to_string_lossy());
        assert_eq!(unit.apply(&host).unwrap(), true);
        assert!(!root.exists());
        assert_eq!(unit.apply(&host).unwrap(), false);
    }

    #[test]
    fn test_directory_absent_refuses_files() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("keep");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("data"), "important").unwrap();

        let err = DirectoryAbsent::new(root.to_string_lossy())
            .apply(&RecordingHost::new())
            .unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
        assert!(root.join("data").exists());
    }
}
