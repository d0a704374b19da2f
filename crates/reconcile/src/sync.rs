//! Directory synchronization
//!
//! [`DirectoryCopy`] makes a remote tree mirror a local one. It never
//! mutates anything itself: each run it lists the remote tree (one round
//! trip for file fingerprints, one for directories), walks the local tree,
//! and expands into two plans built from simpler units.
//!
//! - creation: `[directories to create]` then `[files to copy]`
//! - removal: `[files to remove]` then `[directories to remove]`
//!
//! The two plans are independent of each other and run concurrently,
//! unless a path changes type between file and directory. Removal then
//! runs to completion before creation starts.
//! Work already satisfied by the listing (an existing directory, a file
//! with a matching fingerprint) is left out, so identical trees expand
//! to empty plans.

use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::fingerprint::{fingerprint_file, parse_sha256sum_line};
use crate::host::{Host, RunOptions, shell_quote};
use crate::plan::{ExecutionPlan, Node};
use crate::unit::Composite;
use crate::units::{DirectoryAbsent, DirectoryPresent, FileAbsent, FileCopy};

/// The two plans a directory copy expands into
#[derive(Debug)]
pub struct SyncPlans {
    /// Stage 1 creates directories, stage 2 copies files
    pub creation: ExecutionPlan,
    /// Stage 1 removes files, stage 2 removes directories
    pub removal: ExecutionPlan,
    /// Remote paths that are a file on one side and a directory on the other
    pub type_changes: BTreeSet<String>,
}

/// The remote directory holds exactly the local tree
///
/// Same directories, same regular files, same content. Symbolic links and
/// permission bits are not considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryCopy {
    pub remote_path: String,
    pub local_path: PathBuf,
}

impl DirectoryCopy {
    pub fn new(remote_path: impl Into<String>, local_path: impl AsRef<Path>) -> Self {
        let remote_path = remote_path.into();
        let trimmed = remote_path.trim_end_matches('/');
        let remote_path = if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        };
        Self {
            remote_path,
            local_path: local_path.as_ref().to_path_buf(),
        }
    }

    /// Fingerprint of every regular file under the remote root
    ///
    /// A missing remote root yields an empty map.
    pub fn remote_files(&self, host: &dyn Host) -> Result<BTreeMap<String, String>> {
        let command = format!(
            "find {} -type f -exec sha256sum {{}} +",
            shell_quote(&self.remote_path)
        );
        let output = match host.run(&command, RunOptions::report_missing()) {
            Ok(output) => output,
            Err(e) if e.is_missing_path() => return Ok(BTreeMap::new()),
            Err(e) => return Err(e),
        };
        Ok(parse_fingerprints(&output))
    }

    /// Every directory under the remote root, the root included
    ///
    /// A missing remote root yields an empty set.
    pub fn remote_dirs(&self, host: &dyn Host) -> Result<BTreeSet<String>> {
        let command = format!("find {} -type d -print0", shell_quote(&self.remote_path));
        let output = match host.run(&command, RunOptions::report_missing()) {
            Ok(output) => output,
            Err(e) if e.is_missing_path() => return Ok(BTreeSet::new()),
            Err(e) => return Err(e),
        };
        Ok(output
            .split('\0')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Remote path corresponding to a path inside the local root
    pub fn remote_for(&self, local: &Path) -> Result<String> {
        let relative = local
            .strip_prefix(&self.local_path)
            .map_err(|_| Error::PathPrefix {
                path: local.display().to_string(),
                root: self.local_path.display().to_string(),
            })?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Ok(join_remote(&self.remote_path, &relative))
    }

    /// Local path corresponding to a path inside the remote root
    pub fn local_for(&self, remote: &str) -> Result<PathBuf> {
        let prefix_error = || Error::PathPrefix {
            path: remote.to_string(),
            root: self.remote_path.clone(),
        };
        let rest = remote
            .strip_prefix(self.remote_path.as_str())
            .ok_or_else(prefix_error)?;
        // "/srv/application" is not under "/srv/app"
        if !rest.is_empty() && !rest.starts_with('/') && self.remote_path != "/" {
            return Err(prefix_error());
        }
        let relative = rest.trim_start_matches('/');
        if relative.is_empty() {
            Ok(self.local_path.clone())
        } else {
            Ok(self.local_path.join(relative))
        }
    }

    /// Diff the local tree against the host and build both plans
    pub fn plans(&self, host: &dyn Host) -> Result<SyncPlans> {
        let remote_files = self.remote_files(host)?;
        let remote_dirs = self.remote_dirs(host)?;
        debug!(
            "{}: remote has {} files, {} directories",
            self.remote_path,
            remote_files.len(),
            remote_dirs.len()
        );

        let mut dirs_to_create = Vec::new();
        let mut files_to_copy = Vec::new();
        let mut local_dirs = BTreeSet::from([self.local_path.clone()]);
        let mut local_files = BTreeSet::new();
        let mut type_changes = BTreeSet::new();

        if !remote_dirs.contains(&self.remote_path) {
            dirs_to_create.push(Node::unit(DirectoryPresent::new(self.remote_path.as_str())));
        }

        let walker = WalkDir::new(&self.local_path)
            .min_depth(1)
            .sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .map_or_else(|| self.local_path.clone(), Path::to_path_buf);
                Error::io(path, e.into())
            })?;
            let local = entry.path();
            let remote = self.remote_for(local)?;
            let file_type = entry.file_type();

            if file_type.is_dir() {
                local_dirs.insert(local.to_path_buf());
                if remote_files.contains_key(&remote) {
                    type_changes.insert(remote.clone());
                }
                if !remote_dirs.contains(&remote) {
                    dirs_to_create.push(Node::unit(DirectoryPresent::new(remote)));
                }
            } else if file_type.is_file() {
                local_files.insert(local.to_path_buf());
                if remote_dirs.contains(&remote) {
                    type_changes.insert(remote.clone());
                }
                let known = remote_files.get(&remote).cloned();
                if known.as_deref() != Some(fingerprint_file(local)?.as_str()) {
                    files_to_copy.push(Node::unit(
                        FileCopy::new(remote, local).with_remote_fingerprint(known),
                    ));
                }
            } else {
                trace!("skipping non-regular file {}", local.display());
            }
        }

        let mut files_to_remove = Vec::new();
        for remote in remote_files.keys() {
            if !local_files.contains(&self.local_for(remote)?) {
                files_to_remove.push(Node::unit(FileAbsent::new(remote.as_str())));
            }
        }

        let mut stale_dirs = BTreeSet::new();
        for remote in &remote_dirs {
            if !local_dirs.contains(&self.local_for(remote)?) {
                stale_dirs.insert(remote.as_str());
            }
        }
        // Removing a directory takes its empty subdirectories with it
        let dirs_to_remove: Vec<Node> = stale_dirs
            .iter()
            .filter(|dir| !parent_remote(dir).is_some_and(|parent| stale_dirs.contains(parent)))
            .map(|dir| Node::unit(DirectoryAbsent::new(*dir)))
            .collect();

        let creation = ExecutionPlan::new(format!("create {}", self.remote_path))
            .stage(dirs_to_create)
            .stage(files_to_copy);
        let removal = ExecutionPlan::new(format!("remove {}", self.remote_path))
            .stage(files_to_remove)
            .stage(dirs_to_remove);
        trace!("creation plan: {:?}", creation.describe());
        trace!("removal plan: {:?}", removal.describe());

        Ok(SyncPlans {
            creation,
            removal,
            type_changes,
        })
    }
}

impl Composite for DirectoryCopy {
    fn unit_type(&self) -> &'static str {
        "directory_copy"
    }

    fn id(&self) -> String {
        self.remote_path.clone()
    }

    fn description(&self) -> String {
        format!(
            "directory_copy {} <- {}",
            self.remote_path,
            self.local_path.display()
        )
    }

    fn expand(&self, host: &dyn Host) -> Result<ExecutionPlan> {
        let SyncPlans {
            creation,
            removal,
            type_changes,
        } = self.plans(host)?;
        if type_changes.is_empty() {
            return Ok(ExecutionPlan::concurrent(
                self.description(),
                vec![Node::Plan(creation), Node::Plan(removal)],
            ));
        }
        // The old entry has to be gone before the new one can take its path
        debug!(
            "{}: {} paths change type, removing before creating",
            self.remote_path,
            type_changes.len()
        );
        Ok(ExecutionPlan::new(self.description())
            .stage(vec![Node::Plan(removal)])
            .stage(vec![Node::Plan(creation)]))
    }
}

fn join_remote(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        root.to_string()
    } else if root.ends_with('/') {
        format!("{root}{relative}")
    } else {
        format!("{root}/{relative}")
    }
}

fn parent_remote(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Parse `sha256sum` output lines (`<hex>  <path>`) into path -> fingerprint
fn parse_fingerprints(output: &str) -> BTreeMap<String, String> {
    output.lines().filter_map(parse_sha256sum_line).collect()
}
