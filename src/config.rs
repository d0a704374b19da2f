//! Desired state file
//!
//! ```toml
//! [host]
//! target = "deploy@web1"
//! jobs = 4
//!
//! [[stage]]
//! units = [
//!   { type = "directory_present", path = "/srv/app" },
//!   { type = "apt_present", name = "nginx" },
//! ]
//!
//! [[stage]]
//! units = [{ type = "directory_copy", remote = "/srv/app", local = "~/site" }]
//! ```
//!
//! Stages run in order, units inside a stage run concurrently. Paths on
//! the target must be absolute; local paths may use `~` and are relative
//! to this file.

use anyhow::{Context, Result, bail};
use reconcile::{
    AptAbsent, AptPresent, AptUpgraded, DirectoryAbsent, DirectoryCopy, DirectoryPresent,
    ExecutionPlan, FileAbsent, FileContent, FileCopy, FileHash, FilePresent, Node,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name, looked up in the working directory first
pub const FILE_NAME: &str = "converge.toml";

/// Target name that selects the local machine
pub const LOCAL_TARGET: &str = "local";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    Ok(base.join("converge"))
}

/// Resolve which desired state file to load
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return Ok(local);
    }

    let fallback = config_dir()?.join(FILE_NAME);
    if fallback.exists() {
        return Ok(fallback);
    }

    bail!(
        "No desired state file found (looked for ./{FILE_NAME} and {})",
        fallback.display()
    )
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DesiredState {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default, rename = "stage")]
    pub stages: Vec<StageConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    #[serde(default = "default_target")]
    pub target: String,
    #[serde(default)]
    pub jobs: Option<usize>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            jobs: None,
        }
    }
}

fn default_target() -> String {
    LOCAL_TARGET.to_string()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    #[serde(default)]
    pub units: Vec<UnitSpec>,
}

fn default_sudo() -> bool {
    true
}

/// One unit as written in the file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnitSpec {
    FilePresent {
        path: String,
    },
    FileAbsent {
        path: String,
    },
    FileHash {
        path: String,
        fingerprint: String,
    },
    FileCopy {
        remote: String,
        local: String,
    },
    FileContent {
        path: String,
        content: String,
    },
    DirectoryPresent {
        path: String,
    },
    DirectoryAbsent {
        path: String,
    },
    DirectoryCopy {
        remote: String,
        local: String,
    },
    AptPresent {
        name: String,
        #[serde(default = "default_sudo")]
        sudo: bool,
    },
    AptAbsent {
        name: String,
        #[serde(default)]
        purge: bool,
        #[serde(default = "default_sudo")]
        sudo: bool,
    },
    AptUpgraded {
        #[serde(default)]
        names: Vec<String>,
        #[serde(default = "default_sudo")]
        sudo: bool,
    },
}

impl UnitSpec {
    /// Build the schedulable node, resolving local paths against `base`
    pub fn into_node(self, base: &Path) -> Result<Node> {
        let node = match self {
            Self::FilePresent { path } => Node::unit(FilePresent::new(remote_path(path)?)),
            Self::FileAbsent { path } => Node::unit(FileAbsent::new(remote_path(path)?)),
            Self::FileHash { path, fingerprint } => {
                Node::unit(FileHash::new(remote_path(path)?, fingerprint))
            }
            Self::FileCopy { remote, local } => Node::unit(FileCopy::new(
                remote_path(remote)?,
                resolve_local(&local, base)?,
            )),
            Self::FileContent { path, content } => {
                Node::unit(FileContent::new(remote_path(path)?, content))
            }
            Self::DirectoryPresent { path } => {
                Node::unit(DirectoryPresent::new(remote_path(path)?))
            }
            Self::DirectoryAbsent { path } => Node::unit(DirectoryAbsent::new(remote_path(path)?)),
            Self::DirectoryCopy { remote, local } => Node::composite(DirectoryCopy::new(
                remote_path(remote)?,
                resolve_local(&local, base)?,
            )),
            Self::AptPresent { name, sudo } => Node::unit(AptPresent::new(name).with_sudo(sudo)),
            Self::AptAbsent { name, purge, sudo } => Node::unit(
                AptAbsent::new(name)
                    .with_purge(purge)
                    .with_sudo(sudo),
            ),
            Self::AptUpgraded { names, sudo } => {
                Node::unit(AptUpgraded::new(names).with_sudo(sudo))
            }
        };
        Ok(node)
    }
}

/// Paths on the target are passed through as written, so they must be absolute
///
/// Commands quote every path, which keeps the remote shell from expanding `~`.
fn remote_path(path: String) -> Result<String> {
    if !path.starts_with('/') {
        bail!(
            "Remote path '{path}' must be absolute (`~` and relative paths are not expanded on the target)"
        );
    }
    Ok(path)
}

/// Expand `~` and environment variables, then anchor relative paths at `base`
fn resolve_local(path: &str, base: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Could not expand local path '{path}'"))?;
    let expanded = PathBuf::from(expanded.as_ref());
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}

impl DesiredState {
    /// Parse a desired state document
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid desired state format")
    }

    /// Load a desired state file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Build the top-level plan; `base` anchors relative local paths
    pub fn into_plan(self, name: &str, base: &Path) -> Result<ExecutionPlan> {
        let mut plan = ExecutionPlan::new(name);
        for (index, stage) in self.stages.into_iter().enumerate() {
            let nodes = stage
                .units
                .into_iter()
                .map(|spec| spec.into_node(base))
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("In stage {}", index + 1))?;
            plan.push_stage(nodes);
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[host]
target = "deploy@web1"
jobs = 8

[[stage]]
units = [
  { type = "directory_present", path = "/srv/app" },
  { type = "apt_present", name = "nginx" },
  { type = "apt_absent", name = "apache2", purge = true, sudo = false },
]

[[stage]]
units = [
  { type = "directory_copy", remote = "/srv/app", local = "site" },
  { type = "file_content", path = "/etc/motd", content = "hello\n" },
]
"#;

    #[test]
    fn test_parse_sample() {
        let state = DesiredState::parse(SAMPLE).unwrap();
        assert_eq!(state.host.target, "deploy@web1");
        assert_eq!(state.host.jobs, Some(8));
        assert_eq!(state.stages.len(), 2);
        assert_eq!(
            state.stages[0].units[2],
            UnitSpec::AptAbsent {
                name: "apache2".into(),
                purge: true,
                sudo: false,
            }
        );
        assert_eq!(
            state.stages[0].units[1],
            UnitSpec::AptPresent {
                name: "nginx".into(),
                sudo: true,
            }
        );
    }

    #[test]
    fn test_defaults() {
        let state = DesiredState::parse("").unwrap();
        assert_eq!(state.host.target, LOCAL_TARGET);
        assert_eq!(state.host.jobs, None);
        assert!(state.stages.is_empty());
    }

    #[test]
    fn test_unknown_unit_type_is_rejected() {
        let err = DesiredState::parse(
            r#"
[[stage]]
units = [{ type = "service_running", name = "nginx" }]
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("service_running"));
    }

    #[test]
    fn test_into_plan_keeps_stages_and_resolves_local_paths() {
        let base = Path::new("/home/me/deploy");
        let plan = DesiredState::parse(SAMPLE)
            .unwrap()
            .into_plan("converge.toml", base)
            .unwrap();

        assert_eq!(plan.name(), "converge.toml");
        assert_eq!(
            plan.describe(),
            vec![
                vec![
                    "directory_present /srv/app".to_string(),
                    "apt_present nginx".to_string(),
                    "apt_absent apache2".to_string(),
                ],
                vec![
                    "directory_copy /srv/app <- /home/me/deploy/site".to_string(),
                    "file_content /etc/motd".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn test_resolve_local() {
        let base = Path::new("/base");
        assert_eq!(resolve_local("/abs/x", base).unwrap(), PathBuf::from("/abs/x"));
        assert_eq!(resolve_local("rel/x", base).unwrap(), PathBuf::from("/base/rel/x"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_local("~/site", base).unwrap(), home.join("site"));
        }
    }

    #[test]
    fn test_remote_paths_must_be_absolute() {
        assert_eq!(remote_path("/srv/app".into()).unwrap(), "/srv/app");

        for remote in ["~/site", "site", "-rf"] {
            let state = DesiredState::parse(&format!(
                "[[stage]]\nunits = [{{ type = \"directory_copy\", remote = \"{remote}\", local = \"site\" }}]\n"
            ))
            .unwrap();
            let err = state.into_plan("converge.toml", Path::new("/base")).unwrap_err();
            assert!(format!("{err:#}").contains("must be absolute"), "{remote}: {err:#}");
        }
    }

    #[test]
    fn test_load_and_locate_explicit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.toml");
        fs::write(&path, SAMPLE).unwrap();

        assert_eq!(locate(Some(&path)).unwrap(), path);
        let state = DesiredState::load(&path).unwrap();
        assert_eq!(state.stages[1].units.len(), 2);

        let err = DesiredState::load(&tmp.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Could not read"));
    }
}
