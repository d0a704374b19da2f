//! Debian package units (dpkg / apt)

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::error::Result;
use crate::host::{Host, RunOptions, shell_quote};
use crate::unit::Unit;

/// `apt list --upgradeable` line, e.g.
/// `curl/jammy-updates 7.81.0-1ubuntu1.16 amd64 [upgradable from: 7.81.0-1ubuntu1.15]`
static UPGRADABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^/]+)/(\S+)\s+(\S+)\s+(\w+)\s+\[upgradable from:\s+(\S+)\]$").unwrap()
});

fn sudo_prefixed(sudo: bool, command: String) -> String {
    if sudo { format!("sudo {command}") } else { command }
}

/// Whether `dpkg -l` output lists the package as installed
fn dpkg_installed(listing: &str, name: &str) -> bool {
    listing.lines().any(|line| {
        let mut fields = line.split_whitespace();
        let status = fields.next();
        let package = fields.next();
        status == Some("ii")
            && package.is_some_and(|p| p == name || p.strip_suffix(":amd64") == Some(name))
    })
}

fn package_installed(host: &dyn Host, name: &str) -> Result<bool> {
    let listing = host.run(
        &format!("dpkg -l {}", shell_quote(name)),
        RunOptions::unchecked(),
    )?;
    Ok(dpkg_installed(&listing, name))
}

/// A package is installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptPresent {
    pub name: String,
    pub sudo: bool,
}

impl AptPresent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sudo: true,
        }
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }
}

impl Unit for AptPresent {
    fn unit_type(&self) -> &'static str {
        "apt_present"
    }

    fn id(&self) -> String {
        self.name.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        package_installed(host, &self.name)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        let command = format!("apt-get install -y {}", shell_quote(&self.name));
        host.run(&sudo_prefixed(self.sudo, command), RunOptions::default())?;
        Ok(true)
    }
}

/// A package is not installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptAbsent {
    pub name: String,
    pub purge: bool,
    pub sudo: bool,
}

impl AptAbsent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purge: false,
            sudo: true,
        }
    }

    pub fn with_purge(mut self, purge: bool) -> Self {
        self.purge = purge;
        self
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }
}

impl Unit for AptAbsent {
    fn unit_type(&self) -> &'static str {
        "apt_absent"
    }

    fn id(&self) -> String {
        self.name.clone()
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        Ok(!package_installed(host, &self.name)?)
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        let purge = if self.purge { " --purge" } else { "" };
        let command = format!("apt-get remove{purge} -y {}", shell_quote(&self.name));
        host.run(&sudo_prefixed(self.sudo, command), RunOptions::default())?;
        Ok(true)
    }
}

/// A pending upgrade reported by apt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgradable {
    pub source: String,
    pub next_version: String,
    pub arch: String,
    pub version: String,
}

/// Parse `apt list --upgradeable` output into package name -> upgrade
pub fn parse_upgradable(listing: &str) -> BTreeMap<String, Upgradable> {
    listing
        .lines()
        .filter_map(|line| UPGRADABLE_RE.captures(line.trim_end()))
        .map(|caps| {
            (
                caps[1].to_string(),
                Upgradable {
                    source: caps[2].to_string(),
                    next_version: caps[3].to_string(),
                    arch: caps[4].to_string(),
                    version: caps[5].to_string(),
                },
            )
        })
        .collect()
}

/// No upgrade is pending (for the named packages, or for everything)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptUpgraded {
    pub names: Vec<String>,
    pub sudo: bool,
}

impl AptUpgraded {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, sudo: true }
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn quoted_names(&self) -> String {
        self.names
            .iter()
            .map(|name| shell_quote(name))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Pending upgrades, keyed by package name
    pub fn upgradable(&self, host: &dyn Host) -> Result<BTreeMap<String, Upgradable>> {
        let command = format!("apt list --upgradeable {}", self.quoted_names());
        let listing = host.run(command.trim_end(), RunOptions::default())?;
        Ok(parse_upgradable(&listing))
    }
}

impl Unit for AptUpgraded {
    fn unit_type(&self) -> &'static str {
        "apt_upgraded"
    }

    fn id(&self) -> String {
        if self.names.is_empty() {
            "*".to_string()
        } else {
            self.names.join(",")
        }
    }

    fn inspect(&self, host: &dyn Host) -> Result<bool> {
        Ok(self.upgradable(host)?.is_empty())
    }

    fn mutate(&self, host: &dyn Host) -> Result<bool> {
        let command = if self.names.is_empty() {
            "apt-get upgrade -y".to_string()
        } else {
            format!("apt-get install --only-upgrade -y {}", self.quoted_names())
        };
        host.run(&sudo_prefixed(self.sudo, command), RunOptions::default())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DPKG_LISTING: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
||/ Name           Version      Architecture Description
+++-==============-============-============-=================================
ii  nginx          1.18.0-6     all          small, powerful, scalable web server
rc  nginx-common   1.18.0-6     all          small, powerful, scalable web server
ii  libc6:amd64    2.35-0ubuntu amd64        GNU C Library: Shared libraries
";

    #[test]
    fn test_dpkg_installed() {
        assert!(dpkg_installed(DPKG_LISTING, "nginx"));
        assert!(dpkg_installed(DPKG_LISTING, "libc6"));
        // Removed with config files left behind
        assert!(!dpkg_installed(DPKG_LISTING, "nginx-common"));
        assert!(!dpkg_installed(DPKG_LISTING, "ngin"));
        assert!(!dpkg_installed("", "nginx"));
    }

    #[test]
    fn test_parse_upgradable() {
        let listing = "Listing...\n\
curl/jammy-updates 7.81.0-1ubuntu1.16 amd64 [upgradable from: 7.81.0-1ubuntu1.15]\n\
tzdata/jammy-updates,jammy-security 2024a-0ubuntu0.22.04 all [upgradable from: 2023c-0ubuntu0.22.04]\n";

        let upgrades = parse_upgradable(listing);
        assert_eq!(upgrades.len(), 2);
        assert_eq!(
            upgrades["curl"],
            Upgradable {
                source: "jammy-updates".into(),
                next_version: "7.81.0-1ubuntu1.16".into(),
                arch: "amd64".into(),
                version: "7.81.0-1ubuntu1.15".into(),
            }
        );
        assert_eq!(upgrades["tzdata"].arch, "all");
        assert!(parse_upgradable("Listing...\n").is_empty());
    }

    #[test]
    fn test_ids_and_descriptions() {
        assert_eq!(AptPresent::new("nginx").description(), "apt_present nginx");
        assert_eq!(AptUpgraded::new(vec![]).id(), "*");
        assert_eq!(
            AptUpgraded::new(vec!["curl".into(), "git".into()]).id(),
            "curl,git"
        );
    }
}
