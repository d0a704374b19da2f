//! Test host that records every operation before running it locally

use std::path::Path;
use std::sync::Mutex;

use crate::error::Result;
use crate::host::{Host, LocalHost, RunOptions};

/// Programs that change the host
const WRITE_PROGRAMS: &[&str] = &["touch", "rm", "rmdir", "mkdir", "apt-get"];

/// Whether a command line runs a program that changes the host
///
/// Looks at the program word (after an optional `sudo`) and at what
/// `find -exec` runs, never at arguments.
fn is_write(command: &str) -> bool {
    let words: Vec<&str> = command.split_whitespace().collect();
    let program = match words.as_slice() {
        ["sudo", rest @ ..] => rest.first(),
        all => all.first(),
    };
    let execs = words
        .windows(2)
        .filter(|pair| pair[0] == "-exec")
        .map(|pair| &pair[1]);
    program
        .into_iter()
        .chain(execs)
        .any(|word| WRITE_PROGRAMS.contains(word))
}

#[derive(Default)]
pub(crate) struct RecordingHost {
    commands: Mutex<Vec<String>>,
    puts: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn puts(&self) -> Vec<String> {
        self.puts.lock().unwrap().clone()
    }

    /// Commands and transfers that mutate the host
    pub(crate) fn writes(&self) -> Vec<String> {
        let mut writes: Vec<String> = self
            .commands()
            .into_iter()
            .filter(|command| is_write(command))
            .collect();
        writes.extend(self.puts());
        writes
    }

    pub(crate) fn clear(&self) {
        self.commands.lock().unwrap().clear();
        self.puts.lock().unwrap().clear();
    }
}

impl Host for RecordingHost {
    fn name(&self) -> String {
        "recording".to_string()
    }

    fn run(&self, command: &str, opts: RunOptions) -> Result<String> {
        self.commands.lock().unwrap().push(command.to_string());
        LocalHost.run(command, opts)
    }

    fn put(&self, remote_path: &str, local_path: &Path) -> Result<()> {
        self.puts.lock().unwrap().push(remote_path.to_string());
        LocalHost.put(remote_path, local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_write_matches_programs_not_arguments() {
        assert!(is_write("rm -- /srv/a"));
        assert!(is_write("mkdir -p -- /srv/a"));
        assert!(is_write("sudo apt-get install -y nginx"));
        assert!(is_write("find /srv/old -depth -type d -exec rmdir {} +"));

        assert!(!is_write("ls -d -- '/srv/rm me'"));
        assert!(!is_write("find '/srv/mkdir x' -type f -exec sha256sum {} +"));
        assert!(!is_write("if [ -f /srv/touch ]; then sha256sum -- /srv/touch; fi"));
    }

    #[test]
    fn test_writes_ignore_reads_of_odd_paths() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rm x").to_string_lossy().into_owned();
        let host = RecordingHost::new();

        host.run(&format!("ls -d -- '{path}'"), RunOptions::unchecked()).unwrap();
        assert_eq!(host.commands().len(), 1);
        assert!(host.writes().is_empty());
    }
}
