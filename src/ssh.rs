//! Remote hosts over the system OpenSSH client

use log::debug;
use reconcile::host::interpret_output;
use reconcile::{Error, Host, RunOptions, shell_quote};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// A host reached with `ssh <destination>`
///
/// Authentication, ports and jump hosts come from the user's ssh config
/// and agent. Every command is a separate ssh invocation.
#[derive(Debug, Clone)]
pub struct SshHost {
    destination: String,
}

impl SshHost {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            self.destination.clone(),
            "--".to_string(),
            remote_command.to_string(),
        ]
    }

    fn put_command(remote_path: &str) -> String {
        format!("cat > {}", shell_quote(remote_path))
    }
}

impl Host for SshHost {
    fn name(&self) -> String {
        self.destination.clone()
    }

    fn run(&self, command: &str, opts: RunOptions) -> reconcile::Result<String> {
        debug!("[{}] $ {command}", self.destination);
        let output = Command::new("ssh")
            .args(self.ssh_args(command))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::io("ssh", e))?;
        interpret_output(command, &output, opts)
    }

    fn put(&self, remote_path: &str, local_path: &Path) -> reconcile::Result<()> {
        debug!(
            "[{}] put {} -> {remote_path}",
            self.destination,
            local_path.display()
        );
        let source = File::open(local_path).map_err(|e| Error::io(local_path, e))?;
        let command = Self::put_command(remote_path);
        let output = Command::new("ssh")
            .args(self.ssh_args(&command))
            .stdin(source)
            .output()
            .map_err(|e| Error::io("ssh", e))?;
        interpret_output(&command, &output, RunOptions::default())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_args_keep_command_as_one_argument() {
        let host = SshHost::new("deploy@web1");
        assert_eq!(
            host.ssh_args("ls -d '/srv/my app'"),
            vec!["-o", "BatchMode=yes", "deploy@web1", "--", "ls -d '/srv/my app'"]
        );
        assert_eq!(host.name(), "deploy@web1");
    }

    #[test]
    fn test_put_command_quotes_path() {
        assert_eq!(SshHost::put_command("/srv/app/index.html"), "cat > /srv/app/index.html");
        assert_eq!(SshHost::put_command("/srv/my app/x"), "cat > '/srv/my app/x'");
    }
}
