use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(version)]
#[command(about = "Check and apply a declared desired state on a host", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Desired state file (default: ./converge.toml, then the user config dir)
    #[arg(short, long, global = true, env = "CONVERGE_FILE")]
    pub file: Option<PathBuf>,

    /// Host to reconcile: "local" or an ssh destination (overrides the file)
    #[arg(long, global = true, env = "CONVERGE_HOST")]
    pub host: Option<String>,

    /// Number of units run concurrently within a stage
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report whether the desired state holds, without changing anything
    Check(RunArgs),

    /// Change the host until the desired state holds
    Apply(ApplyArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Only run matching units: "type" or "type:id-fragment" (files, dirs, apt)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Print the outcome tree as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from([
            "converge", "-vv", "--host", "deploy@web1", "apply", "--yes", "-t", "dirs",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.host.as_deref(), Some("deploy@web1"));
        match cli.command {
            Command::Apply(args) => {
                assert!(args.yes);
                assert_eq!(args.run.target.as_deref(), Some("dirs"));
                assert!(!args.run.json);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_parse_check_with_globals_after_subcommand() {
        let cli = Cli::parse_from(["converge", "check", "--json", "-j", "8", "-f", "site.toml"]);
        assert_eq!(cli.jobs, Some(8));
        assert_eq!(cli.file, Some(PathBuf::from("site.toml")));
        assert!(matches!(cli.command, Command::Check(RunArgs { json: true, .. })));
    }
}
