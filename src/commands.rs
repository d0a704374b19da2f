//! `check` and `apply`

use anyhow::{Context as AnyhowContext, Result, bail};
use dialoguer::Confirm;
use reconcile::{ExecuteOptions, ExecutionPlan, Host, LocalHost, Node, Scheduler};
use serde::Serialize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::{ApplyArgs, RunArgs};
use crate::config::{self, DesiredState};
use crate::ssh::SshHost;
use crate::ui::{self, LogObserver};

/// Everything needed to run one invocation
struct Session {
    host: Box<dyn Host>,
    local: bool,
    plan: ExecutionPlan,
    scheduler: Scheduler,
}

/// Pick the transport for a target name
fn connect(target: &str) -> (Box<dyn Host>, bool) {
    if target == config::LOCAL_TARGET || target == "localhost" {
        (Box::new(LocalHost), true)
    } else {
        (Box::new(SshHost::new(target)), false)
    }
}

fn prepare(ctx: &Context, args: &RunArgs) -> Result<Session> {
    let path = config::locate(ctx.file.as_deref())?;
    let state = DesiredState::load(&path)?;

    let target = ctx
        .host
        .clone()
        .unwrap_or_else(|| state.host.target.clone());
    let jobs = ctx
        .jobs
        .or(state.host.jobs)
        .unwrap_or(ExecuteOptions::default().jobs);

    let base = base_dir(&path)?;
    let plan = state
        .into_plan(&path.display().to_string(), &base)?
        .filter_by_target(args.target.as_deref());
    let scheduler = Scheduler::new(&ExecuteOptions { jobs })?;
    let (host, local) = connect(&target);

    log::debug!("desired state {} on {} ({jobs} jobs)", path.display(), host.name());

    Ok(Session {
        host,
        local,
        plan,
        scheduler,
    })
}

/// Directory relative local paths are resolved against
fn base_dir(path: &Path) -> Result<PathBuf> {
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    if parent.as_os_str().is_empty() {
        std::env::current_dir().context("Could not determine working directory")
    } else {
        Ok(parent.to_path_buf())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Check Command
// ============================================================================

pub fn check(ctx: &Context, args: &RunArgs) -> Result<()> {
    let session = prepare(ctx, args)?;
    let outcome = session.scheduler.check(
        &Node::Plan(session.plan),
        session.host.as_ref(),
        &LogObserver,
    )?;

    if args.json {
        print_json(&outcome)?;
    } else if !ctx.quiet {
        ui::header(&format!("Check {}", session.host.name()));
        for line in ui::check_lines(&outcome, ctx.verbose > 0) {
            println!("{line}");
        }
        println!();
    }

    if outcome.holds() {
        if !args.json && !ctx.quiet {
            ui::success("Desired state holds");
        }
        Ok(())
    } else {
        bail!("Desired state does not hold on {}", session.host.name())
    }
}

// ============================================================================
// Apply Command
// ============================================================================

pub fn apply(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let session = prepare(ctx, &args.run)?;

    if session.plan.is_empty() {
        if !ctx.quiet {
            ui::warn("Nothing to apply");
        }
        return Ok(());
    }

    if !session.local && !args.yes && !confirm_proceed(session.host.as_ref(), &session.plan)? {
        ui::warn("Aborted");
        return Ok(());
    }

    let outcome = session.scheduler.apply(
        &Node::Plan(session.plan),
        session.host.as_ref(),
        &LogObserver,
    )?;

    if args.run.json {
        return print_json(&outcome);
    }

    if !ctx.quiet {
        ui::header(&format!("Apply {}", session.host.name()));
        for line in ui::apply_lines(&outcome, ctx.verbose > 0) {
            println!("{line}");
        }
        println!();
        if outcome.changed() {
            ui::success("Host converged");
        } else {
            ui::success("Already converged, nothing changed");
        }
    }

    Ok(())
}

/// Confirm with user
fn confirm_proceed(host: &dyn Host, plan: &ExecutionPlan) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        bail!("Refusing to change {} without --yes (stdin is not a terminal)", host.name());
    }

    ui::kv("Host", &host.name());
    ui::kv("Units", &plan.total_nodes().to_string());

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()
        .context("Failed to read confirmation")?;

    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_picks_transport() {
        let (host, local) = connect("local");
        assert!(local);
        assert_eq!(host.name(), "localhost");

        let (host, local) = connect("deploy@web1");
        assert!(!local);
        assert_eq!(host.name(), "deploy@web1");
    }

    #[test]
    fn test_base_dir() {
        assert_eq!(
            base_dir(Path::new("/etc/converge/converge.toml")).unwrap(),
            PathBuf::from("/etc/converge")
        );
        assert_eq!(
            base_dir(Path::new("converge.toml")).unwrap(),
            std::env::current_dir().unwrap()
        );
    }
}
