use colored::Colorize;
use reconcile::{ApplyOutcome, CheckOutcome, Observer};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Outcome Trees
// ============================================================================

/// Render a check outcome as indented lines
///
/// Subtrees that already hold are collapsed unless `expand_all` is set.
pub fn check_lines(outcome: &CheckOutcome, expand_all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    push_check(outcome, 0, expand_all, &mut lines);
    lines
}

fn push_check(outcome: &CheckOutcome, depth: usize, expand_all: bool, lines: &mut Vec<String>) {
    let icon = if outcome.holds() {
        "✓".green()
    } else {
        "✗".red()
    };
    lines.push(format!("{}{icon} {outcome}", "  ".repeat(depth)));

    if outcome.holds() && !expand_all {
        return;
    }
    for child in outcome.children() {
        push_check(child, depth + 1, expand_all, lines);
    }
}

/// Render an apply outcome as indented lines
///
/// Unchanged subtrees are collapsed unless `expand_all` is set.
pub fn apply_lines(outcome: &ApplyOutcome, expand_all: bool) -> Vec<String> {
    let mut lines = Vec::new();
    push_apply(outcome, 0, expand_all, &mut lines);
    lines
}

fn push_apply(outcome: &ApplyOutcome, depth: usize, expand_all: bool, lines: &mut Vec<String>) {
    let icon = if outcome.changed() {
        "→".cyan()
    } else {
        "✓".green()
    };
    lines.push(format!("{}{icon} {outcome}", "  ".repeat(depth)));

    if !outcome.changed() && !expand_all {
        return;
    }
    for child in outcome.children() {
        push_apply(child, depth + 1, expand_all, lines);
    }
}

/// Forwards every finished unit and plan to the log
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_check(&self, outcome: &CheckOutcome) {
        log::info!("{outcome}");
    }

    fn on_apply(&self, outcome: &ApplyOutcome) {
        log::info!("{outcome}");
    }
}

// ============================================================================
// Tests
// ============================================================================
