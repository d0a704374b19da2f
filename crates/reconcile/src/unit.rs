//! Unit trait for idempotent reconciliation
//!
//! A Unit is one assertion about a host. It knows how to inspect whether
//! the assertion holds and how to make it hold; the engine decides when
//! each of those runs.

use std::fmt;

use crate::error::Result;
use crate::host::Host;
use crate::outcome::{ApplyOutcome, CheckOutcome};
use crate::plan::ExecutionPlan;

/// Core trait for reconciliation units
///
/// # Example
///
/// ```
/// use reconcile::{Host, Result, RunOptions, Unit, shell_quote};
///
/// #[derive(Debug)]
/// struct Marker {
///     path: String,
/// }
///
/// impl Unit for Marker {
///     fn unit_type(&self) -> &'static str {
///         "marker"
///     }
///
///     fn id(&self) -> String {
///         self.path.clone()
///     }
///
///     fn inspect(&self, host: &dyn Host) -> Result<bool> {
///         let command = format!("ls -d -- {}", shell_quote(&self.path));
///         Ok(!host.run(&command, RunOptions::unchecked())?.is_empty())
///     }
///
///     fn mutate(&self, host: &dyn Host) -> Result<bool> {
///         host.run(&format!("touch -- {}", shell_quote(&self.path)), RunOptions::default())?;
///         Ok(true)
///     }
/// }
/// ```
pub trait Unit: Send + Sync + fmt::Debug {
    /// Unit type category (e.g. "file_copy", "directory_present")
    fn unit_type(&self) -> &'static str;

    /// Parameters identifying this unit (usually the target path or package)
    fn id(&self) -> String;

    /// Human-readable identity used in outcomes and errors
    fn description(&self) -> String {
        format!("{} {}", self.unit_type(), self.id())
    }

    /// Whether the desired state already holds
    ///
    /// Must only issue read-oriented commands and be safe to repeat.
    fn inspect(&self, host: &dyn Host) -> Result<bool>;

    /// Perform the minimal action to reach the desired state
    ///
    /// Only called after `inspect` returned false. Returns whether anything
    /// changed.
    fn mutate(&self, host: &dyn Host) -> Result<bool>;
}

/// A unit defined entirely in terms of other units
///
/// The expansion is recomputed from the host on every call and never cached.
pub trait Composite: Send + Sync + fmt::Debug {
    fn unit_type(&self) -> &'static str;

    fn id(&self) -> String;

    fn description(&self) -> String {
        format!("{} {}", self.unit_type(), self.id())
    }

    /// Build the plan that realizes this unit, inspecting the host as needed
    fn expand(&self, host: &dyn Host) -> Result<ExecutionPlan>;
}

/// Check and apply, derived from inspect and mutate
pub trait UnitExt {
    fn check(&self, host: &dyn Host) -> Result<CheckOutcome>;

    /// Mutate only when the check reports the state as absent
    fn apply(&self, host: &dyn Host) -> Result<ApplyOutcome>;
}

impl<U: Unit + ?Sized> UnitExt for U {
    fn check(&self, host: &dyn Host) -> Result<CheckOutcome> {
        Ok(CheckOutcome::leaf(self.description(), self.inspect(host)?))
    }

    fn apply(&self, host: &dyn Host) -> Result<ApplyOutcome> {
        let changed = if self.check(host)?.holds() {
            false
        } else {
            self.mutate(host)?
        };
        Ok(ApplyOutcome::leaf(self.description(), changed))
    }
}
