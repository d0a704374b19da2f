//! # Reconcile
//!
//! Idempotent reconciliation of a host against a declared desired state.
//!
//! Every piece of desired state is a [`Unit`] that can *inspect* whether it
//! already holds and *mutate* the host when it does not. The engine derives
//! `check`/`apply` from those two operations, so an action whose effect is
//! already present is never executed again.
//!
//! ## Core Concepts
//!
//! - **Unit**: one assertion about the host (file copy, directory, package)
//! - **CheckOutcome / ApplyOutcome**: nested results, reduced with AND / OR
//! - **ExecutionPlan**: stages run in sequence, members of a stage run concurrently
//! - **Scheduler**: walks a plan tree against a [`Host`]
//! - **DirectoryCopy**: diffs a local tree against a remote one and expands
//!   into a creation plan and a removal plan
//!
//! ## Example
//!
//! ```no_run
//! use reconcile::{
//!     DirectoryCopy, DirectoryPresent, ExecuteOptions, ExecutionPlan, LocalHost, Node,
//!     NoObserver, Scheduler,
//! };
//!
//! let plan = ExecutionPlan::new("site")
//!     .stage(vec![Node::unit(DirectoryPresent::new("/srv/www"))])
//!     .stage(vec![Node::composite(DirectoryCopy::new("/srv/www", "./public"))]);
//!
//! let scheduler = Scheduler::new(&ExecuteOptions::default())?;
//! let outcome = scheduler.apply(&Node::Plan(plan), &LocalHost, &NoObserver)?;
//! println!("{outcome}");
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! ## Host Capability
//!
//! Units never hold a connection. Every `inspect`/`mutate` call receives the
//! [`Host`] it must act on, which lets the scheduler fan out concurrent calls
//! against one or many hosts. [`LocalHost`] runs commands through `sh`; other
//! transports implement the same two operations (`run` and `put`).

pub mod aggregate;
pub mod context;
pub mod error;
pub mod fingerprint;
pub mod host;
pub mod outcome;
pub mod plan;
pub mod scheduler;
pub mod sync;
pub mod unit;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types at crate root
pub use aggregate::{all_true, any_true};
pub use context::{NoObserver, Observer};
pub use error::{Error, Result};
pub use host::{Host, LocalHost, RunOptions, shell_quote};
pub use outcome::{ApplyOutcome, CheckOutcome, Nested, Truth};
pub use plan::{ExecutionPlan, Node};
pub use scheduler::{ExecuteOptions, Scheduler};
pub use sync::{DirectoryCopy, SyncPlans};
pub use unit::{Composite, Unit, UnitExt};
pub use units::{
    AptAbsent, AptPresent, AptUpgraded, DirectoryAbsent, DirectoryPresent, FileAbsent,
    FileContent, FileCopy, FileHash, FilePresent,
};
