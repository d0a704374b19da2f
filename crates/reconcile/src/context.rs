//! Observer hooks for scheduler runs
//!
//! The scheduler reports every outcome through an [`Observer`] instead of
//! logging on its own, so the core stays free of side effects unless the
//! caller asks for them.

use crate::outcome::{ApplyOutcome, CheckOutcome};

/// Receives outcomes as the scheduler produces them
///
/// Called once per unit outcome and once per plan outcome. Calls may come
/// from several worker threads at once.
pub trait Observer: Sync {
    fn on_check(&self, outcome: &CheckOutcome);

    fn on_apply(&self, outcome: &ApplyOutcome);
}

/// Observer that ignores everything
pub struct NoObserver;

impl Observer for NoObserver {
    fn on_check(&self, _outcome: &CheckOutcome) {}
    fn on_apply(&self, _outcome: &ApplyOutcome) {}
}
