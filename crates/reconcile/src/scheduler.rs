//! Execution scheduler - runs plans stage by stage with rayon
//!
//! Members of a stage are evaluated in parallel and every one of them is
//! allowed to finish before the stage result is inspected. The first
//! failure (in stage order) aborts the plan, so later stages never start.

use log::trace;
use rayon::prelude::*;

use crate::context::Observer;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::outcome::{ApplyOutcome, CheckOutcome, Nested};
use crate::plan::{ExecutionPlan, Node};
use crate::unit::UnitExt;

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of worker threads shared by all stages
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self { jobs: 4 }
    }
}

/// Walks a plan tree against a host
pub struct Scheduler {
    pool: rayon::ThreadPool,
}

impl Scheduler {
    pub fn new(opts: &ExecuteOptions) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(opts.jobs.max(1))
            .build()?;
        Ok(Self { pool })
    }

    /// Report whether the desired state holds, without mutating anything
    pub fn check(
        &self,
        node: &Node,
        host: &dyn Host,
        observer: &dyn Observer,
    ) -> Result<CheckOutcome> {
        self.pool.install(|| check_node(node, host, observer))
    }

    /// Bring the host to the desired state, mutating only what is absent
    pub fn apply(
        &self,
        node: &Node,
        host: &dyn Host,
        observer: &dyn Observer,
    ) -> Result<ApplyOutcome> {
        self.pool.install(|| apply_node(node, host, observer))
    }
}

fn check_node(node: &Node, host: &dyn Host, observer: &dyn Observer) -> Result<CheckOutcome> {
    let outcome = match node {
        Node::Unit(unit) => unit
            .check(host)
            .map_err(|e| e.in_unit(unit.description()))?,
        Node::Plan(plan) => check_plan(plan, host, observer)?,
        Node::Composite(composite) => {
            let plan = composite
                .expand(host)
                .map_err(|e| e.in_unit(composite.description()))?;
            let inner = check_plan(&plan, host, observer)?;
            CheckOutcome::new(composite.description(), inner.into_result())
        }
    };
    observer.on_check(&outcome);
    Ok(outcome)
}

fn apply_node(node: &Node, host: &dyn Host, observer: &dyn Observer) -> Result<ApplyOutcome> {
    let outcome = match node {
        Node::Unit(unit) => unit
            .apply(host)
            .map_err(|e| e.in_unit(unit.description()))?,
        Node::Plan(plan) => apply_plan(plan, host, observer)?,
        Node::Composite(composite) => {
            let plan = composite
                .expand(host)
                .map_err(|e| e.in_unit(composite.description()))?;
            let inner = apply_plan(&plan, host, observer)?;
            ApplyOutcome::new(composite.description(), inner.into_result())
        }
    };
    observer.on_apply(&outcome);
    Ok(outcome)
}

fn check_plan(
    plan: &ExecutionPlan,
    host: &dyn Host,
    observer: &dyn Observer,
) -> Result<CheckOutcome> {
    let mut stages = Vec::with_capacity(plan.stages().len());
    for (index, stage) in plan.stages().iter().enumerate() {
        trace!("{}: checking stage {index} ({} nodes)", plan.name(), stage.len());
        let results: Vec<Result<CheckOutcome>> = stage
            .par_iter()
            .map(|node| check_node(node, host, observer))
            .collect();
        stages.push(Nested::Group(collect_stage(results)?));
    }
    Ok(CheckOutcome::new(plan.name(), Nested::Group(stages)))
}

fn apply_plan(
    plan: &ExecutionPlan,
    host: &dyn Host,
    observer: &dyn Observer,
) -> Result<ApplyOutcome> {
    let mut stages = Vec::with_capacity(plan.stages().len());
    for (index, stage) in plan.stages().iter().enumerate() {
        trace!("{}: applying stage {index} ({} nodes)", plan.name(), stage.len());
        let results: Vec<Result<ApplyOutcome>> = stage
            .par_iter()
            .map(|node| apply_node(node, host, observer))
            .collect();
        stages.push(Nested::Group(collect_stage(results)?));
    }
    Ok(ApplyOutcome::new(plan.name(), Nested::Group(stages)))
}

/// Wrap a finished stage, failing with its first error
fn collect_stage<T>(results: Vec<Result<T>>) -> Result<Vec<Nested<T>>> {
    let mut items = Vec::with_capacity(results.len());
    for result in results {
        items.push(Nested::Item(Box::new(result?)));
    }
    Ok(items)
}
