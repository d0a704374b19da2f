//! Execution plans - stages of concurrently schedulable nodes

use std::fmt;

use crate::unit::{Composite, Unit};

/// Anything the scheduler can check and apply
pub enum Node {
    /// A single unit
    Unit(Box<dyn Unit>),
    /// A nested plan
    Plan(ExecutionPlan),
    /// A unit that expands into a plan at run time
    Composite(Box<dyn Composite>),
}

impl Node {
    pub fn unit(unit: impl Unit + 'static) -> Self {
        Self::Unit(Box::new(unit))
    }

    pub fn composite(composite: impl Composite + 'static) -> Self {
        Self::Composite(Box::new(composite))
    }

    pub fn description(&self) -> String {
        match self {
            Self::Unit(unit) => unit.description(),
            Self::Plan(plan) => plan.name().to_string(),
            Self::Composite(composite) => composite.description(),
        }
    }

    /// Type category used by target filters
    pub fn node_type(&self) -> &'static str {
        match self {
            Self::Unit(unit) => unit.unit_type(),
            Self::Plan(_) => "plan",
            Self::Composite(composite) => composite.unit_type(),
        }
    }

    fn id(&self) -> String {
        match self {
            Self::Unit(unit) => unit.id(),
            Self::Plan(plan) => plan.name().to_string(),
            Self::Composite(composite) => composite.id(),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(unit) => fmt::Debug::fmt(unit, f),
            Self::Plan(plan) => fmt::Debug::fmt(plan, f),
            Self::Composite(composite) => fmt::Debug::fmt(composite, f),
        }
    }
}

impl From<ExecutionPlan> for Node {
    fn from(plan: ExecutionPlan) -> Self {
        Self::Plan(plan)
    }
}

/// A sequence of stages
///
/// Stages run strictly in order. Nodes inside one stage run concurrently
/// and carry no ordering guarantee among themselves.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    name: String,
    stages: Vec<Vec<Node>>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// A plan with a single stage, all members concurrent
    pub fn concurrent(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self::new(name).stage(nodes)
    }

    /// Append a stage
    pub fn stage(mut self, nodes: Vec<Node>) -> Self {
        self.push_stage(nodes);
        self
    }

    pub fn push_stage(&mut self, nodes: Vec<Node>) {
        self.stages.push(nodes);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stages(&self) -> &[Vec<Node>] {
        &self.stages
    }

    /// Descriptions of every node, stage by stage
    pub fn describe(&self) -> Vec<Vec<String>> {
        self.stages
            .iter()
            .map(|stage| stage.iter().map(Node::description).collect())
            .collect()
    }

    /// Number of nodes across all stages, counting nested plans recursively
    pub fn total_nodes(&self) -> usize {
        self.stages
            .iter()
            .flatten()
            .map(|node| match node {
                Node::Plan(plan) => plan.total_nodes(),
                _ => 1,
            })
            .sum()
    }

    /// Check if no stage contains anything to run
    pub fn is_empty(&self) -> bool {
        self.total_nodes() == 0
    }

    /// Keep only nodes matching a predicate, recursing into nested plans
    ///
    /// Stage boundaries are preserved even when a stage becomes empty.
    pub fn filter<F>(self, predicate: &F) -> Self
    where
        F: Fn(&Node) -> bool,
    {
        let stages = self
            .stages
            .into_iter()
            .map(|stage| {
                stage
                    .into_iter()
                    .filter_map(|node| match node {
                        Node::Plan(plan) => Some(Node::Plan(plan.filter(predicate))),
                        other if predicate(&other) => Some(other),
                        _ => None,
                    })
                    .collect()
            })
            .collect();

        Self {
            name: self.name,
            stages,
        }
    }

    /// Keep only nodes matching a target pattern
    ///
    /// Target format: "type" or "type:id-fragment"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (node_type, fragment) = parse_target(t);
                self.filter(&|node: &Node| {
                    matches_filter(node, node_type.as_deref(), fragment.as_deref())
                })
            }
        }
    }
}

/// Parse a target string like "type:fragment" into (type, fragment)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once(':') {
        Some((node_type, fragment)) if !node_type.is_empty() => {
            (Some(node_type.to_string()), Some(fragment.to_string()))
        }
        Some((_, fragment)) => (None, Some(fragment.to_string())),
        None => (Some(target.to_string()), None),
    }
}

/// Check if a node matches the filter criteria
fn matches_filter(node: &Node, node_type: Option<&str>, fragment: Option<&str>) -> bool {
    if let Some(nt) = node_type {
        // Allow family aliases
        let matches_type = match nt {
            "files" => node.node_type().starts_with("file_"),
            "dirs" | "directories" => node.node_type().starts_with("directory_"),
            "packages" | "apt" => node.node_type().starts_with("apt_"),
            _ => node.node_type() == nt,
        };
        if !matches_type {
            return false;
        }
    }

    if let Some(f) = fragment
        && !node.id().contains(f)
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{AptPresent, DirectoryPresent, FilePresent};

    fn sample() -> ExecutionPlan {
        ExecutionPlan::new("root")
            .stage(vec![
                Node::unit(DirectoryPresent::new("/srv/app")),
                Node::unit(AptPresent::new("nginx")),
            ])
            .stage(vec![Node::Plan(ExecutionPlan::concurrent(
                "inner",
                vec![Node::unit(FilePresent::new("/srv/app/ready"))],
            ))])
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("apt"), (Some("apt".to_string()), None));
        assert_eq!(
            parse_target("file_present:/srv"),
            (Some("file_present".to_string()), Some("/srv".to_string()))
        );
        assert_eq!(parse_target(":/srv"), (None, Some("/srv".to_string())));
    }

    #[test]
    fn test_describe_and_count() {
        let plan = sample();
        assert_eq!(
            plan.describe(),
            vec![
                vec![
                    "directory_present /srv/app".to_string(),
                    "apt_present nginx".to_string()
                ],
                vec!["inner".to_string()],
            ]
        );
        assert_eq!(plan.total_nodes(), 3);
        assert!(!plan.is_empty());
        assert!(ExecutionPlan::new("empty").stage(vec![]).stage(vec![]).is_empty());
    }

    #[test]
    fn test_filter_by_target_keeps_stages() {
        let plan = sample().filter_by_target(Some("files"));
        assert_eq!(plan.stages().len(), 2);
        assert!(plan.stages()[0].is_empty());
        assert_eq!(plan.total_nodes(), 1);

        let plan = sample().filter_by_target(Some(":nginx"));
        assert_eq!(plan.describe()[0], vec!["apt_present nginx".to_string()]);
        assert_eq!(plan.total_nodes(), 1);
    }
}
