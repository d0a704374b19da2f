//! Check and apply outcomes
//!
//! An outcome keeps the full nested payload it was built from so reports
//! can show exactly which leaves passed. Reduction to a single boolean
//! happens on demand through [`crate::aggregate`].

use serde::Serialize;
use std::fmt;

use crate::aggregate::{all_true, any_true};

/// Anything that reduces to a single boolean
pub trait Truth {
    fn truth(&self) -> bool;
}

impl Truth for bool {
    fn truth(&self) -> bool {
        *self
    }
}

/// A boolean, a group of nested values, or a child outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nested<T> {
    Leaf(bool),
    Group(Vec<Nested<T>>),
    Item(Box<T>),
}

impl<T> Nested<T> {
    /// Child outcomes reachable through groups, in order
    pub fn items(&self) -> Vec<&T> {
        let mut found = Vec::new();
        self.collect_items(&mut found);
        found
    }

    fn collect_items<'a>(&'a self, found: &mut Vec<&'a T>) {
        match self {
            Self::Leaf(_) => {}
            Self::Group(group) => {
                for nested in group {
                    nested.collect_items(found);
                }
            }
            Self::Item(child) => found.push(child),
        }
    }
}

/// Whether the desired state of a unit already holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    unit: String,
    result: Nested<CheckOutcome>,
}

impl CheckOutcome {
    pub fn new(unit: impl Into<String>, result: Nested<CheckOutcome>) -> Self {
        Self {
            unit: unit.into(),
            result,
        }
    }

    pub fn leaf(unit: impl Into<String>, holds: bool) -> Self {
        Self::new(unit, Nested::Leaf(holds))
    }

    /// Description of the unit or plan this outcome belongs to
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn result(&self) -> &Nested<CheckOutcome> {
        &self.result
    }

    /// AND-reduction of the payload
    pub fn holds(&self) -> bool {
        all_true(std::slice::from_ref(&self.result))
    }

    pub fn children(&self) -> Vec<&CheckOutcome> {
        self.result.items()
    }

    pub fn into_result(self) -> Nested<CheckOutcome> {
        self.result
    }
}

impl Truth for CheckOutcome {
    fn truth(&self) -> bool {
        self.holds()
    }
}

impl PartialEq<bool> for CheckOutcome {
    fn eq(&self, other: &bool) -> bool {
        self.result == Nested::Leaf(*other)
    }
}

impl PartialEq<Nested<CheckOutcome>> for CheckOutcome {
    fn eq(&self, other: &Nested<CheckOutcome>) -> bool {
        self.result == *other
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.holds() { "Present" } else { "Absent" };
        write!(f, "{tag} {}", self.unit)
    }
}

/// Whether applying a unit changed anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    unit: String,
    result: Nested<ApplyOutcome>,
}

impl ApplyOutcome {
    pub fn new(unit: impl Into<String>, result: Nested<ApplyOutcome>) -> Self {
        Self {
            unit: unit.into(),
            result,
        }
    }

    pub fn leaf(unit: impl Into<String>, changed: bool) -> Self {
        Self::new(unit, Nested::Leaf(changed))
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn result(&self) -> &Nested<ApplyOutcome> {
        &self.result
    }

    /// OR-reduction of the payload
    pub fn changed(&self) -> bool {
        any_true(std::slice::from_ref(&self.result))
    }

    pub fn children(&self) -> Vec<&ApplyOutcome> {
        self.result.items()
    }

    pub fn into_result(self) -> Nested<ApplyOutcome> {
        self.result
    }
}

impl Truth for ApplyOutcome {
    fn truth(&self) -> bool {
        self.changed()
    }
}

impl PartialEq<bool> for ApplyOutcome {
    fn eq(&self, other: &bool) -> bool {
        self.result == Nested::Leaf(*other)
    }
}

impl PartialEq<Nested<ApplyOutcome>> for ApplyOutcome {
    fn eq(&self, other: &Nested<ApplyOutcome>) -> bool {
        self.result == *other
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.changed() { "Changed" } else { "Unchanged" };
        write!(f, "{tag} {}", self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_leaf() {
        let present = CheckOutcome::leaf("file_present /a", true);
        assert!(present.holds());
        assert_eq!(present, true);
        assert_eq!(present.to_string(), "Present file_present /a");

        let absent = CheckOutcome::leaf("file_present /b", false);
        assert!(!absent.holds());
        assert_eq!(absent.to_string(), "Absent file_present /b");
    }

    #[test]
    fn test_check_nested_reduces_with_and() {
        let outcome = CheckOutcome::new(
            "plan",
            Nested::Group(vec![
                Nested::Item(Box::new(CheckOutcome::leaf("a", true))),
                Nested::Group(vec![Nested::Item(Box::new(CheckOutcome::leaf("b", false)))]),
            ]),
        );
        assert!(!outcome.holds());
        assert_eq!(outcome.children().len(), 2);
        assert_eq!(outcome.children()[1].unit(), "b");
    }

    #[test]
    fn test_equality_compares_payload_not_reduction() {
        // Reduces to true, but the payload is a group rather than a leaf
        let outcome = CheckOutcome::new("plan", Nested::Group(vec![]));
        assert!(outcome.holds());
        assert_ne!(outcome, true);
        assert_eq!(outcome, Nested::Group(vec![]));
    }

    #[test]
    fn test_apply_nested_reduces_with_or() {
        let unchanged = ApplyOutcome::new("plan", Nested::Group(vec![]));
        assert!(!unchanged.changed());
        assert_eq!(unchanged.to_string(), "Unchanged plan");

        let changed = ApplyOutcome::new(
            "plan",
            Nested::Group(vec![
                Nested::Group(vec![Nested::Item(Box::new(ApplyOutcome::leaf("a", false)))]),
                Nested::Group(vec![Nested::Item(Box::new(ApplyOutcome::leaf("b", true)))]),
            ]),
        );
        assert!(changed.changed());
        assert_eq!(changed.to_string(), "Changed plan");
    }
}
