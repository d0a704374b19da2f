//! Recursive boolean reduction of nested outcomes
//!
//! Checks reduce with AND (every leaf must hold), changes reduce with OR
//! (any leaf changed). Both recurse depth-first and stop at the first
//! deciding leaf. Child outcomes reduce by their own rule via [`Truth`].

use crate::outcome::{Nested, Truth};

/// True iff every leaf is true; an empty sequence is true
pub fn all_true<T: Truth>(items: &[Nested<T>]) -> bool {
    items.iter().all(|item| match item {
        Nested::Leaf(value) => *value,
        Nested::Group(group) => all_true(group),
        Nested::Item(child) => child.truth(),
    })
}

/// True iff any leaf is true; an empty sequence is false
pub fn any_true<T: Truth>(items: &[Nested<T>]) -> bool {
    items.iter().any(|item| match item {
        Nested::Leaf(value) => *value,
        Nested::Group(group) => any_true(group),
        Nested::Item(child) => child.truth(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const T: Nested<bool> = Nested::Leaf(true);
    const F: Nested<bool> = Nested::Leaf(false);

    fn group(items: Vec<Nested<bool>>) -> Nested<bool> {
        Nested::Group(items)
    }

    #[test]
    fn test_empty_sequences() {
        assert!(all_true::<bool>(&[]));
        assert!(!any_true::<bool>(&[]));
    }

    #[test]
    fn test_all_true_nested() {
        assert!(all_true(&[T, group(vec![T, T])]));
        assert!(!all_true(&[T, group(vec![T, F])]));
        assert!(all_true(&[group(vec![]), group(vec![group(vec![])])]));
    }

    #[test]
    fn test_any_true_nested() {
        assert!(any_true(&[F, group(vec![F, T])]));
        assert!(!any_true(&[F, group(vec![F, group(vec![])])]));
        assert!(any_true(&[group(vec![group(vec![T])])]));
    }

    #[test]
    fn test_items_reduce_by_their_own_truth() {
        assert!(all_true(&[Nested::Item(Box::new(true)), T]));
        assert!(!all_true(&[Nested::Item(Box::new(false)), T]));
        assert!(any_true(&[F, Nested::Item(Box::new(true))]));
    }

    struct Counted<'a> {
        value: bool,
        visits: &'a Cell<usize>,
    }

    impl Truth for Counted<'_> {
        fn truth(&self) -> bool {
            self.visits.set(self.visits.get() + 1);
            self.value
        }
    }

    #[test]
    fn test_short_circuit() {
        let visits = Cell::new(0);
        let item = |value| {
            Nested::Item(Box::new(Counted {
                value,
                visits: &visits,
            }))
        };

        assert!(!all_true(&[item(false), item(true), item(true)]));
        assert_eq!(visits.get(), 1);

        visits.set(0);
        assert!(any_true(&[Nested::Group(vec![item(false), item(true)]), item(true)]));
        assert_eq!(visits.get(), 2);
    }
}
