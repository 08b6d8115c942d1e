//! Tag intersection: OR within a group, AND across groups.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use storefront_core::ProductId;

/// Running intersection of per-group product matches.
///
/// Feed it one group at a time with [`TagIntersection::absorb`]. The first
/// group seeds the set; every later group retains only ids present in both.
/// Once the set is empty no later group can change that, and `absorb` says so
/// by returning `ControlFlow::Break`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIntersection {
    current: Option<BTreeSet<ProductId>>,
}

impl TagIntersection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the products matching at least one selected tag of a group.
    /// Duplicate ids in `group_matches` collapse.
    pub fn absorb<I>(&mut self, group_matches: I) -> ControlFlow<()>
    where
        I: IntoIterator<Item = ProductId>,
    {
        let incoming: BTreeSet<ProductId> = group_matches.into_iter().collect();
        let next = match self.current.take() {
            None => incoming,
            Some(mut running) => {
                running.retain(|id| incoming.contains(id));
                running
            }
        };
        let exhausted = next.is_empty();
        self.current = Some(next);

        if exhausted {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    /// True once at least one group has been absorbed and nothing survived.
    pub fn is_exhausted(&self) -> bool {
        self.current.as_ref().is_some_and(BTreeSet::is_empty)
    }

    /// `None` when no group was absorbed (no tag constraint), otherwise the
    /// matched ids in ascending order.
    pub fn finish(self) -> Option<Vec<ProductId>> {
        self.current.map(|ids| ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    fn pid(n: u128) -> ProductId {
        ProductId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn no_groups_means_no_constraint() {
        assert_eq!(TagIntersection::new().finish(), None);
    }

    #[test]
    fn and_across_groups() {
        // A(t1,t3) B(t2) C(t1); G1=[t1,t2] matches A,B,C; G2=[t3] matches A.
        let mut acc = TagIntersection::new();
        assert_eq!(acc.absorb([pid(1), pid(2), pid(3), pid(1)]), ControlFlow::Continue(()));
        assert_eq!(acc.absorb([pid(1)]), ControlFlow::Continue(()));
        assert_eq!(acc.finish(), Some(vec![pid(1)]));
    }

    #[test]
    fn empty_group_breaks() {
        let mut acc = TagIntersection::new();
        assert_eq!(acc.absorb([pid(1)]), ControlFlow::Continue(()));
        assert_eq!(acc.absorb(Vec::new()), ControlFlow::Break(()));
        assert!(acc.is_exhausted());
        assert_eq!(acc.finish(), Some(vec![]));
    }

    #[test]
    fn disjoint_groups_break_even_when_both_non_empty() {
        let mut acc = TagIntersection::new();
        let _ = acc.absorb([pid(1)]);
        assert_eq!(acc.absorb([pid(2)]), ControlFlow::Break(()));
    }

    proptest! {
        /// Folding groups equals the plain set intersection of all groups.
        #[test]
        fn matches_naive_intersection(
            groups in prop::collection::vec(prop::collection::vec(0u128..12, 0..8), 1..5)
        ) {
            let mut acc = TagIntersection::new();
            for g in &groups {
                if acc.absorb(g.iter().copied().map(pid)).is_break() {
                    break;
                }
            }

            let mut expected: BTreeSet<u128> = groups[0].iter().copied().collect();
            for g in &groups[1..] {
                let other: BTreeSet<u128> = g.iter().copied().collect();
                expected = expected.intersection(&other).copied().collect();
            }
            let expected: Vec<ProductId> = expected.into_iter().map(pid).collect();

            prop_assert_eq!(acc.finish(), Some(expected));
        }
    }
}
