//! Generators of the down-arrow set: its maximal elements under the subgraph order.

use std::collections::BTreeSet;

use tracing::debug;

use crate::poset::PosetRelation;

/// Members of `down_arrow` with nothing above them inside `down_arrow`, in population order.
///
/// The set is an order ideal, so these members generate it.
pub fn maximal_elements(down_arrow: &BTreeSet<usize>, poset: &PosetRelation) -> Vec<usize> {
    let restricted = poset.restrict(down_arrow);
    let maximal: Vec<usize> = down_arrow
        .iter()
        .copied()
        .filter(|&m| restricted.out_degree(m) == 0)
        .collect();
    debug!(members = down_arrow.len(), maximal = maximal.len(), "extracted maximal ideals");
    maximal
}

/// Whether `members` is closed downward in `poset`.
pub fn is_order_ideal(members: &BTreeSet<usize>, poset: &PosetRelation) -> bool {
    members
        .iter()
        .all(|&m| poset.below(m).is_subset(members))
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 < 1 < 3, 0 < 2 < 3, 0 < 4
    fn diamond() -> PosetRelation {
        let mut poset =
            PosetRelation::from_edges(5, [(0, 1), (0, 2), (1, 3), (2, 3), (0, 4)]);
        poset.close();
        poset
    }

    #[test]
    fn maximal_elements_of_a_chain_is_its_top() {
        let poset = diamond();
        assert_eq!(maximal_elements(&BTreeSet::from([0, 1]), &poset), vec![1]);
    }

    #[test]
    fn incomparable_tops_are_all_kept() {
        let poset = diamond();
        let members = BTreeSet::from([0, 1, 2, 4]);
        assert_eq!(maximal_elements(&members, &poset), vec![1, 2, 4]);
        let generated: BTreeSet<usize> = [1, 2, 4].into_iter().flat_map(|g| poset.ideal(g)).collect();
        assert_eq!(generated, members);
    }

    #[test]
    fn relations_outside_the_set_are_ignored() {
        let poset = diamond();
        // 1 has 3 above it, but 3 is not a member.
        assert_eq!(maximal_elements(&BTreeSet::from([0, 1, 2]), &poset), vec![1, 2]);
    }

    #[test]
    fn empty_set_has_no_generators() {
        assert!(maximal_elements(&BTreeSet::new(), &diamond()).is_empty());
    }

    #[test]
    fn ideal_check() {
        let poset = diamond();
        assert!(is_order_ideal(&BTreeSet::from([0, 1, 4]), &poset));
        assert!(!is_order_ideal(&BTreeSet::from([1, 4]), &poset));
    }
}
