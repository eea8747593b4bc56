//! Subgraph monomorphism: injective vertex maps carrying every pattern edge
//! onto a target edge. Non-edges are unconstrained, so this answers "does the
//! target contain a copy of the pattern", not induced containment.

use crate::graph::DenseGraph;

/// Necessary conditions checked before any search.
pub fn could_embed(pattern: &DenseGraph, target: &DenseGraph) -> bool {
    if pattern.order() > target.order() || pattern.size() > target.size() {
        return false;
    }
    // The i-th largest pattern degree must fit under the i-th largest target degree.
    pattern
        .degree_sequence()
        .iter()
        .zip(target.degree_sequence())
        .all(|(p, t)| *p <= t)
}

pub fn is_monomorphic(pattern: &DenseGraph, target: &DenseGraph) -> bool {
    find_embedding(pattern, target).is_some()
}

/// Returns `mapping` with `mapping[p]` the target vertex hosting pattern vertex `p`.
pub fn find_embedding(pattern: &DenseGraph, target: &DenseGraph) -> Option<Vec<usize>> {
    if !could_embed(pattern, target) {
        return None;
    }
    let order = search_order(pattern);
    let mut mapping = vec![usize::MAX; pattern.order()];
    if extend(pattern, target, &order, 0, 0, 0, &mut mapping) {
        Some(mapping)
    } else {
        None
    }
}

/// Highest degree first, then always the vertex with most already-placed neighbours.
fn search_order(pattern: &DenseGraph) -> Vec<usize> {
    let n = pattern.order();
    let mut order = Vec::with_capacity(n);
    let mut placed = 0u64;
    while order.len() < n {
        let next = (0..n)
            .filter(|&v| placed >> v & 1 == 0)
            .max_by_key(|&v| {
                let anchored = (pattern.neighbors(v) & placed).count_ones();
                (anchored, pattern.degree(v), std::cmp::Reverse(v))
            });
        let Some(v) = next else { break };
        order.push(v);
        placed |= 1 << v;
    }
    order
}

fn full_mask(n: usize) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

fn extend(
    pattern: &DenseGraph,
    target: &DenseGraph,
    order: &[usize],
    depth: usize,
    placed: u64,
    used: u64,
    mapping: &mut [usize],
) -> bool {
    let Some(&p) = order.get(depth) else {
        return true;
    };

    let mut candidates = full_mask(target.order()) & !used;
    let mut anchored = pattern.neighbors(p) & placed;
    while anchored != 0 {
        let q = anchored.trailing_zeros() as usize;
        anchored &= anchored - 1;
        candidates &= target.neighbors(mapping[q]);
    }

    let needed = pattern.degree(p);
    while candidates != 0 {
        let c = candidates.trailing_zeros() as usize;
        candidates &= candidates - 1;
        if target.degree(c) < needed {
            continue;
        }
        mapping[p] = c;
        if extend(pattern, target, order, depth + 1, placed | 1 << p, used | 1 << c, mapping) {
            return true;
        }
    }
    mapping[p] = usize::MAX;
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(n: usize, edges: &[(usize, usize)]) -> DenseGraph {
        DenseGraph::from_edges(n, edges).unwrap()
    }

    fn assert_valid(pattern: &DenseGraph, target: &DenseGraph, mapping: &[usize]) {
        let mut seen = std::collections::HashSet::new();
        assert!(mapping.iter().all(|&c| seen.insert(c)), "mapping is not injective");
        for (u, v) in pattern.edges() {
            assert!(target.has_edge(mapping[u], mapping[v]));
        }
    }

    #[test]
    fn empty_pattern_embeds_everywhere() {
        let empty = dense(0, &[]);
        assert_eq!(find_embedding(&empty, &dense(0, &[])), Some(vec![]));
        assert!(is_monomorphic(&empty, &dense(3, &[(0, 1)])));
    }

    #[test]
    fn path_into_cycle_is_not_induced() {
        let p3 = dense(3, &[(0, 1), (1, 2)]);
        let triangle = dense(3, &[(0, 1), (1, 2), (0, 2)]);
        let mapping = find_embedding(&p3, &triangle).unwrap();
        assert_valid(&p3, &triangle, &mapping);
        assert!(!is_monomorphic(&triangle, &p3));
    }

    #[test]
    fn matching_needs_disjoint_edges() {
        let two_edges = dense(4, &[(0, 1), (2, 3)]);
        let star = dense(4, &[(0, 1), (0, 2), (0, 3)]);
        let p4 = dense(4, &[(0, 1), (1, 2), (2, 3)]);
        assert!(!is_monomorphic(&two_edges, &star));
        let mapping = find_embedding(&two_edges, &p4).unwrap();
        assert_valid(&two_edges, &p4, &mapping);
    }

    #[test]
    fn degree_filter_rejects_early() {
        let star = dense(4, &[(0, 1), (0, 2), (0, 3)]);
        let c4 = dense(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert!(!could_embed(&star, &c4));
        assert!(!is_monomorphic(&star, &c4));
    }

    #[test]
    fn k4_contains_every_graph_on_four_vertices() {
        let k4 = dense(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]);
        let c4 = dense(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let paw = dense(4, &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        for pattern in [&c4, &paw, &k4] {
            let mapping = find_embedding(pattern, &k4).unwrap();
            assert_valid(pattern, &k4, &mapping);
        }
    }

    #[test]
    fn petersen_has_no_triangle_but_has_c5() {
        let petersen = dense(
            10,
            &[
                (0, 1), (1, 2), (2, 3), (3, 4), (4, 0),
                (0, 5), (1, 6), (2, 7), (3, 8), (4, 9),
                (5, 7), (7, 9), (9, 6), (6, 8), (8, 5),
            ],
        );
        let triangle = dense(3, &[(0, 1), (1, 2), (0, 2)]);
        let c5 = dense(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
        assert!(!is_monomorphic(&triangle, &petersen));
        let mapping = find_embedding(&c5, &petersen).unwrap();
        assert_valid(&c5, &petersen, &mapping);
    }
}
