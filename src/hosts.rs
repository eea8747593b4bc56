//! Named host graph families.
//!
//! Names are the short tokens used to key every artifact: `K_4`, `K_2,3`,
//! `K_2,2,2`, `C_5`, `P_4` and `Zim`. Anything after a `.` is ignored so
//! that file-style names such as `K_4.g6` resolve to the same host.

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::graph::SimpleGraph;

pub fn host_from_name(name: &str) -> Result<SimpleGraph> {
    let unknown = || Error::UnknownHostGraph(name.to_string());
    let base = name.split('.').next().unwrap_or(name).trim();

    if base == "Zim" {
        return zim_graph();
    }
    let (family, params) = base.split_once('_').ok_or_else(unknown)?;
    let sizes: Vec<usize> = params
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| unknown())?;

    match (family, sizes.as_slice()) {
        ("K", [n]) => complete_graph(*n),
        ("K", parts) if parts.len() >= 2 => complete_multipartite_graph(parts),
        ("C", [n]) if *n >= 3 => cycle_graph(*n),
        ("P", [n]) => path_graph(*n),
        _ => Err(unknown()),
    }
}

pub fn complete_graph(n: usize) -> Result<SimpleGraph> {
    let mut graph = SimpleGraph::new();
    for v in 0..n {
        graph.add_node(v);
    }
    for (u, v) in (0..n).tuple_combinations() {
        graph.add_edge(u, v)?;
    }
    Ok(graph)
}

/// Vertices are numbered part by part, as networkx does.
pub fn complete_multipartite_graph(parts: &[usize]) -> Result<SimpleGraph> {
    let mut graph = SimpleGraph::new();
    let mut ranges = Vec::with_capacity(parts.len());
    let mut next = 0;
    for &size in parts {
        ranges.push(next..next + size);
        next += size;
    }
    for v in 0..next {
        graph.add_node(v);
    }
    for (a, b) in ranges.iter().tuple_combinations() {
        for u in a.clone() {
            for v in b.clone() {
                graph.add_edge(u, v)?;
            }
        }
    }
    Ok(graph)
}

pub fn cycle_graph(n: usize) -> Result<SimpleGraph> {
    SimpleGraph::from_edges((0..n).map(|i| (i, (i + 1) % n)))
}

pub fn path_graph(n: usize) -> Result<SimpleGraph> {
    let mut graph = SimpleGraph::new();
    for v in 0..n {
        graph.add_node(v);
    }
    for i in 1..n {
        graph.add_edge(i - 1, i)?;
    }
    Ok(graph)
}

/// Eleven vertex, fifteen edge graph studied alongside the standard families.
pub fn zim_graph() -> Result<SimpleGraph> {
    SimpleGraph::from_edges([
        (1, 2),
        (1, 5),
        (2, 3),
        (2, 6),
        (3, 7),
        (4, 5),
        (5, 6),
        (5, 9),
        (6, 7),
        (6, 9),
        (7, 8),
        (7, 9),
        (9, 10),
        (9, 11),
        (10, 11),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_graphs() {
        let k4 = host_from_name("K_4").unwrap();
        assert_eq!((k4.node_count(), k4.edge_count()), (4, 6));
        let k2 = host_from_name("K_2.g6").unwrap();
        assert_eq!(k2.edges(), vec![(0, 1)]);
    }

    #[test]
    fn multipartite_graphs() {
        let k23 = host_from_name("K_2,3").unwrap();
        assert_eq!((k23.node_count(), k23.edge_count()), (5, 6));
        let edges = k23.edges();
        assert!(!edges.contains(&(0, 1)));
        assert!(edges.contains(&(1, 2)));
        let k222 = host_from_name("K_2,2,2").unwrap();
        assert_eq!(k222.edge_count(), 12);
    }

    #[test]
    fn cycles_and_paths() {
        let c5 = host_from_name("C_5").unwrap();
        assert_eq!((c5.node_count(), c5.edge_count()), (5, 5));
        let (dense, _) = c5.to_dense().unwrap();
        assert!((0..dense.order()).all(|v| dense.degree(v) == 2));
        let p4 = host_from_name("P_4").unwrap();
        assert_eq!((p4.node_count(), p4.edge_count()), (4, 3));
    }

    #[test]
    fn zim() {
        let zim = host_from_name("Zim").unwrap();
        assert_eq!((zim.node_count(), zim.edge_count()), (11, 15));
    }

    #[test]
    fn unknown_names_are_rejected() {
        for name in ["X_3", "K_", "C_2", "K_a", "triangle", "P_1,2"] {
            assert!(
                matches!(host_from_name(name), Err(Error::UnknownHostGraph(_))),
                "{name} should be rejected"
            );
        }
    }
}
