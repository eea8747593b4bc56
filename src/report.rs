//! Plain-text summary of a finished host.

use std::fmt::Write;

use crate::cache::GraphRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub host: String,
    /// Counts of the intermediate artifacts, when they are still cached.
    pub subgraphs: Option<usize>,
    pub relations: Option<usize>,
    pub colorings: Option<usize>,
    pub down_arrow: Vec<GraphRecord>,
    pub ideals: Vec<GraphRecord>,
}

fn count(value: Option<usize>) -> String {
    value.map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn edge_list(record: &GraphRecord) -> String {
    if record.edges.is_empty() {
        return "(empty)".to_string();
    }
    record
        .edges
        .iter()
        .map(|(u, v)| format!("{u}-{v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render(summary: &Summary) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "host {}", summary.host);
    let _ = writeln!(
        out,
        "  subgraph classes: {}  relations: {}  colorings: {}",
        count(summary.subgraphs),
        count(summary.relations),
        count(summary.colorings),
    );
    let _ = writeln!(out, "  down-arrow set: {} classes", summary.down_arrow.len());
    let _ = writeln!(out, "  ideals: {}", summary.ideals.len());
    for record in &summary.ideals {
        let _ = writeln!(
            out,
            "    {:<12} n={:<2} m={:<3} {}",
            record.signature.as_str(),
            record.node_count,
            record.edges.len(),
            edge_list(record)
        );
    }
    out
}
