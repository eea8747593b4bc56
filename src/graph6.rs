//! graph6 encoding (without the `>>graph6<<` header).
//!
//! Bits run over the upper triangle column by column: `(0,1), (0,2), (1,2),
//! (0,3), ...`, packed six to a byte and offset by 63.

use crate::error::{Error, Result};
use crate::graph::{DenseGraph, MAX_VERTICES};

pub fn encode(graph: &DenseGraph) -> String {
    let n = graph.order();
    let mut out = Vec::with_capacity(1 + (n * n.saturating_sub(1) / 2).div_ceil(6));
    if n <= 62 {
        out.push(n as u8 + 63);
    } else {
        // Only the 18-bit form is reachable given MAX_VERTICES.
        out.push(126);
        out.push(((n >> 12) & 0x3f) as u8 + 63);
        out.push(((n >> 6) & 0x3f) as u8 + 63);
        out.push((n & 0x3f) as u8 + 63);
    }

    let mut chunk = 0u8;
    let mut filled = 0;
    for j in 1..n {
        for i in 0..j {
            chunk = (chunk << 1) | graph.has_edge(i, j) as u8;
            filled += 1;
            if filled == 6 {
                out.push(chunk + 63);
                chunk = 0;
                filled = 0;
            }
        }
    }
    if filled > 0 {
        out.push((chunk << (6 - filled)) + 63);
    }
    // Every byte is in 63..=126, so this is ASCII.
    out.into_iter().map(char::from).collect()
}

pub fn decode(input: &str) -> Result<DenseGraph> {
    let invalid = |reason: &str| Error::InvalidGraph6 {
        input: input.to_string(),
        reason: reason.to_string(),
    };
    let bytes = input.trim().as_bytes();
    if bytes.iter().any(|&b| !(63..=126).contains(&b)) {
        return Err(invalid("byte outside the printable graph6 range"));
    }

    let (n, body) = match bytes {
        [] => return Err(invalid("empty string")),
        [126, 126, ..] => return Err(invalid("36-bit vertex counts are not supported")),
        [126, a, b, c, rest @ ..] => {
            let n = ((*a as usize - 63) << 12) | ((*b as usize - 63) << 6) | (*c as usize - 63);
            (n, rest)
        }
        [126, ..] => return Err(invalid("truncated vertex count")),
        [first, rest @ ..] => (*first as usize - 63, rest),
    };
    if n > MAX_VERTICES {
        return Err(Error::TooManyVertices {
            found: n,
            max: MAX_VERTICES,
        });
    }

    let bits = n * n.saturating_sub(1) / 2;
    if body.len() != bits.div_ceil(6) {
        return Err(invalid("edge section has the wrong length"));
    }

    let mut graph = DenseGraph::new(n)?;
    let mut k = 0;
    for j in 1..n {
        for i in 0..j {
            let byte = body[k / 6] - 63;
            if byte >> (5 - k % 6) & 1 == 1 {
                graph.add_edge(i, j);
            }
            k += 1;
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        // Values as printed by nauty's geng / networkx.to_graph6_bytes.
        assert_eq!(encode(&DenseGraph::new(0).unwrap()), "?");
        assert_eq!(encode(&DenseGraph::from_edges(2, &[(0, 1)]).unwrap()), "A_");
        let triangle = DenseGraph::from_edges(3, &[(0, 1), (0, 2), (1, 2)]).unwrap();
        assert_eq!(encode(&triangle), "Bw");
        let k4 = DenseGraph::from_edges(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)])
            .unwrap();
        assert_eq!(encode(&k4), "C~");
        let p3 = DenseGraph::from_edges(3, &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(encode(&p3), "Bg");
    }

    #[test]
    fn decode_inverts_encode() {
        let g = DenseGraph::from_edges(7, &[(0, 6), (1, 2), (2, 5), (3, 4), (4, 6)]).unwrap();
        assert_eq!(decode(&encode(&g)).unwrap(), g);
    }

    #[test]
    fn long_vertex_count_form() {
        let mut g = DenseGraph::new(64).unwrap();
        g.add_edge(0, 63);
        let encoded = encode(&g);
        assert!(encoded.starts_with('~'));
        assert_eq!(decode(&encoded).unwrap(), g);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(decode(""), Err(Error::InvalidGraph6 { .. })));
        assert!(matches!(decode("C"), Err(Error::InvalidGraph6 { .. })));
        assert!(matches!(decode("A_?"), Err(Error::InvalidGraph6 { .. })));
        assert!(matches!(decode("B\n w"), Err(Error::InvalidGraph6 { .. })));
    }
}
