//! Stitching of way fragments into rings.
//!
//! Fragments are node id sequences. Two fragments are joined when an endpoint
//! of one equals an endpoint of the other; the candidate is reversed first when
//! needed, so member direction does not matter.

use hashbrown::HashMap;

use crate::models::NodeId;

/// Result of stitching the fragments of one boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stitched {
    /// Node ids of the ring, closing duplicate removed when `closed`
    pub nodes: Vec<NodeId>,
    /// Exactly one chain remained and its head equals its tail
    pub closed: bool,
    /// Number of chains left after stitching
    pub chains: usize,
}

/// Merge fragments sharing endpoints.
///
/// Endpoints are looked up through a map from node id to the fragments that
/// start or end there, so the work is near-linear in the number of fragments.
pub fn stitch_fragments(fragments: Vec<Vec<NodeId>>) -> Stitched {
    let fragments: Vec<Vec<NodeId>> = fragments.into_iter().filter(|f| !f.is_empty()).collect();

    let mut endpoints: HashMap<NodeId, Vec<usize>> = HashMap::new();
    for (i, fragment) in fragments.iter().enumerate() {
        endpoints.entry(fragment[0]).or_default().push(i);
        if let Some(&last) = fragment.last() {
            if last != fragment[0] {
                endpoints.entry(last).or_default().push(i);
            }
        }
    }

    let mut used = vec![false; fragments.len()];
    let mut chains: Vec<Vec<NodeId>> = Vec::new();

    for start in 0..fragments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut current = fragments[start].clone();

        // Grow the tail, then the head, until neither end finds a partner
        let mut merged = true;
        while merged && !is_closed(&current) {
            merged = false;

            let tail = current[current.len() - 1];
            if let Some(j) = take_partner(&endpoints, &mut used, tail) {
                let mut next = fragments[j].clone();
                if next.first() != current.last() {
                    next.reverse();
                }
                current.extend(next.into_iter().skip(1));
                merged = true;
                continue;
            }

            if let Some(j) = take_partner(&endpoints, &mut used, current[0]) {
                let mut prev = fragments[j].clone();
                if prev.last() != current.first() {
                    prev.reverse();
                }
                prev.pop();
                prev.extend(current);
                current = prev;
                merged = true;
            }
        }

        chains.push(current);
    }

    let chain_count = chains.len();
    let closed = chain_count == 1 && is_closed(&chains[0]);

    // Keep the largest chain; for islands or gaps this is the best-effort ring
    let mut nodes = chains
        .into_iter()
        .max_by_key(|chain| chain.len())
        .unwrap_or_default();

    if is_closed(&nodes) {
        nodes.pop();
    }

    Stitched {
        nodes,
        closed,
        chains: chain_count,
    }
}

fn is_closed(chain: &[NodeId]) -> bool {
    chain.len() > 1 && chain.first() == chain.last()
}

fn take_partner(
    endpoints: &HashMap<NodeId, Vec<usize>>,
    used: &mut [bool],
    node: NodeId,
) -> Option<usize> {
    let candidate = endpoints
        .get(&node)?
        .iter()
        .copied()
        .find(|&i| !used[i])?;
    used[candidate] = true;
    Some(candidate)
}
