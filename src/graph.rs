use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::dsl::GraphDesc;
use crate::generator::error::{GenError, GenResult};

/// Stable topological order of `graph.nodes`, as indices into that list.
///
/// Among nodes that are ready at the same time, the one declared first wins,
/// so a fixed document always yields the same order.
pub fn topo_sort(graph: &GraphDesc) -> GenResult<Vec<usize>> {
    let index_by_name: HashMap<&str, usize> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name.as_str(), i))
        .collect();

    let mut indeg = vec![0usize; graph.nodes.len()];
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
    for c in &graph.connections {
        let (Some(&from), Some(&to)) = (
            index_by_name.get(c.from.node.as_str()),
            index_by_name.get(c.to.node.as_str()),
        ) else {
            return Err(GenError::malformed(format!(
                "connection references missing node: {} -> {}",
                c.from.node, c.to.node
            )));
        };
        indeg[to] += 1;
        outgoing[from].push(to);
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indeg
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();
    let mut order = Vec::with_capacity(graph.nodes.len());

    while let Some(Reverse(n)) = ready.pop() {
        order.push(n);
        for &m in &outgoing[n] {
            indeg[m] -= 1;
            if indeg[m] == 0 {
                ready.push(Reverse(m));
            }
        }
    }

    if order.len() != graph.nodes.len() {
        return Err(GenError::malformed(
            "cycle detected in graph (cannot topologically sort)",
        ));
    }
    Ok(order)
}

/// Names of all nodes upstream of (and including) `starts`.
pub fn upstream_reachable<'a>(
    graph: &GraphDesc,
    starts: impl IntoIterator<Item = &'a str>,
) -> HashSet<String> {
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    for c in &graph.connections {
        incoming
            .entry(c.to.node.as_str())
            .or_default()
            .push(c.from.node.as_str());
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut stack: Vec<&str> = starts.into_iter().collect();
    while let Some(n) = stack.pop() {
        if !visited.insert(n.to_string()) {
            continue;
        }
        if let Some(prevs) = incoming.get(n) {
            stack.extend(prevs.iter().copied());
        }
    }
    visited
}
