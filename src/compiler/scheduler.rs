use crate::compiler::node::Node;
use crate::error::CompileError;
use std::collections::BTreeSet;

/// Orders node positions so that every node follows all of its dependencies.
///
/// Each round places the first unplaced node whose dependencies are all placed,
/// then rescans from the top, so ties always resolve to list order. A round that
/// places nothing means the remaining nodes form a cycle.
pub fn schedule(nodes: &[Node], dependencies: &[BTreeSet<usize>]) -> Result<Vec<usize>, CompileError> {
    let mut placed = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    while order.len() < nodes.len() {
        let next = (0..nodes.len()).find(|&i| {
            !placed[i]
                && dependencies
                    .get(i)
                    .is_none_or(|deps| deps.iter().all(|&dep| placed[dep]))
        });

        match next {
            Some(i) => {
                placed[i] = true;
                order.push(i);
            }
            None => {
                let remaining = (0..nodes.len())
                    .filter(|&i| !placed[i])
                    .map(|i| nodes[i].id.clone())
                    .collect();
                return Err(CompileError::DependencyCycle(remaining));
            }
        }
    }

    Ok(order)
}
