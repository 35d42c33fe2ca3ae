use crate::compiler::node::{HiddenInputs, Node};
use crate::dsl::RawNode;
use crate::error::CompileError;
use crate::steps::catalog::StepCatalog;
use std::collections::HashSet;

/// Nodes of a graph, stable-sorted by their order hint, plus the hidden inputs
/// they share.
#[derive(Debug)]
pub struct NodeGraph {
    pub nodes: Vec<Node>,
    pub hidden: HiddenInputs,
}

/// Instantiates every raw node against the catalog.
///
/// A node without an explicit id is identified by its position in the list.
pub fn create_nodes(raw_nodes: &[RawNode], catalog: &dyn StepCatalog) -> Result<NodeGraph, CompileError> {
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut hidden = HiddenInputs::new();
    let mut seen = HashSet::new();

    for (index, raw) in raw_nodes.iter().enumerate() {
        let id = raw.id_or_position(index);
        if !seen.insert(id.clone()) {
            return Err(CompileError::DuplicateNode(id));
        }

        let step = catalog
            .lookup(&raw.kind)
            .ok_or_else(|| CompileError::UnknownStepType(raw.kind.clone()))?;

        let mut node = Node::new(id, raw, step, &mut hidden)?;
        node.separate_input_slots(raw.inputs.iter().map(|slot| slot.name.as_str()))?;
        node.assign_defaults(&raw.widgets_values);
        nodes.push(node);
    }

    nodes.sort_by_key(|node| node.order);
    Ok(NodeGraph { nodes, hidden })
}
