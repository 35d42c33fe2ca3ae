use crate::compiler::node::Node;
use crate::compiler::register::Register;
use crate::dsl::{NodeId, RawLink};
use crate::error::CompileError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Result of wiring links into a node list.
#[derive(Debug, Default)]
pub struct Wiring {
    /// Input registers fed by at least one link.
    pub linked: HashSet<Register>,
    /// For each node position, the positions of the nodes it reads from.
    pub dependencies: Vec<BTreeSet<usize>>,
}

/// Connects every link: the source output gains the destination slot's register
/// as a consumer, and the destination node comes to depend on the source node.
pub fn connect_links(links: &[RawLink], nodes: &mut [Node]) -> Result<Wiring, CompileError> {
    let positions: HashMap<NodeId, usize> = nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id.clone(), position))
        .collect();
    let position = |id: &NodeId| positions.get(id).copied().ok_or_else(|| CompileError::UnknownNode(id.clone()));

    let mut wiring = Wiring {
        linked: HashSet::new(),
        dependencies: vec![BTreeSet::new(); nodes.len()],
    };

    for link in links {
        let from = position(&link.from_node)?;
        let to = position(&link.to_node)?;

        let to_node = &nodes[to];
        let input = to_node.input_slots.get(link.to_slot).ok_or_else(|| CompileError::UnknownSlot {
            node: to_node.id.clone(),
            direction: "input",
            slot: link.to_slot,
        })?;
        let (register, input_name, input_type) = (input.register(), input.name.clone(), input.type_tag().to_string());

        let from_node = &mut nodes[from];
        let from_id = from_node.id.clone();
        let output = from_node.outputs.get_mut(link.from_slot).ok_or(CompileError::UnknownSlot {
            node: from_id,
            direction: "output",
            slot: link.from_slot,
        })?;
        if output.type_tag != input_type {
            return Err(CompileError::LinkTypeMismatch {
                input: input_name,
                input_type,
                output_type: output.type_tag.clone(),
            });
        }

        output.consumers.push(register);
        wiring.linked.insert(register);
        wiring.dependencies[to].insert(from);
    }

    Ok(wiring)
}
