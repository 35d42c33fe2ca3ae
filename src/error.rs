use crate::dsl::NodeId;
use thiserror::Error;

/// Errors that abort compiling a single graph.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("unknown node type `{0}`")]
    UnknownStepType(String),

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("mismatched types for hidden input `{name}`: {found} and {existing}")]
    HiddenInputTypeMismatch {
        name: String,
        existing: String,
        found: String,
    },

    #[error("node {node} declares slot `{name}` but its step has no input with that name")]
    UnknownSlotInput { node: NodeId, name: String },

    #[error("node {node} declares slot `{name}` more than once")]
    DuplicateSlotInput { node: NodeId, name: String },

    #[error("link references unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {node} has no {direction} slot {slot}")]
    UnknownSlot {
        node: NodeId,
        direction: &'static str,
        slot: usize,
    },

    #[error("cannot connect input `{input}` of type {input_type} to output of type {output_type}")]
    LinkTypeMismatch {
        input: String,
        input_type: String,
        output_type: String,
    },

    #[error("dependency loop detected between nodes [{}]", join_ids(.0))]
    DependencyCycle(Vec<NodeId>),
}

/// Errors raised while running a compiled graph, before or after the steps themselves.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unexpected parameter `{0}`")]
    UnexpectedParameter(String),

    #[error("output `{0}` was never written by any step")]
    MissingOutput(String),
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}
