use crate::dsl::{NodeId, RawGraph, RawLink, RawNode, RawSlot};
use serde_json::Value;

/// Fluent construction of raw graphs, mostly for tests and tooling.
pub struct GraphBuilder {
    pub nodes: Vec<RawNode>,
    links: Vec<RawLink>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Adds a node without slots or values.
    pub fn add(self, id: &str, kind: &str) -> Self {
        self.node(id, kind).build()
    }

    pub fn node(self, id: &str, kind: &str) -> NodeBuilder {
        NodeBuilder {
            graph_builder: self,
            node: RawNode {
                kind: kind.to_string(),
                id: Some(NodeId::from(id)),
                order: None,
                inputs: Vec::new(),
                widgets_values: Vec::new(),
                extra: Default::default(),
            },
        }
    }

    pub fn link(mut self, from: &str, from_slot: usize, to: &str, to_slot: usize, type_tag: &str) -> Self {
        self.links.push(RawLink {
            id: Some(Value::from(self.links.len() + 1)),
            from_node: NodeId::from(from),
            from_slot,
            to_node: NodeId::from(to),
            to_slot,
            type_tag: Value::from(type_tag),
        });
        self
    }

    pub fn build(self) -> RawGraph {
        RawGraph {
            nodes: self.nodes,
            links: self.links,
            extra: Default::default(),
        }
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NodeBuilder {
    graph_builder: GraphBuilder,
    node: RawNode,
}

impl NodeBuilder {
    /// Declares `name` as a link-fed slot; slots are indexed in declaration order.
    pub fn slot(mut self, name: &str) -> Self {
        self.node.inputs.push(RawSlot {
            name: name.to_string(),
            extra: Default::default(),
        });
        self
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.node.widgets_values.push(value.into());
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.node.order = Some(order);
        self
    }

    /// Drops the explicit id so the node falls back to its list position.
    pub fn anonymous(mut self) -> Self {
        self.node.id = None;
        self
    }

    pub fn build(mut self) -> GraphBuilder {
        self.graph_builder.nodes.push(self.node);
        self.graph_builder
    }
}
