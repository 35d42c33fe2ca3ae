pub mod builder;
pub mod directive;

use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

/// Identity of a node inside one raw graph.
///
/// Graph editors write integer ids, hand-written templates sometimes use strings;
/// both are kept as their textual form so export keys read `"<id> <output>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<usize> for NodeId {
    fn from(id: usize) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for NodeId {
    /// Integer-looking ids are written back as numbers, the way editors save them.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        NodeId::from_value(&value)
            .ok_or_else(|| D::Error::custom(format!("node id must be a number or string, got {}", value)))
    }
}

/// A raw graph as saved by the editor: a node list and a link list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default)]
    pub links: Vec<RawLink>,
    /// Editor bookkeeping (`last_node_id`, `groups`, ...), kept for round trips.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawGraph {
    /// Effective ids of all nodes, in list order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| node.id_or_position(index))
            .collect()
    }

    /// The sub-graph made of the given nodes and the links running between them.
    ///
    /// Links crossing the selection boundary are dropped. The slots they fed stay
    /// declared on their nodes, so they become exported inputs once compiled.
    /// Kept nodes get explicit ids, since positional ids would shift.
    pub fn select(&self, ids: &[NodeId]) -> RawGraph {
        let wanted: HashSet<&NodeId> = ids.iter().collect();
        let nodes: Vec<RawNode> = self
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let id = node.id_or_position(index);
                wanted.contains(&id).then(|| RawNode {
                    id: Some(id),
                    ..node.clone()
                })
            })
            .collect();

        let kept: HashSet<&NodeId> = nodes.iter().filter_map(|node| node.id.as_ref()).collect();
        let links: Vec<RawLink> = self
            .links
            .iter()
            .filter(|link| kept.contains(&link.from_node) && kept.contains(&link.to_node))
            .cloned()
            .collect();

        let mut extra = Map::new();
        let last_node = nodes
            .iter()
            .filter_map(|node| node.id.as_ref()?.as_str().parse::<i64>().ok())
            .max();
        if let Some(last) = last_node {
            extra.insert("last_node_id".to_string(), Value::from(last));
        }
        let last_link = links.iter().filter_map(|link| link.id.as_ref()?.as_i64()).max();
        extra.insert("last_link_id".to_string(), Value::from(last_link.unwrap_or(0)));

        RawGraph { nodes, links, extra }
    }
}

/// One node entry of a raw graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Step type name, resolved against the step catalog.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Scheduling tie-break, defaults to 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Inputs the editor turned into link-fed slots, addressed by index from links.
    #[serde(default)]
    pub inputs: Vec<RawSlot>,
    /// Positional default values for the remaining inputs.
    #[serde(default)]
    pub widgets_values: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawNode {
    /// The declared id, or the node's position in the list when it has none.
    pub fn id_or_position(&self, index: usize) -> NodeId {
        self.id.clone().unwrap_or_else(|| NodeId::from(index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSlot {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A link `from_node.from_slot -> to_node.to_slot`.
///
/// Serialized either as `[from, from_slot, to, to_slot, type]` (templates) or
/// with a leading link id (saved workflows).
#[derive(Debug, Clone, PartialEq)]
pub struct RawLink {
    pub id: Option<Value>,
    pub from_node: NodeId,
    pub from_slot: usize,
    pub to_node: NodeId,
    pub to_slot: usize,
    pub type_tag: Value,
}

impl<'de> Deserialize<'de> for RawLink {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<Value>::deserialize(deserializer)?;
        let (id, fields) = match parts.len() {
            6 => (Some(parts[0].clone()), &parts[1..]),
            5 => (None, &parts[..]),
            n => return Err(D::Error::custom(format!("link must have 5 or 6 entries, got {}", n))),
        };

        let node = |v: &Value| {
            NodeId::from_value(v).ok_or_else(|| D::Error::custom(format!("invalid node id in link: {}", v)))
        };
        let slot = |v: &Value| {
            v.as_u64()
                .map(|s| s as usize)
                .ok_or_else(|| D::Error::custom(format!("invalid slot index in link: {}", v)))
        };

        Ok(RawLink {
            id,
            from_node: node(&fields[0])?,
            from_slot: slot(&fields[1])?,
            to_node: node(&fields[2])?,
            to_slot: slot(&fields[3])?,
            type_tag: fields[4].clone(),
        })
    }
}

impl Serialize for RawLink {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(if self.id.is_some() { 6 } else { 5 }))?;
        if let Some(id) = &self.id {
            seq.serialize_element(id)?;
        }
        seq.serialize_element(&self.from_node)?;
        seq.serialize_element(&self.from_slot)?;
        seq.serialize_element(&self.to_node)?;
        seq.serialize_element(&self.to_slot)?;
        seq.serialize_element(&self.type_tag)?;
        seq.end()
    }
}
