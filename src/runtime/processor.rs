use crate::compiler::node::Node;
use crate::compiler::register::Register;
use crate::dsl::NodeId;
use crate::runtime::store::RegisterStore;
use crate::steps::{Params, StepDescriptor, UiMap, Validation};
use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use std::sync::Arc;

/// A scheduled node, reduced to what running it needs: where its arguments come
/// from and where its results go.
#[derive(Debug, Clone)]
pub struct NodeProcessor {
    pub node_id: NodeId,
    pub type_name: String,
    step: Arc<dyn StepDescriptor>,
    input_map: IndexMap<String, Register>,
    outputs: Vec<Vec<Register>>,
}

impl NodeProcessor {
    pub fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            type_name: node.type_name.clone(),
            step: node.step.clone(),
            input_map: node.input_map.clone(),
            outputs: node.outputs.iter().map(|output| output.consumers.clone()).collect(),
        }
    }

    pub fn step(&self) -> &Arc<dyn StepDescriptor> {
        &self.step
    }

    /// Arguments present in the store; unset ones are left out for the step to default.
    pub fn map_inputs(&self, store: &RegisterStore) -> Params {
        self.input_map
            .iter()
            .filter_map(|(name, register)| store.get(*register).map(|value| (name.clone(), value.clone())))
            .collect()
    }

    pub fn has_validation(&self) -> bool {
        self.step.has_validation()
    }

    pub async fn validate(&self, store: &RegisterStore) -> Result<Validation> {
        if !self.step.has_validation() {
            return Ok(Validation::Valid);
        }
        self.step
            .validate_inputs(&self.map_inputs(store))
            .await
            .with_context(|| format!("validating node {} ({})", self.node_id, self.type_name))
    }

    pub fn has_change_detection(&self) -> bool {
        self.step.has_change_detection()
    }

    pub async fn fingerprint(&self, store: &RegisterStore) -> Result<String> {
        self.step
            .fingerprint(&self.map_inputs(store))
            .await
            .with_context(|| format!("fingerprinting node {} ({})", self.node_id, self.type_name))
    }

    /// Runs the step and writes each result to every consumer register of its output.
    pub async fn process(&self, store: &mut RegisterStore, ui: &mut UiMap) -> Result<()> {
        let output = self
            .step
            .invoke(self.map_inputs(store))
            .await
            .with_context(|| format!("node {} ({}) failed", self.node_id, self.type_name))?;

        let (values, side_channel) = output.into_parts();
        for (key, entries) in side_channel {
            ui.entry(key).or_default().extend(entries);
        }
        for (registers, value) in self.outputs.iter().zip(values) {
            for register in registers {
                store.set(*register, value.clone());
            }
        }
        Ok(())
    }
}
