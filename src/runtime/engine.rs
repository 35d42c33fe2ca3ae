use crate::compiler::exports::ExportedOutput;
use crate::error::ExecutionError;
use crate::runtime::integrated::IntegratedNode;
use crate::runtime::processor::NodeProcessor;
use crate::runtime::store::RegisterStore;
use crate::steps::{Params, UiMap};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Outputs of one invocation plus everything steps reported on the side channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessResult {
    pub result: Vec<Value>,
    pub ui: UiMap,
}

/// One invocation of a compiled graph. Owns its register store; consumed by `run`.
pub struct Execution<'a> {
    invocation_id: Uuid,
    name: &'a str,
    processors: &'a [NodeProcessor],
    outputs: &'a [ExportedOutput],
    store: RegisterStore,
    ui: UiMap,
}

impl<'a> Execution<'a> {
    pub fn new(node: &'a IntegratedNode, params: Params) -> Result<Self, ExecutionError> {
        Ok(Self {
            invocation_id: Uuid::new_v4(),
            name: node.name(),
            processors: node.processors(),
            outputs: node.exported_outputs(),
            store: RegisterStore::seed(node.exported_inputs(), params)?,
            ui: UiMap::new(),
        })
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Runs every step once, in schedule order, then reads the exported outputs.
    pub async fn run(mut self) -> Result<ProcessResult> {
        info!(invocation_id = %self.invocation_id, node = self.name, steps = self.processors.len(), "running integrated node");

        for processor in self.processors {
            debug!(invocation_id = %self.invocation_id, node_id = %processor.node_id, step = %processor.type_name, "running step");
            processor.process(&mut self.store, &mut self.ui).await?;
        }

        let mut result = Vec::with_capacity(self.outputs.len());
        for output in self.outputs {
            let value = self
                .store
                .get(output.register)
                .cloned()
                .ok_or_else(|| ExecutionError::MissingOutput(output.name.clone()))?;
            result.push(value);
        }

        Ok(ProcessResult { result, ui: self.ui })
    }
}
