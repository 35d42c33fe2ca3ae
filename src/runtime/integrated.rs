use crate::compiler::core::CompiledGraph;
use crate::compiler::exports::{ExportedInputs, ExportedOutput};
use crate::dsl::NodeId;
use crate::dsl::directive::DEFAULT_CATEGORY;
use crate::runtime::engine::{Execution, ProcessResult};
use crate::runtime::processor::NodeProcessor;
use crate::runtime::store::RegisterStore;
use crate::steps::{InputSchema, OutputSpec, Params, StepDescriptor, StepOutput, Validation};
use anyhow::Result;
use async_trait::async_trait;

/// A compiled graph exposed as a single step.
#[derive(Debug)]
pub struct IntegratedNode {
    name: String,
    display_name: String,
    category: String,
    processors: Vec<NodeProcessor>,
    inputs: ExportedInputs,
    outputs: Vec<ExportedOutput>,
    output_node: bool,
}

impl IntegratedNode {
    pub fn new(name: &str, graph: CompiledGraph) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            processors: graph.processors,
            inputs: graph.inputs,
            outputs: graph.outputs,
            output_node: graph.output_node,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn processors(&self) -> &[NodeProcessor] {
        &self.processors
    }

    /// Node ids in the order they run.
    pub fn schedule(&self) -> Vec<NodeId> {
        self.processors.iter().map(|p| p.node_id.clone()).collect()
    }

    pub fn exported_inputs(&self) -> &ExportedInputs {
        &self.inputs
    }

    pub fn exported_outputs(&self) -> &[ExportedOutput] {
        &self.outputs
    }

    pub async fn process(&self, params: Params) -> Result<ProcessResult> {
        Execution::new(self, params)?.run().await
    }

    /// First rejection reported by a step's validation hook, in schedule order.
    pub async fn validate(&self, params: Params) -> Result<Validation> {
        let store = RegisterStore::seed(&self.inputs, params)?;
        for processor in &self.processors {
            let validation = processor.validate(&store).await?;
            if !validation.is_valid() {
                return Ok(validation);
            }
        }
        Ok(Validation::Valid)
    }

    /// Concatenated fingerprints of every step that has a change-detection hook.
    pub async fn is_changed(&self, params: Params) -> Result<String> {
        let store = RegisterStore::seed(&self.inputs, params)?;
        let mut fingerprint = String::new();
        for processor in self.processors.iter().filter(|p| p.has_change_detection()) {
            fingerprint.push_str(&processor.fingerprint(&store).await?);
        }
        Ok(fingerprint)
    }
}

#[async_trait]
impl StepDescriptor for IntegratedNode {
    fn input_types(&self) -> InputSchema {
        let mut schema = InputSchema::new();
        for (name, input) in &self.inputs {
            schema.collection_mut(input.collection).insert(name.clone(), input.spec.clone());
        }
        schema
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        self.outputs
            .iter()
            .map(|output| OutputSpec::new(&output.type_tag).named(&output.name))
            .collect()
    }

    fn is_output_node(&self) -> bool {
        self.output_node
    }

    fn has_validation(&self) -> bool {
        self.processors.iter().any(NodeProcessor::has_validation)
    }

    async fn validate_inputs(&self, params: &Params) -> Result<Validation> {
        self.validate(params.clone()).await
    }

    fn has_change_detection(&self) -> bool {
        self.processors.iter().any(NodeProcessor::has_change_detection)
    }

    async fn fingerprint(&self, params: &Params) -> Result<String> {
        self.is_changed(params.clone()).await
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        let ProcessResult { result, ui } = self.process(params).await?;
        Ok(StepOutput::Structured { result, ui })
    }
}
