use crate::compiler::exports::{self, ExportOptions, ExportedInputs, ExportedOutput};
use crate::compiler::graph::create_nodes;
use crate::compiler::linker::connect_links;
use crate::compiler::scheduler::schedule;
use crate::dsl::RawGraph;
use crate::dsl::directive::Directive;
use crate::error::CompileError;
use crate::runtime::integrated::IntegratedNode;
use crate::runtime::processor::NodeProcessor;
use crate::steps::catalog::StepCatalog;
use tracing::{debug, info, warn};

/// Output of compiling one raw graph: the scheduled steps and the external surface.
#[derive(Debug)]
pub struct CompiledGraph {
    pub processors: Vec<NodeProcessor>,
    pub inputs: ExportedInputs,
    pub outputs: Vec<ExportedOutput>,
    pub output_node: bool,
}

pub struct Compiler<'a> {
    catalog: &'a dyn StepCatalog,
}

impl<'a> Compiler<'a> {
    pub fn new(catalog: &'a dyn StepCatalog) -> Self {
        Self { catalog }
    }

    pub fn compile(&self, graph: &RawGraph, options: &ExportOptions) -> Result<CompiledGraph, CompileError> {
        // 1. Instantiate nodes, sorted by order hint
        let node_graph = create_nodes(&graph.nodes, self.catalog)?;
        let mut nodes = node_graph.nodes;

        // 2. Wire links into consumer registers and dependencies
        let wiring = connect_links(&graph.links, &mut nodes)?;

        // 3. External surface; hidden inputs are always part of it
        let outputs = exports::export_outputs(&mut nodes, options);
        let mut inputs = node_graph.hidden;
        exports::export_inputs(&nodes, &wiring.linked, &mut inputs);

        // 4. Execution order
        let order = schedule(&nodes, &wiring.dependencies)?;
        let processors: Vec<NodeProcessor> = order.iter().map(|&i| NodeProcessor::from_node(&nodes[i])).collect();
        debug!(order = ?processors.iter().map(|p| p.node_id.as_str()).collect::<Vec<_>>(), "scheduled graph");

        Ok(CompiledGraph {
            processors,
            inputs,
            outputs,
            output_node: nodes.iter().any(|node| node.is_output_node()),
        })
    }

    /// Compiles `graph` as directed and applies its input merges and renames.
    pub fn integrate(&self, name: &str, directive: &Directive, graph: &RawGraph) -> Result<IntegratedNode, CompileError> {
        let options = ExportOptions {
            export_outputs: directive.export_set(),
            rename_outputs: directive.rename_outputs.clone().into_iter().collect(),
        };
        let mut compiled = self.compile(graph, &options)?;

        for warning in exports::merge_inputs(&mut compiled.inputs, &directive.merge_inputs) {
            warn!(integration = name, "{}", warning);
        }
        for warning in exports::rename_inputs(&mut compiled.inputs, &directive.rename_inputs) {
            warn!(integration = name, "{}", warning);
        }

        info!(
            integration = name,
            steps = compiled.processors.len(),
            inputs = compiled.inputs.len(),
            outputs = compiled.outputs.len(),
            "compiled integrated node"
        );

        let display_name = directive.display_name.as_deref().unwrap_or(name);
        Ok(IntegratedNode::new(name, compiled)
            .with_display_name(display_name)
            .with_category(directive.category_or_default()))
    }
}
