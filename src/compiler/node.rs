use crate::compiler::register::Register;
use crate::dsl::{NodeId, RawNode};
use crate::error::CompileError;
use crate::steps::{InputCollection, InputSpec, StepDescriptor};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Integer inputs with these names carry a generation-control widget in graphs
/// saved by editors that predate the `control_after_generate` flag.
const SEED_INPUTS: [&str; 2] = ["seed", "denoise_seed"];

/// One input of a node, or an exported input of a compiled graph.
///
/// `registers[0]` is where the owning step reads its argument; merged exports
/// accumulate further registers that a caller-supplied value fans out to.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub name: String,
    pub collection: InputCollection,
    pub spec: InputSpec,
    pub registers: Vec<Register>,
}

impl Input {
    pub fn new(name: &str, collection: InputCollection, spec: InputSpec) -> Self {
        Self {
            name: name.to_string(),
            collection,
            spec,
            registers: vec![Register::allocate()],
        }
    }

    pub fn register(&self) -> Register {
        self.registers[0]
    }

    pub fn type_tag(&self) -> &str {
        &self.spec.type_tag
    }

    fn has_companion_widget(&self) -> bool {
        self.spec.flag("control_after_generate")
            || self.spec.flag("image_upload")
            || (self.type_tag() == "INT" && SEED_INPUTS.contains(&self.name.as_str()))
    }
}

/// One declared output and every register its value is written to.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub type_tag: String,
    pub consumers: Vec<Register>,
}

/// Hidden inputs of a graph, shared by name across its nodes.
pub type HiddenInputs = IndexMap<String, Input>;

/// One instantiated step inside a graph being compiled.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub type_name: String,
    pub step: Arc<dyn StepDescriptor>,
    /// Argument name to the register the step reads it from, hidden inputs included.
    pub input_map: IndexMap<String, Register>,
    /// Value inputs, fed by positional defaults or by the caller.
    pub inputs: Vec<Input>,
    /// Inputs the raw graph declared as link-fed, indexed by link slot.
    pub input_slots: Vec<Input>,
    pub outputs: Vec<Output>,
    pub order: i64,
}

impl Node {
    pub fn new(
        id: NodeId,
        raw: &RawNode,
        step: Arc<dyn StepDescriptor>,
        hidden: &mut HiddenInputs,
    ) -> Result<Self, CompileError> {
        let outputs = step
            .outputs()
            .into_iter()
            .map(|spec| Output {
                name: spec.name,
                type_tag: spec.type_tag,
                consumers: Vec::new(),
            })
            .collect();

        let schema = step.input_types();
        let mut input_map = IndexMap::with_capacity(schema.len());
        let mut inputs = Vec::with_capacity(schema.required.len() + schema.optional.len());

        for (collection, name, spec) in schema.iter() {
            if collection != InputCollection::Hidden {
                let input = Input::new(name, collection, spec.clone());
                input_map.insert(name.clone(), input.register());
                inputs.push(input);
                continue;
            }

            let shared = hidden
                .entry(name.clone())
                .or_insert_with(|| Input::new(name, InputCollection::Hidden, spec.clone()));
            if shared.type_tag() != spec.type_tag {
                return Err(CompileError::HiddenInputTypeMismatch {
                    name: name.clone(),
                    existing: shared.type_tag().to_string(),
                    found: spec.type_tag.clone(),
                });
            }
            input_map.insert(name.clone(), shared.register());
        }

        Ok(Node {
            id,
            type_name: raw.kind.clone(),
            step,
            input_map,
            inputs,
            input_slots: Vec::new(),
            outputs,
            order: raw.order.unwrap_or(0),
        })
    }

    /// Moves the named inputs, in the given order, from `inputs` to `input_slots`.
    pub fn separate_input_slots<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<(), CompileError> {
        for name in names {
            let Some(position) = self.inputs.iter().position(|input| input.name == name) else {
                let node = self.id.clone();
                let name = name.to_string();
                return Err(if self.input_slots.iter().any(|slot| slot.name == name) {
                    CompileError::DuplicateSlotInput { node, name }
                } else {
                    CompileError::UnknownSlotInput { node, name }
                });
            };
            let input = self.inputs.remove(position);
            self.input_slots.push(input);
        }
        Ok(())
    }

    /// Assigns positional defaults to the value inputs in declaration order.
    ///
    /// An input with a companion widget is followed by that widget's value,
    /// which is skipped.
    pub fn assign_defaults(&mut self, defaults: &[Value]) {
        let mut values = defaults.iter();
        for input in self.inputs.iter_mut() {
            let Some(value) = values.next() else {
                return;
            };
            input.spec.set_default(value.clone());
            if input.has_companion_widget() {
                values.next();
            }
        }

        let extra = values.count();
        if extra > 0 {
            debug!(node = %self.id, extra, "ignoring positional values beyond the last input");
        }
    }

    pub fn is_output_node(&self) -> bool {
        self.step.is_output_node()
    }
}
