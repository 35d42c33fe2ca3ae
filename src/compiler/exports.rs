use crate::compiler::node::{Input, Node};
use crate::compiler::register::Register;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// External parameter surface of a compiled graph, in declaration order.
pub type ExportedInputs = IndexMap<String, Input>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedOutput {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub register: Register,
}

/// Which outputs become externally visible, and under which names.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// `"<node-id> <output-name>"` keys; `None` exports every output nothing consumes.
    pub export_outputs: Option<HashSet<String>>,
    pub rename_outputs: HashMap<String, String>,
}

/// Exports outputs in node order, attaching a fresh register to each exported one.
/// Exported names are unique; a repeated name gets the next free numeric suffix.
pub fn export_outputs(nodes: &mut [Node], options: &ExportOptions) -> Vec<ExportedOutput> {
    let mut exported: Vec<ExportedOutput> = Vec::new();
    for node in nodes.iter_mut() {
        let id = node.id.clone();
        for output in node.outputs.iter_mut() {
            let key = format!("{} {}", id, output.name);
            let selected = match &options.export_outputs {
                Some(keys) => keys.contains(&key),
                None => output.consumers.is_empty(),
            };
            if !selected {
                continue;
            }

            let name = options.rename_outputs.get(&key).unwrap_or(&output.name);
            let name = first_free_name(name, |candidate| exported.iter().any(|o| o.name == candidate));

            let register = Register::allocate();
            output.consumers.push(register);
            exported.push(ExportedOutput {
                name,
                type_tag: output.type_tag.clone(),
                register,
            });
        }
    }
    exported
}

/// Exports every slot and value input that no link feeds, slots first within a node.
pub fn export_inputs(nodes: &[Node], linked: &HashSet<Register>, exported: &mut ExportedInputs) {
    for node in nodes {
        for input in node.input_slots.iter().chain(node.inputs.iter()) {
            if linked.contains(&input.register()) {
                continue;
            }
            let name = unique_name(&input.name, exported);
            exported.insert(name, input.clone());
        }
    }
}

/// `name`, or the first free `name_2`, `name_3`, ...
pub fn unique_name(name: &str, taken: &ExportedInputs) -> String {
    first_free_name(name, |candidate| taken.contains_key(candidate))
}

fn first_free_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = name.to_string();
    let mut i = 1;
    while is_taken(&candidate) {
        i += 1;
        candidate = format!("{}_{}", name, i);
    }
    candidate
}

/// Folds each listed source input into its target so one caller value feeds all
/// of their registers. Returns a warning per skipped merge.
pub fn merge_inputs(inputs: &mut ExportedInputs, mapping: &IndexMap<String, Vec<String>>) -> Vec<String> {
    let mut warnings = Vec::new();
    for (target, sources) in mapping {
        let Some(target_type) = inputs.get(target).map(|input| input.type_tag().to_string()) else {
            warnings.push(format!("target input {} not found, merging skipped", target));
            continue;
        };

        for source in sources {
            if source == target {
                warnings.push(format!("cannot merge input {} into itself, merging skipped", source));
                continue;
            }
            let Some(source_type) = inputs.get(source).map(|input| input.type_tag().to_string()) else {
                warnings.push(format!("source input {} not found, merging skipped", source));
                continue;
            };
            if source_type != target_type {
                warnings.push(format!(
                    "cannot merge input {} into {}, type mismatch: {} vs. {}",
                    source, target, source_type, target_type
                ));
                continue;
            }

            if let Some(merged) = inputs.shift_remove(source) {
                if let Some(target_input) = inputs.get_mut(target) {
                    target_input.registers.extend(merged.registers);
                }
            }
        }
    }
    warnings
}

/// Renames exported inputs; the renamed input moves to the end of the surface.
/// Returns a warning per skipped rename.
pub fn rename_inputs(inputs: &mut ExportedInputs, mapping: &IndexMap<String, String>) -> Vec<String> {
    let mut warnings = Vec::new();
    for (old, new) in mapping {
        if !inputs.contains_key(old) {
            warnings.push(format!("cannot rename input {}, no input with this name exists", old));
            continue;
        }
        if inputs.contains_key(new) {
            warnings.push(format!(
                "cannot rename input {} to {}, another input with this name already exists",
                old, new
            ));
            continue;
        }
        if let Some(input) = inputs.shift_remove(old) {
            inputs.insert(new.clone(), input);
        }
    }
    warnings
}
