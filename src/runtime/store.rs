use crate::compiler::exports::ExportedInputs;
use crate::compiler::register::Register;
use crate::error::ExecutionError;
use crate::steps::Params;
use serde_json::Value;
use std::collections::HashMap;

/// Register-indexed values of one invocation. Never shared between invocations.
#[derive(Debug, Default)]
pub struct RegisterStore {
    values: HashMap<Register, Value>,
}

impl RegisterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes each named parameter into every register of the matching exported input.
    pub fn seed(inputs: &ExportedInputs, params: Params) -> Result<Self, ExecutionError> {
        let mut store = Self::new();
        for (name, value) in params {
            let input = inputs.get(&name).ok_or(ExecutionError::UnexpectedParameter(name))?;
            for register in &input.registers {
                store.set(*register, value.clone());
            }
        }
        Ok(store)
    }

    pub fn get(&self, register: Register) -> Option<&Value> {
        self.values.get(&register)
    }

    pub fn set(&mut self, register: Register, value: Value) {
        self.values.insert(register, value);
    }

    pub fn contains(&self, register: Register) -> bool {
        self.values.contains_key(&register)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
