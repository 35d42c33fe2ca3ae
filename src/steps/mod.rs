use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::Debug;

pub mod builtin;
pub mod catalog;

/// Named arguments passed to a step's entry point.
pub type Params = HashMap<String, Value>;

/// Side-channel values reported by steps, keyed by channel.
pub type UiMap = IndexMap<String, Vec<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputCollection {
    Required,
    Optional,
    /// Never positional, shared by name across a whole graph.
    Hidden,
}

impl InputCollection {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputCollection::Required => "required",
            InputCollection::Optional => "optional",
            InputCollection::Hidden => "hidden",
        }
    }
}

/// Declared type of an input plus free-form metadata (`default`, `image_upload`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl InputSpec {
    pub fn new(type_tag: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            meta: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.meta.get("default")
    }

    pub fn set_default(&mut self, value: Value) {
        self.meta.insert("default".to_string(), value);
    }

    pub fn flag(&self, key: &str) -> bool {
        self.meta.get(key).and_then(Value::as_bool) == Some(true)
    }
}

/// Input declaration of a step, grouped by collection in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputSchema {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub required: IndexMap<String, InputSpec>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub optional: IndexMap<String, InputSpec>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub hidden: IndexMap<String, InputSpec>,
}

impl InputSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: &str, spec: InputSpec) -> Self {
        self.required.insert(name.to_string(), spec);
        self
    }

    pub fn optional(mut self, name: &str, spec: InputSpec) -> Self {
        self.optional.insert(name.to_string(), spec);
        self
    }

    pub fn hidden(mut self, name: &str, type_tag: &str) -> Self {
        self.hidden.insert(name.to_string(), InputSpec::new(type_tag));
        self
    }

    pub fn collection_mut(&mut self, collection: InputCollection) -> &mut IndexMap<String, InputSpec> {
        match collection {
            InputCollection::Required => &mut self.required,
            InputCollection::Optional => &mut self.optional,
            InputCollection::Hidden => &mut self.hidden,
        }
    }

    /// Required, then optional, then hidden inputs.
    pub fn iter(&self) -> impl Iterator<Item = (InputCollection, &String, &InputSpec)> {
        self.required
            .iter()
            .map(|(name, spec)| (InputCollection::Required, name, spec))
            .chain(self.optional.iter().map(|(name, spec)| (InputCollection::Optional, name, spec)))
            .chain(self.hidden.iter().map(|(name, spec)| (InputCollection::Hidden, name, spec)))
    }

    pub fn len(&self) -> usize {
        self.required.len() + self.optional.len() + self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSpec {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub name: String,
}

impl OutputSpec {
    /// An output displayed under its type name.
    pub fn new(type_tag: &str) -> Self {
        Self {
            type_tag: type_tag.to_string(),
            name: type_tag.to_string(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

/// What a step's entry point returns.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Plain(Vec<Value>),
    Structured { result: Vec<Value>, ui: UiMap },
}

impl StepOutput {
    pub fn into_parts(self) -> (Vec<Value>, UiMap) {
        match self {
            StepOutput::Plain(result) => (result, UiMap::new()),
            StepOutput::Structured { result, ui } => (result, ui),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(String),
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }
}

/// A step implementation as seen by the graph compiler: schema, entry point and
/// the optional validation and change-detection hooks.
#[async_trait]
pub trait StepDescriptor: Send + Sync + Debug {
    fn input_types(&self) -> InputSchema;

    fn outputs(&self) -> Vec<OutputSpec>;

    /// Steps that produce user-visible results even when nothing consumes them.
    fn is_output_node(&self) -> bool {
        false
    }

    fn has_validation(&self) -> bool {
        false
    }

    async fn validate_inputs(&self, _params: &Params) -> Result<Validation> {
        Ok(Validation::Valid)
    }

    fn has_change_detection(&self) -> bool {
        false
    }

    /// Opaque cache-invalidation fingerprint for the given arguments.
    async fn fingerprint(&self, _params: &Params) -> Result<String> {
        Ok(String::new())
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput>;
}
