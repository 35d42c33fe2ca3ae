#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use splice::steps::catalog::StepRegistry;
use splice::steps::{InputSchema, InputSpec, OutputSpec, Params, StepDescriptor, StepOutput, UiMap, Validation};
use std::fmt;
use std::sync::{Arc, Mutex};

type Handler = dyn Fn(&Params) -> Result<StepOutput> + Send + Sync;
type Validator = dyn Fn(&Params) -> Validation + Send + Sync;
type Fingerprinter = dyn Fn(&Params) -> String + Send + Sync;

/// Names of the steps invoked, in invocation order.
pub type Journal = Arc<Mutex<Vec<String>>>;

/// A step whose behaviour is a closure.
pub struct FnStep {
    inputs: InputSchema,
    outputs: Vec<OutputSpec>,
    output_node: bool,
    handler: Box<Handler>,
    validator: Option<Box<Validator>>,
    fingerprinter: Option<Box<Fingerprinter>>,
}

impl FnStep {
    pub fn new(
        inputs: InputSchema,
        outputs: Vec<OutputSpec>,
        handler: impl Fn(&Params) -> Result<StepOutput> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inputs,
            outputs,
            output_node: false,
            handler: Box::new(handler),
            validator: None,
            fingerprinter: None,
        }
    }

    pub fn output_node(mut self) -> Self {
        self.output_node = true;
        self
    }

    pub fn validator(mut self, f: impl Fn(&Params) -> Validation + Send + Sync + 'static) -> Self {
        self.validator = Some(Box::new(f));
        self
    }

    pub fn fingerprinter(mut self, f: impl Fn(&Params) -> String + Send + Sync + 'static) -> Self {
        self.fingerprinter = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for FnStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStep")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

#[async_trait]
impl StepDescriptor for FnStep {
    fn input_types(&self) -> InputSchema {
        self.inputs.clone()
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        self.outputs.clone()
    }

    fn is_output_node(&self) -> bool {
        self.output_node
    }

    fn has_validation(&self) -> bool {
        self.validator.is_some()
    }

    async fn validate_inputs(&self, params: &Params) -> Result<Validation> {
        Ok(self.validator.as_ref().map_or(Validation::Valid, |v| v(params)))
    }

    fn has_change_detection(&self) -> bool {
        self.fingerprinter.is_some()
    }

    async fn fingerprint(&self, params: &Params) -> Result<String> {
        Ok(self.fingerprinter.as_ref().map(|f| f(params)).unwrap_or_default())
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        (self.handler)(&params)
    }
}

pub fn int(params: &Params, name: &str) -> Result<i64> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow!("missing integer `{}`", name))
}

fn journalled(
    journal: &Journal,
    name: &'static str,
    f: impl Fn(&Params) -> Result<StepOutput> + Send + Sync + 'static,
) -> impl Fn(&Params) -> Result<StepOutput> + Send + Sync + 'static {
    let journal = journal.clone();
    move |params| {
        journal.lock().unwrap().push(name.to_string());
        f(params)
    }
}

/// Registry with the steps used across the test suite, plus the shared journal.
pub fn test_registry() -> (StepRegistry, Journal) {
    let registry = StepRegistry::new();
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let int_out = |name: &str| OutputSpec::new("INT").named(name);

    registry.register(
        "Emit",
        Arc::new(FnStep::new(
            InputSchema::new(),
            vec![int_out("x")],
            journalled(&journal, "Emit", |_| Ok(StepOutput::Plain(vec![json!(7)]))),
        )),
    );

    registry.register(
        "Double",
        Arc::new(FnStep::new(
            InputSchema::new().required("y", InputSpec::new("INT")),
            vec![int_out("doubled")],
            journalled(&journal, "Double", |p| Ok(StepOutput::Plain(vec![json!(int(p, "y")? * 2)]))),
        )),
    );

    registry.register(
        "Add",
        Arc::new(FnStep::new(
            InputSchema::new()
                .required("a", InputSpec::new("INT"))
                .required("b", InputSpec::new("INT")),
            vec![int_out("sum")],
            journalled(&journal, "Add", |p| Ok(StepOutput::Plain(vec![json!(int(p, "a")? + int(p, "b")?)]))),
        )),
    );

    registry.register(
        "Number",
        Arc::new(FnStep::new(
            InputSchema::new().required("value", InputSpec::new("INT")),
            vec![int_out("number")],
            journalled(&journal, "Number", |p| Ok(StepOutput::Plain(vec![json!(int(p, "value")?)]))),
        )),
    );

    registry.register(
        "Pair",
        Arc::new(FnStep::new(
            InputSchema::new(),
            vec![int_out("left"), int_out("right")],
            journalled(&journal, "Pair", |_| Ok(StepOutput::Plain(vec![json!(1), json!(2)]))),
        )),
    );

    registry.register(
        "Bias",
        Arc::new(FnStep::new(
            InputSchema::new()
                .required("value", InputSpec::new("INT"))
                .optional("bias", InputSpec::new("INT")),
            vec![int_out("biased")],
            journalled(&journal, "Bias", |p| {
                let bias = p.get("bias").and_then(Value::as_i64).unwrap_or(100);
                Ok(StepOutput::Plain(vec![json!(int(p, "value")? + bias)]))
            }),
        )),
    );

    registry.register(
        "Sampler",
        Arc::new(FnStep::new(
            InputSchema::new()
                .required("seed", InputSpec::new("INT"))
                .required("steps", InputSpec::new("INT"))
                .required("cfg", InputSpec::new("FLOAT")),
            vec![OutputSpec::new("LATENT")],
            journalled(&journal, "Sampler", |p| {
                Ok(StepOutput::Plain(vec![json!({ "seed": p.get("seed"), "steps": p.get("steps") })]))
            }),
        )),
    );

    registry.register(
        "LoadImage",
        Arc::new(FnStep::new(
            InputSchema::new()
                .required("image", InputSpec::new("STRING").with("image_upload", true))
                .required("mode", InputSpec::new("STRING")),
            vec![OutputSpec::new("IMAGE")],
            journalled(&journal, "LoadImage", |p| Ok(StepOutput::Plain(vec![p["image"].clone()]))),
        )),
    );

    registry.register(
        "Text",
        Arc::new(FnStep::new(
            InputSchema::new().required("text", InputSpec::new("STRING")),
            vec![OutputSpec::new("STRING").named("text")],
            journalled(&journal, "Text", |p| Ok(StepOutput::Plain(vec![p["text"].clone()]))),
        )),
    );

    registry.register(
        "Tagged",
        Arc::new(FnStep::new(
            InputSchema::new()
                .required("text", InputSpec::new("STRING"))
                .hidden("unique_id", "UNIQUE_ID"),
            vec![OutputSpec::new("STRING").named("tag")],
            journalled(&journal, "Tagged", |p| {
                let id = p.get("unique_id").cloned().unwrap_or(Value::Null);
                Ok(StepOutput::Plain(vec![json!(format!("{}:{}", p["text"].as_str().unwrap_or(""), id))]))
            }),
        )),
    );

    registry.register(
        "TaggedInt",
        Arc::new(FnStep::new(
            InputSchema::new().hidden("unique_id", "INT"),
            vec![int_out("id")],
            journalled(&journal, "TaggedInt", |p| Ok(StepOutput::Plain(vec![p["unique_id"].clone()]))),
        )),
    );

    registry.register(
        "Preview",
        Arc::new(
            FnStep::new(
                InputSchema::new().required("images", InputSpec::new("INT")),
                Vec::new(),
                journalled(&journal, "Preview", |p| {
                    let mut ui = UiMap::new();
                    ui.insert("images".to_string(), vec![p["images"].clone()]);
                    Ok(StepOutput::Structured { result: Vec::new(), ui })
                }),
            )
            .output_node(),
        ),
    );

    registry.register(
        "Checked",
        Arc::new(
            FnStep::new(
                InputSchema::new().required("value", InputSpec::new("INT")),
                vec![int_out("value")],
                journalled(&journal, "Checked", |p| Ok(StepOutput::Plain(vec![json!(int(p, "value")?)]))),
            )
            .validator(|p| match p.get("value").and_then(Value::as_i64) {
                Some(v) if v < 0 => Validation::Invalid(format!("value must be non-negative, got {}", v)),
                _ => Validation::Valid,
            })
            .fingerprinter(|p| format!("checked:{}", p.get("value").map(Value::to_string).unwrap_or_default())),
        ),
    );

    registry.register(
        "Fail",
        Arc::new(FnStep::new(
            InputSchema::new(),
            vec![int_out("never")],
            journalled(&journal, "Fail", |_| Err(anyhow!("boom"))),
        )),
    );

    registry.register(
        "Silent",
        Arc::new(FnStep::new(
            InputSchema::new(),
            vec![int_out("nothing")],
            journalled(&journal, "Silent", |_| Ok(StepOutput::Plain(Vec::new()))),
        )),
    );

    (registry, journal)
}

pub fn params(entries: &[(&str, Value)]) -> Params {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}
