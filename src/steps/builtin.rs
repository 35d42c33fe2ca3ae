use crate::steps::catalog::StepRegistry;
use crate::steps::{InputSchema, InputSpec, OutputSpec, Params, StepDescriptor, StepOutput, UiMap, Validation};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use evalexpr::{ContextWithMutableVariables, DefaultNumericTypes, HashMapContext, build_operator_tree, eval_with_context};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Registers the built-in steps under their type names.
pub fn register_builtin_steps(registry: &StepRegistry) {
    registry.register("Constant", Arc::new(ConstantStep));
    registry.register("Seed", Arc::new(SeedStep));
    registry.register("Expression", Arc::new(ExpressionStep));
    registry.register("JoinText", Arc::new(JoinTextStep));
    registry.register("ShowText", Arc::new(ShowTextStep));
}

fn param<'a>(params: &'a Params, name: &str) -> Result<&'a Value> {
    params.get(name).ok_or_else(|| anyhow!("missing parameter `{}`", name))
}

fn text_param(params: &Params, name: &str) -> Result<String> {
    match param(params, name)? {
        Value::String(s) => Ok(s.clone()),
        other => Ok(other.to_string()),
    }
}

/// Passes an integer through.
#[derive(Debug)]
pub struct ConstantStep;

#[async_trait]
impl StepDescriptor for ConstantStep {
    fn input_types(&self) -> InputSchema {
        InputSchema::new().required("value", InputSpec::new("INT").with("default", 0))
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![OutputSpec::new("INT").named("value")]
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        let value = param(&params, "value")?
            .as_i64()
            .ok_or_else(|| anyhow!("`value` must be an integer"))?;
        Ok(StepOutput::Plain(vec![json!(value)]))
    }
}

/// Integer seed with a generation-control companion widget.
#[derive(Debug)]
pub struct SeedStep;

#[async_trait]
impl StepDescriptor for SeedStep {
    fn input_types(&self) -> InputSchema {
        InputSchema::new().required(
            "seed",
            InputSpec::new("INT").with("default", 0).with("control_after_generate", true),
        )
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![OutputSpec::new("INT").named("seed")]
    }

    fn has_change_detection(&self) -> bool {
        true
    }

    async fn fingerprint(&self, params: &Params) -> Result<String> {
        Ok(param(params, "seed")?.to_string())
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        Ok(StepOutput::Plain(vec![param(&params, "seed")?.clone()]))
    }
}

/// Evaluates an arithmetic expression over the optional `a` and `b` inputs.
#[derive(Debug)]
pub struct ExpressionStep;

impl ExpressionStep {
    fn context(params: &Params) -> Result<HashMapContext<DefaultNumericTypes>> {
        let mut ctx = HashMapContext::<DefaultNumericTypes>::new();
        for name in ["a", "b"] {
            let value = match params.get(name) {
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(i) => evalexpr::Value::Int(i),
                    None => evalexpr::Value::Float(n.as_f64().unwrap_or_default()),
                },
                Some(other) => return Err(anyhow!("`{}` must be a number, got {}", name, other)),
                None => continue,
            };
            ctx.set_value(name.to_string(), value)?;
        }
        Ok(ctx)
    }
}

#[async_trait]
impl StepDescriptor for ExpressionStep {
    fn input_types(&self) -> InputSchema {
        InputSchema::new()
            .required("expression", InputSpec::new("STRING").with("default", "a + b"))
            .optional("a", InputSpec::new("FLOAT"))
            .optional("b", InputSpec::new("FLOAT"))
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![OutputSpec::new("FLOAT").named("result")]
    }

    fn has_validation(&self) -> bool {
        true
    }

    async fn validate_inputs(&self, params: &Params) -> Result<Validation> {
        let Some(expression) = params.get("expression").and_then(Value::as_str) else {
            return Ok(Validation::Invalid("expression must be a string".to_string()));
        };
        Ok(match build_operator_tree::<DefaultNumericTypes>(expression) {
            Ok(_) => Validation::Valid,
            Err(e) => Validation::Invalid(format!("invalid expression `{}`: {}", expression, e)),
        })
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        let expression = text_param(&params, "expression")?;
        let ctx = Self::context(&params)?;
        let result = match eval_with_context(&expression, &ctx)? {
            evalexpr::Value::Int(i) => json!(i as f64),
            evalexpr::Value::Float(f) => json!(f),
            other => return Err(anyhow!("expression `{}` did not produce a number: {}", expression, other)),
        };
        Ok(StepOutput::Plain(vec![result]))
    }
}

#[derive(Debug)]
pub struct JoinTextStep;

#[async_trait]
impl StepDescriptor for JoinTextStep {
    fn input_types(&self) -> InputSchema {
        InputSchema::new()
            .required("text_a", InputSpec::new("STRING"))
            .required("text_b", InputSpec::new("STRING"))
            .required("separator", InputSpec::new("STRING").with("default", " "))
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        vec![OutputSpec::new("STRING").named("text")]
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        let separator = params.get("separator").and_then(Value::as_str).unwrap_or(" ");
        let joined = format!("{}{}{}", text_param(&params, "text_a")?, separator, text_param(&params, "text_b")?);
        Ok(StepOutput::Plain(vec![Value::String(joined)]))
    }
}

/// Output step: reports its text on the `text` ui channel.
#[derive(Debug)]
pub struct ShowTextStep;

#[async_trait]
impl StepDescriptor for ShowTextStep {
    fn input_types(&self) -> InputSchema {
        InputSchema::new()
            .required("text", InputSpec::new("STRING"))
            .hidden("unique_id", "UNIQUE_ID")
    }

    fn outputs(&self) -> Vec<OutputSpec> {
        Vec::new()
    }

    fn is_output_node(&self) -> bool {
        true
    }

    async fn invoke(&self, params: Params) -> Result<StepOutput> {
        let text = text_param(&params, "text")?;
        info!(unique_id = ?params.get("unique_id"), "[SHOW] {}", text);
        let mut ui = UiMap::new();
        ui.insert("text".to_string(), vec![Value::String(text)]);
        Ok(StepOutput::Structured { result: Vec::new(), ui })
    }
}
