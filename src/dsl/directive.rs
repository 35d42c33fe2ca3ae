use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_CATEGORY: &str = "integrated";

/// Composition record describing how one raw graph becomes a single integrated step.
///
/// Parsing is lenient: optional fields of the wrong shape are dropped with a
/// warning instead of rejecting the whole record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Directive {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub workflow: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Explicit `"<node-id> <output-name>"` allow-list; `None` exports every unconsumed output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_outputs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub rename_outputs: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub merge_inputs: IndexMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub rename_inputs: IndexMap<String, String>,
}

impl Directive {
    pub fn new(workflow: impl Into<PathBuf>) -> Self {
        Self {
            workflow: workflow.into(),
            ..Default::default()
        }
    }

    pub fn export_output(mut self, key: &str) -> Self {
        self.export_outputs.get_or_insert_with(Vec::new).push(key.to_string());
        self
    }

    pub fn rename_output(mut self, key: &str, name: &str) -> Self {
        self.rename_outputs.insert(key.to_string(), name.to_string());
        self
    }

    pub fn merge_input(mut self, target: &str, sources: &[&str]) -> Self {
        self.merge_inputs
            .entry(target.to_string())
            .or_default()
            .extend(sources.iter().map(|s| s.to_string()));
        self
    }

    pub fn rename_input(mut self, old: &str, new: &str) -> Self {
        self.rename_inputs.insert(old.to_string(), new.to_string());
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_CATEGORY)
    }

    pub fn export_set(&self) -> Option<HashSet<String>> {
        self.export_outputs.as_ref().map(|keys| keys.iter().cloned().collect())
    }

    /// Reads a record from configuration. Returns `None` (after warning) when the
    /// record is unusable.
    pub fn from_value(name: &str, value: &Value) -> Option<Self> {
        let Some(info) = value.as_object() else {
            warn!(integration = name, "ignoring integrated node, not a dictionary");
            return None;
        };

        let workflow = match info.get("workflow") {
            Some(Value::String(path)) => PathBuf::from(path),
            Some(other) => {
                warn!(integration = name, "ignoring integrated node, workflow entry should be a path but got {}", other);
                return None;
            }
            None => {
                warn!(integration = name, "ignoring integrated node, missing required workflow entry");
                return None;
            }
        };

        let export_outputs = match info.get("export_outputs") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(strings(name, "export_outputs", items)),
            Some(other) => {
                warn!(integration = name, "export_outputs entry should be a list but got {}, ignoring", other);
                None
            }
        };

        Some(Directive {
            display_name: info.get("display_name").and_then(scalar_string),
            workflow,
            category: info.get("category").and_then(scalar_string),
            export_outputs,
            rename_outputs: string_map(name, "rename_outputs", info.get("rename_outputs")),
            merge_inputs: merge_map(name, info.get("merge_inputs")),
            rename_inputs: string_map(name, "rename_inputs", info.get("rename_inputs")),
        })
    }

    /// Creates the stub record for a freshly exported graph saved as `<name>.json`.
    pub fn scaffold(name: &str, category: Option<&str>) -> Result<Self> {
        validate_name(name)?;
        let category = category.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("Integrated");
        Ok(Directive::new(format!("{}.json", name)).display_name(name).category(category))
    }

    /// Renders `{name: record}` as a YAML document.
    pub fn to_yaml(&self, name: &str) -> Result<String> {
        let mut doc = IndexMap::new();
        doc.insert(name, self);
        Ok(serde_yaml::to_string(&doc)?)
    }
}

/// Integration names must be non-blank and must not read as a number.
pub fn validate_name(name: &str) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("the name cannot be empty or consist only of white space");
    }
    if reads_as_number(trimmed) {
        bail!("the name cannot consist of only numbers");
    }
    Ok(())
}

/// Numeric literal forms an editor front end coerces to a number: decimals with
/// an optional exponent, `Infinity`, and unsigned `0x`/`0o`/`0b` integers.
fn reads_as_number(text: &str) -> bool {
    if matches!(text, "Infinity" | "+Infinity" | "-Infinity") {
        return true;
    }
    let radix = match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &text[2..];
        return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
    }
    text.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')) && text.parse::<f64>().is_ok()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn strings(name: &str, field: &str, items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            let s = scalar_string(item);
            if s.is_none() {
                warn!(integration = name, "{} entry {} is not a string, ignoring", field, item);
            }
            s
        })
        .collect()
}

fn string_map(name: &str, field: &str, value: Option<&Value>) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (key, v) in entries {
                match scalar_string(v) {
                    Some(s) => {
                        map.insert(key.clone(), s);
                    }
                    None => warn!(integration = name, "{} entry {} should map to a name but got {}, ignoring", field, key, v),
                }
            }
        }
        Some(other) => warn!(integration = name, "{} entry should be a dictionary but got {}, ignoring", field, other),
    }
    map
}

fn merge_map(name: &str, value: Option<&Value>) -> IndexMap<String, Vec<String>> {
    let mut map = IndexMap::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Object(entries)) => {
            for (target, sources) in entries {
                let sources = match sources {
                    Value::Array(items) => strings(name, "merge_inputs", items),
                    single => match scalar_string(single) {
                        Some(s) => vec![s],
                        None => {
                            warn!(integration = name, "merge_inputs entry {} has invalid sources {}, ignoring", target, single);
                            continue;
                        }
                    },
                };
                map.insert(target.clone(), sources);
            }
        }
        Some(other) => warn!(integration = name, "merge_inputs entry should be a dictionary but got {}, ignoring", other),
    }
    map
}
