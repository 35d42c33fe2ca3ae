use crate::compiler::core::Compiler;
use crate::dsl::RawGraph;
use crate::dsl::directive::Directive;
use crate::runtime::integrated::IntegratedNode;
use crate::steps::catalog::StepRegistry;
use anyhow::{Context as AnyhowContext, Result, anyhow, bail};
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Parses a raw graph, unwrapping a node-template container if present.
pub fn parse_graph(text: &str) -> Result<RawGraph> {
    let value: Value = serde_json::from_str(text).context("graph is not valid JSON")?;
    let Some(object) = value.as_object() else {
        bail!("graph is not a dictionary");
    };

    let Some(Value::Array(templates)) = object.get("templates") else {
        return serde_json::from_value(value).context("failed to deserialize graph");
    };

    let template = match templates.as_slice() {
        [] => bail!("node templates file contains no templates"),
        [first] => first,
        [first, ..] => {
            warn!(count = templates.len(), "node templates file contains multiple templates, only the first one will be used");
            first
        }
    };
    let Some(template) = template.as_object() else {
        bail!("node template is not a dictionary");
    };
    let data = template
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("node template has no data string"))?;

    serde_json::from_str(data).context("node template data isn't a valid JSON graph")
}

pub fn load_graph(path: &Path) -> Result<RawGraph> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read graph file {}", path.display()))?;
    parse_graph(&text).with_context(|| format!("Failed to parse graph file {}", path.display()))
}

/// Reads every `*.yaml`/`*.yml` file in `dir`, in file name order, into one
/// name-to-record map. A later file replaces an earlier record of the same name.
pub fn load_directives(dir: &Path) -> Result<IndexMap<String, Value>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directive directory {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")))
        .collect();
    files.sort();

    let mut directives = IndexMap::new();
    for file in files {
        let parsed = fs::read_to_string(&file)
            .map_err(anyhow::Error::from)
            .and_then(|text| serde_yaml::from_str::<Value>(&text).map_err(anyhow::Error::from));
        match parsed {
            Ok(Value::Object(entries)) => directives.extend(entries),
            Ok(_) => warn!(file = %file.display(), "file does not contain a dictionary, ignoring"),
            Err(e) => warn!(file = %file.display(), error = %e, "failed to load directive file, ignoring"),
        }
    }
    Ok(directives)
}

/// Names of the integrated nodes a batch produced and of the entries it skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub integrated: Vec<Arc<IntegratedNode>>,
    pub skipped: Vec<String>,
}

impl LoadReport {
    pub fn names(&self) -> Vec<&str> {
        self.integrated.iter().map(|node| node.name()).collect()
    }
}

/// Compiles directive records into integrated nodes and registers them.
///
/// Every record is independent: one that fails only skips itself.
pub struct Loader<'a> {
    registry: &'a StepRegistry,
    base_dir: PathBuf,
}

impl<'a> Loader<'a> {
    /// Relative graph paths resolve against `base_dir`.
    pub fn new(registry: &'a StepRegistry, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            base_dir: base_dir.into(),
        }
    }

    pub fn load_dir(&self, dir: &Path) -> Result<LoadReport> {
        let directives = load_directives(dir)?;
        Ok(self.load_entries(&directives))
    }

    pub fn load_entries(&self, directives: &IndexMap<String, Value>) -> LoadReport {
        let mut report = LoadReport::default();
        for (name, value) in directives {
            match self.integrate_entry(name, value) {
                Some(node) => report.integrated.push(node),
                None => report.skipped.push(name.clone()),
            }
        }
        info!(loaded = report.integrated.len(), skipped = report.skipped.len(), "loaded integrated nodes");
        report
    }

    pub fn integrate_entry(&self, name: &str, value: &Value) -> Option<Arc<IntegratedNode>> {
        let directive = Directive::from_value(name, value)?;

        let path = self.base_dir.join(&directive.workflow);
        let graph = match load_graph(&path) {
            Ok(graph) => graph,
            Err(e) => {
                warn!(integration = name, error = ?e, "ignoring integrated node, failed loading workflow from file {}", path.display());
                return None;
            }
        };

        let compiler = Compiler::new(self.registry);
        let node = match compiler.integrate(name, &directive, &graph) {
            Ok(node) => Arc::new(node),
            Err(e) => {
                warn!(integration = name, error = %e, "ignoring integrated node, failed processing workflow");
                return None;
            }
        };

        self.registry.register_with_display_name(name, node.display_name(), node.clone());
        Some(node)
    }
}
