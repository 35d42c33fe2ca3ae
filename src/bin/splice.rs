use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use splice::compiler::core::Compiler;
use splice::compiler::exports::ExportOptions;
use splice::compiler::loader::{Loader, load_graph};
use splice::dsl::NodeId;
use splice::dsl::directive::Directive;
use splice::runtime::integrated::IntegratedNode;
use splice::steps::builtin::register_builtin_steps;
use splice::steps::catalog::{StepCatalog, StepRegistry};
use splice::steps::{Params, StepOutput, Validation};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every directive in a directory and print the resulting nodes
    List {
        /// Directory containing directive YAML files
        #[arg(long, short)]
        dir: PathBuf,

        /// Directory relative graph paths resolve against (defaults to --dir)
        #[arg(long)]
        base_dir: Option<PathBuf>,
    },

    /// Run one integrated node with the given parameters
    Run {
        #[arg(long, short)]
        dir: PathBuf,

        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Name of the node to run
        #[arg(long, short)]
        node: String,

        /// Parameters (key=value, value parsed as JSON when possible)
        #[arg(long, short = 'D', value_parser = parse_key_val)]
        vars: Vec<(String, serde_json::Value)>,
    },

    /// Compile a single graph file against the built-in steps and print its schedule
    Inspect {
        #[arg(long, short)]
        graph: PathBuf,

        /// Explicit output export key ("<node-id> <output-name>"), repeatable
        #[arg(long)]
        export: Vec<String>,
    },

    /// Write a directive stub and a copy of the graph for a new integrated node
    Scaffold {
        #[arg(long, short)]
        graph: PathBuf,

        #[arg(long, short)]
        name: String,

        #[arg(long, short)]
        category: Option<String>,

        /// Directory to write `<name>.yaml` and `<name>.json` into
        #[arg(long, short)]
        out: PathBuf,

        /// Only keep these node ids; links leaving the selection are cut
        #[arg(long, value_delimiter = ',')]
        nodes: Vec<String>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, serde_json::Value), String> {
    let pos = s.find('=').ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    let key = s[..pos].to_string();
    let val_str = &s[pos + 1..];
    // Try parsing as JSON, otherwise treat as string
    let val = serde_json::from_str(val_str).unwrap_or_else(|_| serde_json::Value::String(val_str.to_string()));
    Ok((key, val))
}

fn builtin_registry() -> StepRegistry {
    let registry = StepRegistry::new();
    register_builtin_steps(&registry);
    registry
}

fn describe(node: &IntegratedNode) {
    println!("{} ({}) [{}]", node.name(), node.display_name(), node.category());
    for (name, input) in node.exported_inputs() {
        println!("  in  {:<24} {:<10} {}", name, input.type_tag(), input.collection.as_str());
    }
    for output in node.exported_outputs() {
        println!("  out {:<24} {}", output.name, output.type_tag);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { dir, base_dir } => {
            let registry = builtin_registry();
            let loader = Loader::new(&registry, base_dir.unwrap_or_else(|| dir.clone()));
            let report = loader.load_dir(&dir)?;
            for node in &report.integrated {
                describe(node);
            }
            if !report.skipped.is_empty() {
                println!("skipped: {}", report.skipped.join(", "));
            }
        }

        Commands::Run { dir, base_dir, node, vars } => {
            let registry = builtin_registry();
            let loader = Loader::new(&registry, base_dir.unwrap_or_else(|| dir.clone()));
            loader.load_dir(&dir)?;

            let step = registry.lookup(&node).ok_or_else(|| anyhow!("no node named `{}`", node))?;
            let params: Params = vars.into_iter().collect();

            if step.has_validation() {
                if let Validation::Invalid(reason) = step.validate_inputs(&params).await? {
                    bail!("validation failed for `{}`: {}", node, reason);
                }
            }

            info!("Running {}", node);
            let (result, ui) = match step.invoke(params).await? {
                StepOutput::Plain(result) => (result, Default::default()),
                StepOutput::Structured { result, ui } => (result, ui),
            };
            println!("{}", serde_json::to_string_pretty(&json!({ "result": result, "ui": ui }))?);
        }

        Commands::Inspect { graph, export } => {
            let registry = builtin_registry();
            let raw = load_graph(&graph)?;
            let options = ExportOptions {
                export_outputs: (!export.is_empty()).then(|| export.into_iter().collect()),
                ..Default::default()
            };
            let compiled = Compiler::new(&registry).compile(&raw, &options)?;
            let node = IntegratedNode::new(&graph.to_string_lossy(), compiled);

            let order: Vec<String> = node.schedule().iter().map(ToString::to_string).collect();
            println!("schedule: {}", order.join(" -> "));
            describe(&node);
        }

        Commands::Scaffold { graph, name, category, out, nodes } => {
            let directive = Directive::scaffold(&name, category.as_deref())?;
            // Refuse graphs that would not load later
            let raw = load_graph(&graph)?;

            fs::create_dir_all(&out)?;
            let workflow_path = out.join(&directive.workflow);
            if nodes.is_empty() {
                fs::copy(&graph, &workflow_path)?;
            } else {
                let ids: Vec<NodeId> = nodes.iter().map(|id| NodeId::from(id.trim())).collect();
                let known = raw.node_ids();
                let unknown: Vec<&str> = ids.iter().filter(|id| !known.contains(id)).map(NodeId::as_str).collect();
                if !unknown.is_empty() {
                    bail!("unknown node ids in selection: {}", unknown.join(", "));
                }
                let selection = raw.select(&ids);
                fs::write(&workflow_path, serde_json::to_string_pretty(&selection)?)?;
                info!(
                    "Kept {} of {} nodes and {} of {} links",
                    selection.nodes.len(),
                    raw.nodes.len(),
                    selection.links.len(),
                    raw.links.len()
                );
            }
            let yaml_path = out.join(format!("{}.yaml", name));
            fs::write(&yaml_path, directive.to_yaml(&name)?)?;
            info!("Wrote {}", yaml_path.display());
        }
    }

    Ok(())
}
