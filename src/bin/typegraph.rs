//! Typegraph CLI
//!
//! Converts a JSON Schema file into a type graph and prints a summary, the
//! graph as JSON, or a GraphViz DOT rendering.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use schema_typegraph::{
    top_level_refs, Converter, DocumentStore, FileStore, OutputFormat, Reference, TypeGraph, TypegraphConfig,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "typegraph")]
#[command(about = "Convert a JSON Schema into a deduplicated type graph")]
struct Cli {
    /// Schema file to convert
    schema: PathBuf,

    /// Extra top-level type as NAME=REF (e.g. Pet=#/definitions/Pet)
    #[arg(short, long = "top-level", value_name = "NAME=REF")]
    top_level: Vec<String>,

    /// Do not register definitions as top-level types
    #[arg(long)]
    no_definitions: bool,

    /// Output format (defaults to the configured one)
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Recursion budget, 0 disables
    #[arg(long)]
    max_depth: Option<usize>,

    /// Load every *.json under the schema's directory before converting, so
    /// the bundle hash covers the whole directory
    #[arg(long)]
    preload: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Summary,
    Json,
    Dot,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Summary => OutputFormat::Summary,
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Dot => OutputFormat::Dot,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match TypegraphConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, mut config: TypegraphConfig) -> anyhow::Result<()> {
    if let Some(depth) = cli.max_depth {
        config.convert.max_depth = depth;
    }
    if cli.no_definitions {
        config.convert.include_definitions = false;
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }

    let base_dir = match cli.schema.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let address = cli
        .schema
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("not a schema file: {}", cli.schema.display()))?;

    let mut store = FileStore::new(&base_dir);
    if cli.preload {
        let loaded = store
            .preload_dir(&base_dir)
            .with_context(|| format!("preloading {}", base_dir.display()))?;
        info!(dir = %base_dir.display(), documents = loaded, "preloaded schema documents");
    }
    let document = store
        .fetch(&address)
        .with_context(|| format!("loading {}", cli.schema.display()))?;

    let entry_points = parse_entry_points(&cli.top_level, &address, &config.convert.root_name)?;
    let top_levels = top_level_refs(&document, &address, &entry_points, config.convert.include_definitions);
    info!(schema = %cli.schema.display(), top_levels = top_levels.len(), "converting");

    let mut graph = TypeGraph::new();
    Converter::new(&mut graph, &mut store, config.convert_options()).convert(&document, &address, &top_levels)?;

    let rendered = match config.output.format {
        OutputFormat::Summary => summary(&graph, &store),
        OutputFormat::Json if config.output.pretty => serde_json::to_string_pretty(&graph.snapshot())?,
        OutputFormat::Json => serde_json::to_string(&graph.snapshot())?,
        OutputFormat::Dot => graph.to_dot(),
    };

    match cli.output {
        Some(path) => {
            std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), "wrote type graph");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}

/// `NAME=REF` pairs, or the document root under `root_name` when none given
fn parse_entry_points(
    pairs: &[String],
    address: &str,
    root_name: &str,
) -> anyhow::Result<BTreeMap<String, Reference>> {
    if pairs.is_empty() {
        return Ok(BTreeMap::from([(root_name.to_string(), Reference::root(address))]));
    }

    let mut entry_points = BTreeMap::new();
    for pair in pairs {
        let Some((name, reference)) = pair.split_once('=') else {
            bail!("top-level must be NAME=REF, got '{}'", pair);
        };
        if name.is_empty() {
            bail!("top-level name is empty in '{}'", pair);
        }
        entry_points.insert(name.to_string(), Reference::parse(address, reference));
    }
    Ok(entry_points)
}

fn summary(graph: &TypeGraph, store: &FileStore) -> String {
    let mut out = String::new();

    out.push_str(&format!("Type graph: {} nodes, {} edges\n", graph.node_count(), graph.edge_count()));
    for (kind, count) in graph.kind_counts() {
        out.push_str(&format!("  {:<14} {}\n", kind, count));
    }

    out.push_str(&format!("\nTop-level types ({}):\n", graph.top_levels().len()));
    for (name, t) in graph.top_levels() {
        let resolved = graph.resolved(*t);
        out.push_str(&format!("  {:<24} {} ({})\n", name, resolved, graph.kind(resolved).label()));
    }

    let cycles = graph.cycles();
    out.push_str(&format!("\nCycles: {}\n", cycles.len()));
    for group in &cycles {
        let ids: Vec<String> = group.iter().map(|t| t.to_string()).collect();
        out.push_str(&format!("  {}\n", ids.join(" -> ")));
    }

    out.push_str(&format!("\nDocuments: {}\n", store.addresses().count()));
    out.push_str(&format!("Bundle hash: {}", store.bundle_hash()));
    out
}
