use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::category::ExtensionMapping;
use crate::config::TaskConfig;
use crate::manifest::{group_by_destination, DestinationBatch, FsWriter, ManifestBuilder};
use crate::options::ManifestOptions;
use crate::package::metadata_source_for;

#[derive(Parser)]
#[command(name = "asset-manifest")]
#[command(about = "Generates JSON or YAML manifests that sort project files into asset collections")]
#[command(version)]
pub struct Cli {
    /// Log every classification step
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write one manifest for the given source paths
    Build {
        /// Source paths to classify
        sources: Vec<String>,

        /// Manifest output path
        #[arg(long)]
        dest: PathBuf,

        /// Output format: json, yaml or yml
        #[arg(long)]
        output: Option<String>,

        /// Spaces used to indent JSON output
        #[arg(long)]
        indent: Option<u64>,

        /// Sort top-level keys alphabetically
        #[arg(long)]
        sorted: bool,

        /// Keep control options and skip omissions
        #[arg(long)]
        debug: bool,

        /// Key to leave out of the manifest (repeatable)
        #[arg(long)]
        omit: Vec<String>,

        /// Project-description file (package.json or Cargo.toml)
        #[arg(long, default_value = "package.json")]
        package: PathBuf,

        /// Extra option as key=value; the value is parsed as JSON when possible
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Run targets from a task configuration file
    Run {
        /// Path to the task configuration (JSON or YAML)
        #[arg(long, default_value = "manifest.yaml")]
        config: PathBuf,

        /// Targets to run; all targets when omitted
        targets: Vec<String>,
    },

    /// Show which collection each path falls into
    Classify {
        paths: Vec<String>,
    },
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            sources,
            dest,
            output,
            indent,
            sorted,
            debug,
            omit,
            package,
            set,
        } => {
            let overrides = build_overrides(output, indent, sorted, debug, omit, &set)?;
            build_command(sources, dest, &package, overrides)
        }
        Commands::Run { config, targets } => run_command(&config, &targets),
        Commands::Classify { paths } => classify_command(&paths),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn build_overrides(
    output: Option<String>,
    indent: Option<u64>,
    sorted: bool,
    debug: bool,
    omit: Vec<String>,
    set: &[String],
) -> Result<Map<String, Value>> {
    let mut overrides = Map::new();

    for pair in set {
        let (key, value) = parse_set(pair)?;
        overrides.insert(key, value);
    }

    if let Some(output) = output {
        overrides.insert("output".into(), Value::String(output));
    }
    if let Some(indent) = indent {
        overrides.insert("indent".into(), Value::from(indent));
    }
    if sorted {
        overrides.insert("sorted".into(), Value::Bool(true));
    }
    if debug {
        overrides.insert("debug".into(), Value::Bool(true));
    }
    if !omit.is_empty() {
        overrides.insert("omit".into(), Value::from(omit));
    }

    Ok(overrides)
}

/// Parses `key=value`. The value is read as JSON, falling back to a plain string.
fn parse_set(pair: &str) -> Result<(String, Value)> {
    let (key, raw) = pair
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid option '{}'. Use key=value", pair))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("Invalid option '{}': empty key", pair));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn build_command(
    sources: Vec<String>,
    dest: PathBuf,
    package: &Path,
    overrides: Map<String, Value>,
) -> Result<()> {
    let source = metadata_source_for(package);
    let mut builder = ManifestBuilder::from_source(source.as_ref(), overrides);

    let batch = DestinationBatch::new(&dest, sources);
    let written = builder.write_all(&[batch], &mut FsWriter)
        .context("Failed to write manifest")?;

    for path in written {
        println!("Manifest path: {}", path.display());
    }

    Ok(())
}

fn run_command(config_path: &Path, targets: &[String]) -> Result<()> {
    let config = TaskConfig::load(config_path)?;
    let base_dir = config_path.parent().unwrap_or(Path::new(""));

    let selected = config.select_targets(targets)?;
    if selected.is_empty() {
        return Err(anyhow!("No targets defined in {}", config_path.display()));
    }

    let metadata = metadata_source_for(&config.package_path(base_dir)).load();

    for (name, target) in selected {
        info!("Running target {}", name);

        let entries = target.entries(base_dir)
            .with_context(|| format!("Failed to collect sources for target {}", name))?;
        let batches = group_by_destination(&entries);

        let options = ManifestOptions::new(metadata.as_ref(), config.target_options(target));
        let mut builder = ManifestBuilder::new(options);

        let written = builder.write_all(&batches, &mut FsWriter)
            .with_context(|| format!("Target {} failed", name))?;

        for path in written {
            println!("Manifest path: {}", path.display());
        }
    }

    Ok(())
}

fn classify_command(paths: &[String]) -> Result<()> {
    let mapping = ExtensionMapping::new();

    for path in paths {
        match mapping.map_path(path) {
            Some(category) => println!("{} -> {}", path, category),
            None => println!("{} -> main only", path),
        }
    }

    Ok(())
}
