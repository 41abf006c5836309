use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use serde_json::ser::{PrettyFormatter, Serializer};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::collection::Classifier;
use crate::options::{ManifestOptions, OutputFormat};
use crate::package::MetadataSource;

/// One input path bound for a destination manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub path: String,
    pub dest: PathBuf,
}

impl SourceEntry {
    pub fn new(path: impl Into<String>, dest: impl AsRef<Path>) -> Self {
        Self {
            path: path.into(),
            dest: dest.as_ref().to_path_buf(),
        }
    }
}

/// All sources that share one destination, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationBatch {
    pub dest: PathBuf,
    pub sources: Vec<String>,
}

impl DestinationBatch {
    pub fn new(dest: impl AsRef<Path>, sources: Vec<String>) -> Self {
        Self {
            dest: dest.as_ref().to_path_buf(),
            sources,
        }
    }
}

/// Groups entries by destination. Destinations keep the order in which they
/// first appear.
pub fn group_by_destination(entries: &[SourceEntry]) -> Vec<DestinationBatch> {
    let mut grouped: IndexMap<&Path, Vec<String>> = IndexMap::new();

    for entry in entries {
        grouped
            .entry(entry.dest.as_path())
            .or_default()
            .push(entry.path.clone());
    }

    grouped
        .into_iter()
        .map(|(dest, sources)| DestinationBatch::new(dest, sources))
        .collect()
}

/// Receives rendered manifests.
pub trait ManifestWriter {
    fn write(&mut self, dest: &Path, contents: &str) -> Result<()>;
}

/// Writes manifests to disk, creating parent directories as needed.
#[derive(Debug, Default)]
pub struct FsWriter;

impl ManifestWriter for FsWriter {
    fn write(&mut self, dest: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create manifest directory: {}", parent.display()))?;
        }

        fs::write(dest, contents)
            .with_context(|| format!("Failed to write manifest to {}", dest.display()))
    }
}

/// Classifies, merges and renders manifests. The options are an accumulator:
/// each destination's collections become the baseline for the next.
pub struct ManifestBuilder {
    classifier: Classifier,
    options: ManifestOptions,
}

impl ManifestBuilder {
    pub fn new(options: ManifestOptions) -> Self {
        Self {
            classifier: Classifier::new(),
            options,
        }
    }

    /// Seeds the options from an optional metadata source plus overrides.
    pub fn from_source(source: &dyn MetadataSource, overrides: Map<String, Value>) -> Self {
        let metadata = source.load();
        Self::new(ManifestOptions::new(metadata.as_ref(), overrides))
    }

    pub fn options(&self) -> &ManifestOptions {
        &self.options
    }

    /// Runs one destination through classification and merging, and returns
    /// the rendered manifest text.
    pub fn build(&mut self, sources: &[String]) -> Result<String> {
        let fresh = self.classifier.classify(sources);
        self.options.merge_collections(&fresh);

        let settings = self.options.settings();
        debug!("Options: {:?}", settings);

        render(&self.options.shaped(), settings.output, &settings.indent)
    }

    /// Builds and writes every batch in order. Returns the written paths.
    pub fn write_all(
        &mut self,
        batches: &[DestinationBatch],
        writer: &mut dyn ManifestWriter,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(batches.len());

        for batch in batches {
            debug!("Processing {} sources for {}", batch.sources.len(), batch.dest.display());

            let contents = self.build(&batch.sources)
                .with_context(|| format!("Failed to render manifest {}", batch.dest.display()))?;

            writer.write(&batch.dest, &contents)?;
            info!("Manifest \"{}\" created", batch.dest.display());

            written.push(batch.dest.clone());
        }

        info!("Processed {} manifest(s)", written.len());
        Ok(written)
    }
}

/// Serializes `value` as YAML, or as JSON indented with `indent`. An empty
/// indent gives compact JSON.
pub fn render(value: &Map<String, Value>, format: OutputFormat, indent: &str) -> Result<String> {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .context("Failed to serialize manifest to YAML"),
        OutputFormat::Json if indent.is_empty() => serde_json::to_string(value)
            .context("Failed to serialize manifest to JSON"),
        OutputFormat::Json => {
            let mut buf = Vec::new();
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut buf, formatter);
            value.serialize(&mut serializer)
                .context("Failed to serialize manifest to JSON")?;
            String::from_utf8(buf).context("Manifest JSON is not valid UTF-8")
        }
    }
}
