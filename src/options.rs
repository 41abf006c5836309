use serde_json::{Map, Value};

use crate::category::Category;
use crate::collection::{Collection, CollectionSet};
use crate::package::{METADATA_KEYS, ProjectMetadata};

/// Options that steer rendering. Always dropped from output unless `debug` is set.
pub const CONTROL_KEYS: [&str; 5] = ["indent", "sorted", "debug", "omit", "output"];

const DEFAULT_INDENT: usize = 2;
const MAX_INDENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// `yaml` and `yml` in any case select YAML; anything else is JSON.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "yaml" | "yml" => OutputFormat::Yaml,
            _ => OutputFormat::Json,
        }
    }
}

/// Typed view over the control options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub debug: bool,
    pub indent: String,
    pub sorted: bool,
    pub omit: Vec<String>,
    pub output: OutputFormat,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestOptions {
    entries: Map<String, Value>,
}

impl ManifestOptions {
    /// Builds the option mapping. Keys are laid out as metadata keys first,
    /// then control keys, then remaining overrides in their own order. An
    /// override replaces its default in place.
    pub fn new(metadata: Option<&ProjectMetadata>, overrides: Map<String, Value>) -> Self {
        let mut entries = Map::new();

        for key in METADATA_KEYS {
            let value = overrides
                .get(key)
                .or_else(|| metadata.and_then(|m| m.get(key)));
            if let Some(value) = value {
                entries.insert(key.to_string(), value.clone());
            }
        }

        for (key, default) in control_defaults() {
            let value = overrides.get(key).cloned().unwrap_or(default);
            entries.insert(key.to_string(), value);
        }

        for (key, value) in overrides {
            if !entries.contains_key(&key) {
                entries.insert(key, value);
            }
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            debug: self.get("debug").and_then(Value::as_bool).unwrap_or(false),
            indent: indent_text(self.get("indent")),
            sorted: self.get("sorted").and_then(Value::as_bool).unwrap_or(false),
            omit: self
                .get("omit")
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter_map(Value::as_str).map(String::from).collect())
                .unwrap_or_default(),
            output: self
                .get("output")
                .and_then(Value::as_str)
                .map(OutputFormat::parse)
                .unwrap_or_default(),
        }
    }

    /// The collections currently held in the options. `documents` is never
    /// held, so it always comes back empty.
    pub fn collections(&self) -> CollectionSet {
        let mut set = CollectionSet::default();
        for category in Category::MERGED {
            *set.get_mut(category) = Collection::from_value(self.get(category.as_str()));
        }
        set
    }

    /// Unions `fresh` into the held collections, new entries first, and
    /// writes each merged collection back under its category name.
    pub fn merge_collections(&mut self, fresh: &CollectionSet) {
        let previous = self.collections();
        for category in Category::MERGED {
            let merged = fresh.get(category).union(previous.get(category));
            self.entries.insert(category.as_str().to_string(), merged.to_value());
        }
    }

    /// The mapping that gets serialized: omitted and control keys removed
    /// (unless `debug`), then keys sorted if `sorted` is set.
    pub fn shaped(&self) -> Map<String, Value> {
        let settings = self.settings();

        let chosen: Map<String, Value> = if settings.debug {
            self.entries.clone()
        } else {
            self.entries
                .iter()
                .filter(|(key, _)| {
                    !CONTROL_KEYS.contains(&key.as_str()) && !settings.omit.contains(key)
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        };

        if settings.sorted {
            let mut pairs: Vec<(String, Value)> = chosen.into_iter().collect();
            pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
            pairs.into_iter().collect()
        } else {
            chosen
        }
    }
}

fn control_defaults() -> [(&'static str, Value); 5] {
    [
        ("debug", Value::Bool(false)),
        ("indent", Value::from(DEFAULT_INDENT)),
        ("sorted", Value::Bool(false)),
        ("omit", Value::Array(Vec::new())),
        ("output", Value::String("json".into())),
    ]
}

/// Indent text in the style of `JSON.stringify`: a number means that many
/// spaces, a string is used as-is, both capped at ten. Any other value
/// gives no indent, i.e. compact output.
fn indent_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => {
            let width = n
                .as_u64()
                .map(|w| w as usize)
                .or_else(|| n.as_f64().map(|f| if f > 0.0 { f as usize } else { 0 }))
                .unwrap_or(0);
            " ".repeat(width.min(MAX_INDENT))
        }
        Some(Value::String(s)) => s.chars().take(MAX_INDENT).collect(),
        Some(_) => String::new(),
        None => " ".repeat(DEFAULT_INDENT),
    }
}
