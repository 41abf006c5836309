use anyhow::{anyhow, Context, Result};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::manifest::SourceEntry;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Project-description file, relative to the config file.
    #[serde(default)]
    pub package: Option<PathBuf>,

    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default)]
    pub targets: IndexMap<String, TargetConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default)]
    pub files: Vec<FileMapping>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileMapping {
    pub src: SourceList,
    pub dest: PathBuf,
}

/// `src` may be a single pattern or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceList {
    One(String),
    Many(Vec<String>),
}

impl SourceList {
    pub fn patterns(&self) -> &[String] {
        match self {
            SourceList::One(pattern) => std::slice::from_ref(pattern),
            SourceList::Many(patterns) => patterns,
        }
    }
}

impl TaskConfig {
    /// Reads a config file; `.yaml`/`.yml` files are YAML, everything else JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config from {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config from {}", path.display()))
        }
    }

    /// The targets to run, in file order. An empty `names` selects all of them.
    pub fn select_targets(&self, names: &[String]) -> Result<Vec<(&str, &TargetConfig)>> {
        if names.is_empty() {
            return Ok(self.targets.iter().map(|(name, target)| (name.as_str(), target)).collect());
        }

        names
            .iter()
            .map(|name| {
                self.targets
                    .get_key_value(name)
                    .map(|(name, target)| (name.as_str(), target))
                    .ok_or_else(|| anyhow!("Unknown target: {}", name))
            })
            .collect()
    }

    /// Task options with the target's options laid over them.
    pub fn target_options(&self, target: &TargetConfig) -> Map<String, Value> {
        let mut options = self.options.clone();
        for (key, value) in &target.options {
            options.insert(key.clone(), value.clone());
        }
        options
    }

    pub fn package_path(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.package.as_deref().unwrap_or(Path::new("package.json")))
    }
}

impl TargetConfig {
    /// Expands every mapping into source entries. Sources are reported
    /// relative to `base_dir`; destinations are joined onto it.
    pub fn entries(&self, base_dir: &Path) -> Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();

        for mapping in &self.files {
            let dest = base_dir.join(&mapping.dest);
            for path in expand_sources(base_dir, mapping.src.patterns())? {
                entries.push(SourceEntry::new(path, &dest));
            }
        }

        Ok(entries)
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expands source patterns in order. Literal paths are kept as written and
/// never checked for existence; glob patterns match files only; a leading
/// `!` removes earlier matches.
pub fn expand_sources(base_dir: &Path, patterns: &[String]) -> Result<Vec<String>> {
    let mut sources: IndexSet<String> = IndexSet::new();

    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            let exclude = glob::Pattern::new(negated)
                .with_context(|| format!("Invalid glob pattern: {}", negated))?;
            sources.retain(|path| !exclude.matches(path));
            continue;
        }

        if !is_glob(pattern) {
            sources.insert(pattern.clone());
            continue;
        }

        let full_pattern = base_dir.join(pattern);
        let full_pattern = full_pattern
            .to_str()
            .ok_or_else(|| anyhow!("Pattern is not valid UTF-8: {}", full_pattern.display()))?;

        let matches = glob::glob(full_pattern)
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;

        for entry in matches {
            let path = entry.with_context(|| format!("Failed to expand {}", pattern))?;
            if !path.is_file() {
                continue;
            }
            let relative = path.strip_prefix(base_dir).unwrap_or(&path);
            sources.insert(relative.to_string_lossy().into_owned());
        }
    }

    debug!("Expanded {} pattern(s) into {} source(s)", patterns.len(), sources.len());
    Ok(sources.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML_CONFIG: &str = r#"
package: meta/package.json
options:
  indent: 4
  sorted: false
targets:
  site:
    options:
      sorted: true
    files:
      - src: ["index.html", "app.js"]
        dest: dist/site.json
  docs:
    files:
      - src: README.md
        dest: dist/docs.yml
"#;

    #[test]
    fn test_load_yaml_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.yaml");
        fs::write(&path, YAML_CONFIG).unwrap();

        let config = TaskConfig::load(&path).unwrap();
        assert_eq!(config.targets.keys().collect::<Vec<_>>(), ["site", "docs"]);
        assert_eq!(
            config.package_path(Path::new("base")),
            Path::new("base/meta/package.json")
        );

        let (_, site) = config.select_targets(&["site".to_string()]).unwrap()[0];
        let options = config.target_options(site);
        assert_eq!(options["indent"], 4);
        assert_eq!(options["sorted"], true);
    }

    #[test]
    fn test_load_json_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");
        fs::write(
            &path,
            r#"{"targets": {"only": {"files": [{"src": "a.js", "dest": "out.json"}]}}}"#,
        ).unwrap();

        let config = TaskConfig::load(&path).unwrap();
        assert!(config.options.is_empty());
        assert_eq!(config.package_path(temp_dir.path()), temp_dir.path().join("package.json"));

        let entries = config.targets["only"].entries(Path::new("")).unwrap();
        assert_eq!(entries, [SourceEntry::new("a.js", "out.json")]);
    }

    #[test]
    fn test_unknown_target() {
        let config: TaskConfig = serde_json::from_str(r#"{"targets": {"a": {}}}"#).unwrap();
        assert_eq!(config.select_targets(&[]).unwrap().len(), 1);

        let err = config.select_targets(&["b".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Unknown target: b");
    }

    #[test]
    fn test_expand_sources_with_globs() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        fs::create_dir_all(base.join("js/vendor")).unwrap();
        fs::write(base.join("js/app.js"), "").unwrap();
        fs::write(base.join("js/boot.js"), "").unwrap();
        fs::write(base.join("js/vendor/lib.js"), "").unwrap();

        let patterns = vec![
            "js/**/*.js".to_string(),
            "!js/vendor/**".to_string(),
            "missing.css".to_string(),
        ];
        let sources = expand_sources(base, &patterns).unwrap();

        let app = Path::new("js").join("app.js").to_string_lossy().into_owned();
        let boot = Path::new("js").join("boot.js").to_string_lossy().into_owned();
        assert_eq!(sources, [app, boot, "missing.css".to_string()]);
    }

    #[test]
    fn test_expand_sources_drops_repeats() {
        let patterns: Vec<String> = (0..10_000)
            .map(|i| format!("lib/file{}.js", i % 2_500))
            .chain(["!lib/file1*.js".to_string()])
            .collect();

        let sources = expand_sources(Path::new(""), &patterns).unwrap();
        assert_eq!(sources.first().map(String::as_str), Some("lib/file0.js"));
        assert_eq!(sources.get(1).map(String::as_str), Some("lib/file2.js"));
        assert!(sources.iter().all(|s| !s.starts_with("lib/file1")));
        assert_eq!(sources.len(), 2_500 - 1_111);
    }

    #[test]
    fn test_invalid_glob() {
        let err = expand_sources(Path::new(""), &["src/[".to_string()]).unwrap_err();
        assert!(err.to_string().contains("Invalid glob pattern"));
    }
}
