use anyhow::{anyhow, Context, Result};
use cargo_metadata::{DependencyKind, MetadataCommand, Package};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata fields a project-description file may supply, in manifest order.
pub const METADATA_KEYS: [&str; 14] = [
    "name",
    "description",
    "version",
    "repository",
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
    "author",
    "contributors",
    "keywords",
    "homepage",
    "licenses",
    "engines",
];

/// Default metadata pulled from a project-description file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectMetadata {
    fields: Map<String, Value>,
}

impl ProjectMetadata {
    /// Keeps only the recognised metadata keys. Explicit `null`s are kept.
    pub fn from_map(map: Map<String, Value>) -> Self {
        let fields = map
            .into_iter()
            .filter(|(key, _)| METADATA_KEYS.contains(&key.as_str()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Supplies the optional project metadata. Absence is never an error.
pub trait MetadataSource {
    fn load(&self) -> Option<ProjectMetadata>;
}

impl<F> MetadataSource for F
where
    F: Fn() -> Option<ProjectMetadata>,
{
    fn load(&self) -> Option<ProjectMetadata> {
        self()
    }
}

pub struct NoMetadata;

impl MetadataSource for NoMetadata {
    fn load(&self) -> Option<ProjectMetadata> {
        None
    }
}

/// An npm-style `package.json`.
pub struct PackageJson {
    path: PathBuf,
}

impl PackageJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Result<ProjectMetadata> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from {}", self.path.display()))?;

        match value {
            Value::Object(map) => Ok(ProjectMetadata::from_map(map)),
            _ => Err(anyhow!("{} is not a JSON object", self.path.display())),
        }
    }
}

impl MetadataSource for PackageJson {
    fn load(&self) -> Option<ProjectMetadata> {
        match self.read() {
            Ok(metadata) => {
                debug!("Read project metadata from {}", self.path.display());
                Some(metadata)
            }
            Err(e) => {
                debug!("No project metadata: {:#}", e);
                None
            }
        }
    }
}

/// A Cargo package, read through `cargo metadata --no-deps`.
pub struct CargoPackage {
    manifest_path: PathBuf,
}

impl CargoPackage {
    pub fn new(manifest_path: impl AsRef<Path>) -> Self {
        Self {
            manifest_path: manifest_path.as_ref().to_path_buf(),
        }
    }

    fn read(&self) -> Result<ProjectMetadata> {
        let mut cmd = MetadataCommand::new();
        cmd.manifest_path(&self.manifest_path).no_deps();

        let metadata = cmd.exec()
            .context("Failed to execute cargo metadata")?;

        let manifest_path_canonical = self.manifest_path.canonicalize()
            .with_context(|| format!("Failed to canonicalize manifest path: {}", self.manifest_path.display()))?;

        let package = metadata.packages.iter()
            .find(|pkg| {
                pkg.manifest_path
                    .as_std_path()
                    .canonicalize()
                    .is_ok_and(|p| p == manifest_path_canonical)
            })
            .ok_or_else(|| anyhow!("Could not find package for manifest path: {}", self.manifest_path.display()))?;

        Ok(package_metadata(package))
    }
}

impl MetadataSource for CargoPackage {
    fn load(&self) -> Option<ProjectMetadata> {
        match self.read() {
            Ok(metadata) => {
                debug!("Read project metadata from {}", self.manifest_path.display());
                Some(metadata)
            }
            Err(e) => {
                debug!("No project metadata: {:#}", e);
                None
            }
        }
    }
}

/// Picks the source by file name: `Cargo.toml` reads a Cargo package,
/// anything else is treated as `package.json`.
pub fn metadata_source_for(path: &Path) -> Box<dyn MetadataSource> {
    if path.file_name().is_some_and(|name| name == "Cargo.toml") {
        Box::new(CargoPackage::new(path))
    } else {
        Box::new(PackageJson::new(path))
    }
}

fn package_metadata(package: &Package) -> ProjectMetadata {
    let mut fields = Map::new();

    fields.insert("name".into(), json!(package.name));
    if let Some(description) = &package.description {
        fields.insert("description".into(), json!(description));
    }
    fields.insert("version".into(), json!(package.version.to_string()));
    if let Some(repository) = &package.repository {
        fields.insert("repository".into(), json!(repository));
    }

    let mut dependencies = Map::new();
    let mut dev_dependencies = Map::new();
    let mut optional_dependencies = Map::new();
    for dep in &package.dependencies {
        let req = json!(dep.req.to_string());
        if dep.optional {
            optional_dependencies.insert(dep.name.clone(), req);
        } else if dep.kind == DependencyKind::Development {
            dev_dependencies.insert(dep.name.clone(), req);
        } else if dep.kind == DependencyKind::Normal {
            dependencies.insert(dep.name.clone(), req);
        }
    }
    for (key, deps) in [
        ("dependencies", dependencies),
        ("devDependencies", dev_dependencies),
        ("optionalDependencies", optional_dependencies),
    ] {
        if !deps.is_empty() {
            fields.insert(key.into(), Value::Object(deps));
        }
    }

    let mut authors = package.authors.iter();
    if let Some(author) = authors.next() {
        fields.insert("author".into(), json!(author));
    }
    let contributors: Vec<&String> = authors.collect();
    if !contributors.is_empty() {
        fields.insert("contributors".into(), json!(contributors));
    }

    if !package.keywords.is_empty() {
        fields.insert("keywords".into(), json!(package.keywords));
    }
    if let Some(homepage) = &package.homepage {
        fields.insert("homepage".into(), json!(homepage));
    }
    if let Some(license) = &package.license {
        fields.insert("licenses".into(), json!([{ "type": license }]));
    }
    if let Some(rust_version) = &package.rust_version {
        fields.insert("engines".into(), json!({ "rust": rust_version.to_string() }));
    }

    ProjectMetadata { fields }
}
