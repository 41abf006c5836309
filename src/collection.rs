use indexmap::IndexSet;
use serde_json::Value;
use tracing::debug;

use crate::category::{Category, ExtensionMapping};

/// Ordered list of paths, unique by value.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    paths: IndexSet<String>,
}

// IndexSet equality ignores order; collections compare in order.
impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.paths.iter().eq(other.paths.iter())
    }
}

impl Eq for Collection {}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `path` unless it is already present.
    pub fn push(&mut self, path: impl Into<String>) {
        self.paths.insert(path.into());
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// `self` followed by the entries of `previous` not already present.
    pub fn union(&self, previous: &Collection) -> Collection {
        let mut merged = self.clone();
        merged.paths.extend(previous.paths.iter().cloned());
        merged
    }

    /// Reads a collection out of an option value. Anything that is not an
    /// array yields an empty collection; non-string elements are skipped.
    pub fn from_value(value: Option<&Value>) -> Collection {
        match value {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Collection::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.paths.iter().cloned().map(Value::String).collect())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|p| p.as_str())
    }
}

impl<S: Into<String>> FromIterator<S> for Collection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSet {
    pub main: Collection,
    pub documents: Collection,
    pub fonts: Collection,
    pub images: Collection,
    pub javascripts: Collection,
    pub styles: Collection,
    pub templates: Collection,
    pub files: Collection,
}

impl CollectionSet {
    pub fn get(&self, category: Category) -> &Collection {
        match category {
            Category::Main => &self.main,
            Category::Documents => &self.documents,
            Category::Fonts => &self.fonts,
            Category::Images => &self.images,
            Category::Javascripts => &self.javascripts,
            Category::Styles => &self.styles,
            Category::Templates => &self.templates,
            Category::Files => &self.files,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut Collection {
        match category {
            Category::Main => &mut self.main,
            Category::Documents => &mut self.documents,
            Category::Fonts => &mut self.fonts,
            Category::Images => &mut self.images,
            Category::Javascripts => &mut self.javascripts,
            Category::Styles => &mut self.styles,
            Category::Templates => &mut self.templates,
            Category::Files => &mut self.files,
        }
    }
}

pub struct Classifier {
    mapping: ExtensionMapping,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            mapping: ExtensionMapping::new(),
        }
    }

    /// Sorts `paths` into a fresh collection set. Every path lands in `main`;
    /// recognised extensions also land in their category.
    pub fn classify<I, S>(&self, paths: I) -> CollectionSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut collections = CollectionSet::default();

        for path in paths {
            let path = path.as_ref();
            match self.mapping.map_path(path) {
                Some(category) => {
                    debug!("Adding {} to {}", path, category);
                    collections.get_mut(category).push(path);
                }
                None => debug!("Adding {} to main only", path),
            }
            collections.main.push(path);
        }

        collections
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_by_extension() {
        let classifier = Classifier::new();
        let set = classifier.classify(["a.js", "b.png", "c.md", "d.zip"]);

        assert_eq!(set.main.iter().collect::<Vec<_>>(), ["a.js", "b.png", "c.md", "d.zip"]);
        assert_eq!(set.javascripts.iter().collect::<Vec<_>>(), ["a.js"]);
        assert_eq!(set.images.iter().collect::<Vec<_>>(), ["b.png"]);
        assert_eq!(set.documents.iter().collect::<Vec<_>>(), ["c.md"]);
        assert!(set.fonts.is_empty());
        assert!(set.styles.is_empty());
        assert!(set.templates.is_empty());
        assert!(set.files.is_empty());
    }

    #[test]
    fn test_every_classified_path_is_in_main() {
        let classifier = Classifier::new();
        let set = classifier.classify(["x.css", "y.hbs", "z.ttf", "w.pdf"]);

        for category in [
            Category::Documents,
            Category::Fonts,
            Category::Images,
            Category::Javascripts,
            Category::Styles,
            Category::Templates,
        ] {
            for path in set.get(category).iter() {
                assert!(set.main.contains(path), "{} missing from main", path);
            }
        }
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let classifier = Classifier::new();
        let set = classifier.classify(["a.js", "b.js", "a.js"]);

        assert_eq!(set.main.len(), 2);
        assert_eq!(set.javascripts.iter().collect::<Vec<_>>(), ["a.js", "b.js"]);
    }

    #[test]
    fn test_classify_many_distinct_paths() {
        let paths: Vec<String> = (0..40_000).map(|i| format!("dir/file{}.js", i)).collect();
        let set = Classifier::new().classify(&paths);

        assert_eq!(set.main.len(), 40_000);
        assert_eq!(set.javascripts.len(), 40_000);
        assert_eq!(set.main.iter().next(), Some("dir/file0.js"));
        assert_eq!(set.main.iter().last(), Some("dir/file39999.js"));
    }

    #[test]
    fn test_union_puts_new_entries_first() {
        let fresh: Collection = ["c.js", "a.js"].into_iter().collect();
        let previous: Collection = ["a.js", "b.js"].into_iter().collect();

        let merged = fresh.union(&previous);
        assert_eq!(merged.iter().collect::<Vec<_>>(), ["c.js", "a.js", "b.js"]);

        let reordered: Collection = ["a.js", "c.js", "b.js"].into_iter().collect();
        assert_ne!(merged, reordered);
    }

    #[test]
    fn test_from_value_skips_non_strings() {
        let value = json!(["a.css", 3, null, "b.css", "a.css"]);
        let collection = Collection::from_value(Some(&value));
        assert_eq!(collection.iter().collect::<Vec<_>>(), ["a.css", "b.css"]);

        assert!(Collection::from_value(Some(&json!("a.css"))).is_empty());
        assert!(Collection::from_value(None).is_empty());
    }
}
