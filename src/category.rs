use std::fmt;

/// Named collections a manifest can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Main,
    Documents,
    Fonts,
    Images,
    Javascripts,
    Styles,
    Templates,
    Files,
}

impl Category {
    /// Collections written back into the manifest options, in write order.
    /// `Documents` is classified but never merged back.
    pub const MERGED: [Category; 7] = [
        Category::Main,
        Category::Styles,
        Category::Javascripts,
        Category::Templates,
        Category::Images,
        Category::Fonts,
        Category::Files,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Documents => "documents",
            Category::Fonts => "fonts",
            Category::Images => "images",
            Category::Javascripts => "javascripts",
            Category::Styles => "styles",
            Category::Templates => "templates",
            Category::Files => "files",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const EXTENSION_TABLE: &[(&str, Category)] = &[
    // Documents
    (".md", Category::Documents),
    (".txt", Category::Documents),
    (".html", Category::Documents),
    (".htm", Category::Documents),
    (".doc", Category::Documents),
    (".docx", Category::Documents),
    (".pdf", Category::Documents),
    // Fonts
    (".eot", Category::Fonts),
    (".svg", Category::Fonts),
    (".otf", Category::Fonts),
    (".ttf", Category::Fonts),
    (".woff", Category::Fonts),
    // Images
    (".ico", Category::Images),
    (".png", Category::Images),
    (".gif", Category::Images),
    (".jpg", Category::Images),
    // Scripts
    (".js", Category::Javascripts),
    (".coffee", Category::Javascripts),
    // Styles
    (".css", Category::Styles),
    (".less", Category::Styles),
    (".stylus", Category::Styles),
    (".sass", Category::Styles),
    (".scss", Category::Styles),
    // Templates
    (".hbs", Category::Templates),
    (".hbr", Category::Templates),
    (".handlebars", Category::Templates),
    (".mustache", Category::Templates),
    (".tmpl", Category::Templates),
];

#[derive(Debug, Clone)]
pub struct ExtensionMapping {
    table: &'static [(&'static str, Category)],
}

impl ExtensionMapping {
    pub fn new() -> Self {
        Self {
            table: EXTENSION_TABLE,
        }
    }

    /// Category for an extension including its leading dot, e.g. `".png"`.
    /// Matching is case-sensitive.
    pub fn map_extension(&self, extension: &str) -> Option<Category> {
        self.table
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, category)| *category)
    }

    /// Category for a path, or `None` when it only belongs in `main`.
    pub fn map_path(&self, path: &str) -> Option<Category> {
        extension_of(path).and_then(|ext| self.map_extension(ext))
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.table.iter().map(|(ext, _)| *ext).collect()
    }
}

impl Default for ExtensionMapping {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension of the final path component including the dot, taken from the
/// raw text so `.` and `..` components are not normalised away. Leading-dot
/// names like `.gitignore` have none.
pub fn extension_of(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let file_name = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if file_name == ".." {
        return None;
    }
    match file_name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&file_name[idx..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_mappings() {
        let mapping = ExtensionMapping::new();

        assert_eq!(mapping.map_path("docs/readme.md"), Some(Category::Documents));
        assert_eq!(mapping.map_path("fonts/icons.woff"), Some(Category::Fonts));
        assert_eq!(mapping.map_path("img/logo.png"), Some(Category::Images));
        assert_eq!(mapping.map_path("js/app.coffee"), Some(Category::Javascripts));
        assert_eq!(mapping.map_path("css/site.scss"), Some(Category::Styles));
        assert_eq!(mapping.map_path("tmpl/page.hbs"), Some(Category::Templates));
    }

    #[test]
    fn test_unknown_extension() {
        let mapping = ExtensionMapping::new();
        assert_eq!(mapping.map_path("archive.zip"), None);
        assert_eq!(mapping.map_path("Makefile"), None);
        assert_eq!(mapping.map_path("config/.gitignore"), None);
        assert_eq!(mapping.map_path("trailing."), None);
    }

    #[test]
    fn test_extension_is_case_sensitive() {
        let mapping = ExtensionMapping::new();
        assert_eq!(mapping.map_path("LOGO.PNG"), None);
        assert_eq!(mapping.map_path("LOGO.png"), Some(Category::Images));
    }

    #[test]
    fn test_extension_of_uses_last_component() {
        assert_eq!(extension_of("a.b/c"), None);
        assert_eq!(extension_of("lib/jquery.min.js"), Some(".js"));
        assert_eq!(extension_of("x/.hidden.css"), Some(".css"));
        assert_eq!(extension_of("styles/site.css/"), Some(".css"));
    }

    #[test]
    fn test_dot_components_have_no_extension() {
        let mapping = ExtensionMapping::new();
        for path in ["foo.txt/.", "foo.txt/..", ".", "..", "docs/"] {
            assert_eq!(extension_of(path), None, "{}", path);
            assert_eq!(mapping.map_path(path), None, "{}", path);
        }
    }

    #[test]
    fn test_table_is_disjoint() {
        let mapping = ExtensionMapping::new();
        let mut seen = std::collections::HashSet::new();
        for ext in mapping.supported_extensions() {
            assert!(seen.insert(ext), "duplicate extension {}", ext);
        }
        assert_eq!(seen.len(), 28);
    }
}
