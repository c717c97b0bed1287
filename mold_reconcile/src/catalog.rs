use ahash::AHashMap;
use mold_io::{AssetRoot, LoadError};
use mold_scene::{Scene, parse_scene};
use mold_structs::Transform3D;
use std::path::PathBuf;

use crate::error::CatalogError;

/// Where template documents come from. The catalog only knows locators.
pub trait TemplateSource {
    fn load_template(&self, locator: &str) -> Result<String, LoadError>;
}

impl TemplateSource for AssetRoot {
    fn load_template(&self, locator: &str) -> Result<String, LoadError> {
        self.load_string(locator)
    }
}

/// In-memory template documents keyed by locator.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: AHashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(locator, source);
        self
    }

    pub fn insert(&mut self, locator: impl Into<String>, source: impl Into<String>) {
        self.documents.insert(locator.into(), source.into());
    }
}

impl TemplateSource for MemorySource {
    fn load_template(&self, locator: &str) -> Result<String, LoadError> {
        if locator.is_empty() {
            return Err(LoadError::EmptyLocator);
        }
        self.documents
            .get(locator)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(PathBuf::from(locator)))
    }
}

/// A resolved template: its hierarchy and the canonical placement of its root.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub canonical_name: String,
    pub locator: String,
    pub scene: Scene,
    pub canonical: Transform3D,
}

/// Immutable canonical-name -> locator mapping. Names match case-sensitively and exactly.
/// Templates are loaded on every [`Catalog::resolve`]; nothing is kept between calls.
pub struct Catalog<S> {
    entries: AHashMap<String, String>,
    source: S,
}

impl<S: TemplateSource> Catalog<S> {
    pub fn new<I, N, L>(entries: I, source: S) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(n, l)| (n.into(), l.into()))
                .collect(),
            source,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Canonical names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, name: &str) -> Result<Template, CatalogError> {
        let locator = self
            .entries
            .get(name)
            .ok_or_else(|| CatalogError::NameNotFound(name.to_string()))?;
        let unresolvable = |reason: String| CatalogError::TemplateUnresolvable {
            name: name.to_string(),
            locator: locator.clone(),
            reason,
        };

        let source = self
            .source
            .load_template(locator)
            .map_err(|err| unresolvable(err.to_string()))?;
        let scene = parse_scene(&source).map_err(|err| unresolvable(err.to_string()))?;
        let canonical = scene
            .root_entry()
            .map(|root| root.data.transform())
            .ok_or_else(|| unresolvable("template has no root node".to_string()))?;
        if !canonical.is_finite() {
            return Err(unresolvable(
                "template root placement is not finite".to_string(),
            ));
        }

        log::debug!("resolved template `{name}` from {locator}");
        Ok(Template {
            canonical_name: name.to_string(),
            locator: locator.clone(),
            scene,
            canonical,
        })
    }
}

/// Memoizes resolutions for the duration of one engine call.
pub struct TemplateCache<'c, S> {
    catalog: &'c Catalog<S>,
    loaded: AHashMap<String, Result<Template, CatalogError>>,
}

impl<'c, S: TemplateSource> TemplateCache<'c, S> {
    pub fn new(catalog: &'c Catalog<S>) -> Self {
        Self {
            catalog,
            loaded: AHashMap::default(),
        }
    }

    pub fn get(&mut self, name: &str) -> Result<&Template, CatalogError> {
        let catalog = self.catalog;
        self.loaded
            .entry(name.to_string())
            .or_insert_with(|| catalog.resolve(name))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Number of distinct names looked up so far.
    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mold_structs::Vector3;

    const KATANA: &str = "[katana]\n[Node3D]\nposition = (0.02, 0, 0)\n[/Node3D]\n[/katana]\n";

    fn catalog() -> Catalog<MemorySource> {
        Catalog::new(
            [
                ("Katana", "res://katana.scn"),
                ("Pistol", "res://missing.scn"),
                ("Broken", "res://broken.scn"),
            ],
            MemorySource::new()
                .with("res://katana.scn", KATANA)
                .with("res://broken.scn", "[katana]\n"),
        )
    }

    #[test]
    fn resolve_reads_canonical_placement() {
        let template = catalog().resolve("Katana").unwrap();
        assert_eq!(template.canonical_name, "Katana");
        assert_eq!(template.canonical.position, Vector3::new(0.02, 0.0, 0.0));
    }

    #[test]
    fn missing_name_and_unloadable_template_are_distinct() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve("katana"),
            Err(CatalogError::NameNotFound("katana".to_string()))
        );
        assert!(matches!(
            catalog.resolve("Pistol"),
            Err(CatalogError::TemplateUnresolvable { ref locator, .. }) if locator == "res://missing.scn"
        ));
        assert!(matches!(
            catalog.resolve("Broken"),
            Err(CatalogError::TemplateUnresolvable { .. })
        ));
    }

    #[test]
    fn cyclic_template_is_unresolvable() {
        let catalog = Catalog::new(
            [("Loop", "res://loop.scn"), ("Parented", "res://parented.scn")],
            MemorySource::new()
                .with("res://loop.scn", "@root = a\n[a]\nparent = a\n[/a]\n")
                .with("res://parented.scn", "@root = b\n[a]\n[/a]\n[b]\nparent = a\n[/b]\n"),
        );
        for name in ["Loop", "Parented"] {
            assert!(matches!(
                catalog.resolve(name),
                Err(CatalogError::TemplateUnresolvable { name: ref n, .. }) if n == name
            ));
        }
    }

    #[test]
    fn cache_resolves_each_name_once() {
        let catalog = catalog();
        let mut cache = TemplateCache::new(&catalog);
        assert!(cache.get("Katana").is_ok());
        assert!(cache.get("Katana").is_ok());
        assert!(cache.get("Pistol").is_err());
        assert!(cache.get("Pistol").is_err());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(catalog().names(), vec!["Broken", "Katana", "Pistol"]);
    }
}
