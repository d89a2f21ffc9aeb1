///! Static bird catalog loader
///!
///! Reads the categorized bird list bundled with the crate (or a file named in
///! the config) into an ordered [`Catalog`].

use aviary_common::Bird;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

const BUNDLED_CATALOG: &str = include_str!("../../resources/birds.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid catalog entry in category '{category}': {reason}")]
    Invalid { category: String, reason: String },

    #[error("catalog contains no birds")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    /// Kept as a map so category order follows the file
    categories: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawBird {
    #[serde(alias = "common_name")]
    name: String,
    #[serde(alias = "scientificName")]
    scientific_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    /// Page-unique slug; names differing only in case or punctuation get a suffix
    pub id: String,
    pub birds: Vec<Bird>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Vec<Category>,
}

/// A bird paired with its page-unique unit id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    /// Id of the category section the bird belongs to
    pub section: String,
    pub bird: Bird,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json(BUNDLED_CATALOG)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_json(&content)
    }

    /// Load from `path` when given, otherwise use the bundled list
    pub async fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                tracing::info!("Loading bird catalog from {}", path);
                Self::from_file(path).await
            }
            None => Self::bundled(),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = serde_json::from_str(content)?;
        let mut categories = Vec::with_capacity(raw.categories.len());
        let mut section_ids = HashSet::new();

        for (category_name, value) in raw.categories {
            let raw_birds: Vec<RawBird> = serde_json::from_value(value)?;
            let mut birds = Vec::with_capacity(raw_birds.len());

            for raw_bird in raw_birds {
                let common_name = raw_bird.name.trim();
                if common_name.is_empty() {
                    return Err(CatalogError::Invalid {
                        category: category_name.clone(),
                        reason: "bird without a name".to_string(),
                    });
                }
                if raw_bird.scientific_name.trim().is_empty() {
                    return Err(CatalogError::Invalid {
                        category: category_name.clone(),
                        reason: format!("'{}' has no scientific name", common_name),
                    });
                }
                birds.push(Bird::new(
                    common_name,
                    raw_bird.scientific_name.trim(),
                    category_name.as_str(),
                ));
            }

            let mut base = slugify(&category_name);
            if base.is_empty() {
                base = "category".to_string();
            }
            categories.push(Category {
                id: unique_id(&base, &mut section_ids),
                name: category_name,
                birds,
            });
        }

        let catalog = Catalog {
            title: raw.title,
            description: raw.description,
            categories,
        };

        if catalog.bird_count() == 0 {
            return Err(CatalogError::Empty);
        }

        tracing::debug!(
            "Parsed catalog: {} categories, {} birds",
            catalog.categories.len(),
            catalog.bird_count()
        );
        Ok(catalog)
    }

    pub fn bird_count(&self) -> usize {
        self.categories.iter().map(|c| c.birds.len()).sum()
    }

    /// Every bird in display order with a unique unit id
    pub fn entries(&self) -> Vec<CatalogEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.bird_count());

        for category in &self.categories {
            for bird in &category.birds {
                let base = format!("{}--{}", category.id, slugify(&bird.common_name));
                entries.push(CatalogEntry {
                    id: unique_id(&base, &mut seen),
                    section: category.id.clone(),
                    bird: bird.clone(),
                });
            }
        }

        entries
    }
}

fn unique_id(base: &str, seen: &mut HashSet<String>) -> String {
    let mut id = base.to_string();
    let mut suffix = 2;
    while !seen.insert(id.clone()) {
        id = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    id
}

/// Lowercase ASCII slug: "Lesson's Motmot" -> "lesson-s-motmot"
pub fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SMALL: &str = r#"{
        "title": "Test Birds",
        "categories": {
            "Owls": [
                { "name": "Barn Owl", "scientific_name": "Tyto alba" }
            ],
            "Ducks": [
                { "name": "Mallard", "scientific_name": "Anas platyrhynchos" },
                { "common_name": "Wood Duck", "scientificName": "Aix sponsa" }
            ]
        }
    }"#;

    #[test]
    fn test_bundled_catalog_loads() {
        let catalog = Catalog::bundled().unwrap();
        assert!(catalog.title.is_some());
        assert!(catalog.bird_count() > 20);
        assert_eq!(catalog.categories[0].name, "Trogons and Quetzals");
        assert_eq!(catalog.categories[0].birds[0].common_name, "Resplendent Quetzal");
    }

    #[test]
    fn test_category_order_follows_file() {
        let catalog = Catalog::from_json(SMALL).unwrap();
        let names: Vec<_> = catalog.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Owls", "Ducks"]);
        assert_eq!(catalog.categories[1].birds[1].common_name, "Wood Duck");
        assert_eq!(catalog.categories[1].birds[1].category, "Ducks");
        assert!(catalog.description.is_none());
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let json = r#"{"categories": {"Owls": [{"name": " ", "scientific_name": "Tyto alba"}]}}"#;
        assert!(matches!(
            Catalog::from_json(json),
            Err(CatalogError::Invalid { .. })
        ));
    }

    #[test]
    fn test_empty_catalog_is_rejected() {
        let json = r#"{"categories": {"Owls": []}}"#;
        assert!(matches!(Catalog::from_json(json), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(
            Catalog::from_json("{\"categories\": 3"),
            Err(CatalogError::Parse(_))
        ));
    }

    #[test]
    fn test_entries_have_unique_ids() {
        let json = r#"{"categories": {
            "Owls": [
                {"name": "Barn Owl", "scientific_name": "Tyto alba"},
                {"name": "Barn  Owl", "scientific_name": "Tyto furcata"}
            ]
        }}"#;
        let catalog = Catalog::from_json(json).unwrap();
        let ids: Vec<_> = catalog.entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["owls--barn-owl", "owls--barn-owl-2"]);
    }

    #[test]
    fn test_categories_differing_in_case_get_distinct_sections() {
        let json = r#"{"categories": {
            "Owls": [{"name": "Barn Owl", "scientific_name": "Tyto alba"}],
            "owls": [{"name": "Mallard", "scientific_name": "Anas platyrhynchos"}],
            "!!": [{"name": "Wood Duck", "scientific_name": "Aix sponsa"}]
        }}"#;
        let catalog = Catalog::from_json(json).unwrap();
        let sections: Vec<_> = catalog.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(sections, vec!["owls", "owls-2", "category"]);

        let entries = catalog.entries();
        assert_eq!(entries[0].id, "owls--barn-owl");
        assert_eq!(entries[1].id, "owls-2--mallard");
        assert_eq!(entries[1].section, "owls-2");
        assert_eq!(entries[2].section, "category");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Lesson's Motmot"), "lesson-s-motmot");
        assert_eq!(slugify("  Blue-gray Tanager "), "blue-gray-tanager");
        assert_eq!(slugify("Ñandú"), "and");
    }

    #[tokio::test]
    async fn test_load_from_file_and_missing_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SMALL).unwrap();

        let catalog = Catalog::load(file.path().to_str()).await.unwrap();
        assert_eq!(catalog.bird_count(), 3);

        let missing = Catalog::load(Some("/nonexistent/birds.json")).await;
        assert!(matches!(missing, Err(CatalogError::Io { .. })));
    }
}
