///! Live name filter
///!
///! Recomputes which cards and category sections are visible for a query.
///! Nothing is re-fetched; the result is applied to the already rendered page.

use super::renderer::DisplayUnit;
use crate::config::FilterConfig;
use serde::Serialize;
use std::collections::BTreeMap;

/// Visibility of every unit and category for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Visibility {
    pub query: String,
    /// unit id -> visible
    pub units: BTreeMap<String, bool>,
    /// section id -> visible
    pub categories: BTreeMap<String, bool>,
    pub visible_count: usize,
}

impl Visibility {
    pub fn unit_visible(&self, id: &str) -> bool {
        self.units.get(id).copied().unwrap_or(true)
    }

    pub fn category_visible(&self, section: &str) -> bool {
        self.categories.get(section).copied().unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct FilterController {
    match_scientific_name: bool,
}

impl Default for FilterController {
    fn default() -> Self {
        Self::new(&FilterConfig::default())
    }
}

impl FilterController {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            match_scientific_name: config.match_scientific_name,
        }
    }

    /// Does `unit` match the already lowercased, trimmed `needle`
    fn matches(&self, unit: &DisplayUnit, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        unit.common_name.to_lowercase().contains(needle)
            || (self.match_scientific_name && unit.scientific_name.to_lowercase().contains(needle))
    }

    /// Case-insensitive substring match on the names. Blank queries show
    /// everything; a category stays visible while any of its birds is.
    pub fn on_query_change<'a, I>(&self, query: &str, units: I) -> Visibility
    where
        I: IntoIterator<Item = &'a DisplayUnit>,
    {
        let needle = query.trim().to_lowercase();
        let mut visibility = Visibility {
            query: query.trim().to_string(),
            ..Visibility::default()
        };

        for unit in units {
            let visible = self.matches(unit, &needle);
            visibility.units.insert(unit.id.clone(), visible);
            *visibility
                .categories
                .entry(unit.section.clone())
                .or_insert(false) |= visible;
            if visible {
                visibility.visible_count += 1;
            }
        }

        visibility
    }
}
