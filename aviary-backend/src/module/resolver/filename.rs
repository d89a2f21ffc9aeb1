///! Filename rules for media-library results
///!
///! Commons categories are full of range maps, distribution diagrams and
///! project logos. A title is usable only when its extension is allowed and it
///! contains none of the excluded keywords.

use crate::config::FilenameRules;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct FilenameFilter {
    extension: Option<Regex>,
    excluded: Vec<String>,
}

impl FilenameFilter {
    pub fn new(rules: &FilenameRules) -> Self {
        let alternatives: Vec<String> = rules
            .allowed_extensions
            .iter()
            .map(|ext| regex::escape(ext.trim().trim_start_matches('.')))
            .filter(|ext| !ext.is_empty())
            .collect();

        // An empty allow-list matches nothing
        let extension = if alternatives.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\.(?:{})$", alternatives.join("|"))).ok()
        };

        Self {
            extension,
            excluded: rules
                .excluded_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn has_allowed_extension(&self, title: &str) -> bool {
        self.extension
            .as_ref()
            .is_some_and(|re| re.is_match(title.trim()))
    }

    /// True when the title mentions any excluded keyword (substring, any case)
    pub fn is_excluded(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.excluded.iter().any(|keyword| lower.contains(keyword.as_str()))
    }

    pub fn accepts(&self, title: &str) -> bool {
        self.has_allowed_extension(title) && !self.is_excluded(title)
    }

    /// Keyword check on the last path segment of an image URL.
    ///
    /// Only the file name is inspected because every Wikimedia URL contains
    /// "wiki" in its host.
    pub fn url_file_is_excluded(&self, url: &str) -> bool {
        let without_query = url.split(['?', '#']).next().unwrap_or(url);
        let file = without_query.rsplit('/').next().unwrap_or(without_query);
        let decoded = urlencoding::decode(file)
            .map(|d| d.into_owned())
            .unwrap_or_else(|_| file.to_string());
        self.is_excluded(&decoded)
    }
}

impl Default for FilenameFilter {
    fn default() -> Self {
        Self::new(&FilenameRules::default())
    }
}
