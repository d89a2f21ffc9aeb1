use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_ENV: &str = "AVIARY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Optional override for the embedded bird catalog
    #[serde(default)]
    pub catalog_path: Option<String>,

    #[serde(default)]
    pub resolver: ResolverConfig,

    #[serde(default)]
    pub gallery: GalleryConfig,

    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Allow cross-origin requests to the JSON endpoints
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3030
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enable_cors() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            enable_cors: default_enable_cors(),
        }
    }
}

impl ServerConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Base URLs of every upstream the resolver talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    #[serde(default = "default_commons_api")]
    pub commons_api: String,

    #[serde(default = "default_wikipedia_api")]
    pub wikipedia_api: String,

    #[serde(default = "default_wikipedia_rest")]
    pub wikipedia_rest: String,

    #[serde(default = "default_wikipedia_page")]
    pub wikipedia_page: String,

    #[serde(default = "default_unsplash_api")]
    pub unsplash_api: String,

    #[serde(default = "default_pixabay_api")]
    pub pixabay_api: String,

    /// `{text}` is replaced with the url-encoded common name
    #[serde(default = "default_placeholder_template")]
    pub placeholder_template: String,
}

fn default_commons_api() -> String {
    "https://commons.wikimedia.org/w/api.php".to_string()
}

fn default_wikipedia_api() -> String {
    "https://en.wikipedia.org/w/api.php".to_string()
}

fn default_wikipedia_rest() -> String {
    "https://en.wikipedia.org/api/rest_v1".to_string()
}

fn default_wikipedia_page() -> String {
    "https://en.wikipedia.org/wiki".to_string()
}

fn default_unsplash_api() -> String {
    "https://api.unsplash.com".to_string()
}

fn default_pixabay_api() -> String {
    "https://pixabay.com/api/".to_string()
}

fn default_placeholder_template() -> String {
    "https://placehold.co/600x400?text={text}".to_string()
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            commons_api: default_commons_api(),
            wikipedia_api: default_wikipedia_api(),
            wikipedia_rest: default_wikipedia_rest(),
            wikipedia_page: default_wikipedia_page(),
            unsplash_api: default_unsplash_api(),
            pixabay_api: default_pixabay_api(),
            placeholder_template: default_placeholder_template(),
        }
    }
}

/// Random pick among near-top stock photo candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Candidates scoring within this many points of the best are eligible
    #[serde(default = "default_score_window")]
    pub score_window: f64,

    /// At most this many of the best eligible candidates enter the draw
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_score_window() -> f64 {
    2.0
}

fn default_top_n() -> usize {
    3
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            score_window: default_score_window(),
            top_n: default_top_n(),
        }
    }
}

/// Filename rules for media-library results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameRules {
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,

    #[serde(default = "default_excluded_keywords")]
    pub excluded_keywords: Vec<String>,
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png"].iter().map(|s| s.to_string()).collect()
}

fn default_excluded_keywords() -> Vec<String> {
    ["map", "distribution", "range", "diagram", "icon", "logo", "wiki"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for FilenameRules {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            excluded_keywords: default_excluded_keywords(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub unsplash_access_key: Option<String>,

    #[serde(default)]
    pub pixabay_api_key: Option<String>,

    /// Stock photo step only runs when enabled and at least one key is set
    #[serde(default = "default_enable_stock_photos")]
    pub enable_stock_photos: bool,

    #[serde(default = "default_locale_keyword")]
    pub locale_keyword: String,

    #[serde(default = "default_bird_keywords")]
    pub bird_keywords: Vec<String>,

    #[serde(default)]
    pub selection: SelectionPolicy,

    #[serde(default)]
    pub filenames: FilenameRules,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Results requested per upstream query
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_enable_stock_photos() -> bool {
    true
}

fn default_locale_keyword() -> String {
    "Costa Rica".to_string()
}

fn default_bird_keywords() -> Vec<String> {
    ["bird", "birds", "wildlife", "nature", "animal", "feathers", "avian", "ornithology"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_candidates() -> usize {
    10
}

fn default_page_size() -> usize {
    20
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    format!("aviary/{} (bird gallery)", env!("CARGO_PKG_VERSION"))
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            unsplash_access_key: None,
            pixabay_api_key: None,
            enable_stock_photos: default_enable_stock_photos(),
            locale_keyword: default_locale_keyword(),
            bird_keywords: default_bird_keywords(),
            selection: SelectionPolicy::default(),
            filenames: FilenameRules::default(),
            max_candidates: default_max_candidates(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ResolverConfig {
    /// Whether the stock photo step belongs in the fallback chain
    pub fn stock_photos_configured(&self) -> bool {
        self.enable_stock_photos
            && (has_key(&self.unsplash_access_key) || has_key(&self.pixabay_api_key))
    }

    /// Fill unset API keys from the environment
    pub fn apply_env_keys(&mut self) {
        if !has_key(&self.unsplash_access_key) {
            self.unsplash_access_key = std::env::var("UNSPLASH_ACCESS_KEY").ok();
        }
        if !has_key(&self.pixabay_api_key) {
            self.pixabay_api_key = std::env::var("PIXABAY_API_KEY").ok();
        }
    }
}

pub(crate) fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryConfig {
    /// Birds resolved in parallel during the second pass
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between starting two resolutions
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_request_delay_ms() -> u64 {
    150
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            request_delay_ms: default_request_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_match_scientific_name")]
    pub match_scientific_name: bool,
}

fn default_match_scientific_name() -> bool {
    true
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            match_scientific_name: default_match_scientific_name(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }

    /// Load from `$AVIARY_CONFIG` or `config.toml`
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(std::env::var(CONFIG_ENV).ok())?;
        config.resolver.apply_env_keys();
        Ok(config)
    }

    /// An explicitly named file must exist; a missing `config.toml` means defaults
    fn load_from(explicit: Option<String>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => {
                if !Path::new(&path).exists() {
                    anyhow::bail!("Config file '{}' named by {} does not exist", path, CONFIG_ENV);
                }
                Self::from_file(&path)
            }
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                tracing::info!("Config file '{}' not found, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3030);
        assert_eq!(config.resolver.selection, SelectionPolicy::default());
        assert_eq!(config.resolver.selection.top_n, 3);
        assert_eq!(config.resolver.filenames.allowed_extensions, vec!["jpg", "jpeg", "png"]);
        assert!(config.filter.match_scientific_name);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
catalog_path = "birds.json"

[server]
port = 8080

[resolver]
pixabay_api_key = "abc"
locale_keyword = "Panama"

[resolver.selection]
score_window = 4.5
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.catalog_path.as_deref(), Some("birds.json"));
        assert_eq!(config.resolver.locale_keyword, "Panama");
        assert_eq!(config.resolver.selection.score_window, 4.5);
        assert_eq!(config.resolver.selection.top_n, 3);
        assert!(config.resolver.stock_photos_configured());
    }

    #[test]
    fn test_stock_photos_need_a_non_blank_key() {
        let mut resolver = ResolverConfig::default();
        assert!(!resolver.stock_photos_configured());

        resolver.unsplash_access_key = Some("  ".to_string());
        assert!(!resolver.stock_photos_configured());

        resolver.unsplash_access_key = Some("key".to_string());
        assert!(resolver.stock_photos_configured());

        resolver.enable_stock_photos = false;
        assert!(!resolver.stock_photos_configured());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_explicit_config_path_must_exist() {
        let err = Config::load_from(Some("/nonexistent/aviary.toml".to_string())).unwrap_err();
        assert!(err.to_string().contains(CONFIG_ENV));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[server]\nport = 9090\n").unwrap();
        let config = Config::load_from(file.path().to_str().map(String::from)).unwrap();
        assert_eq!(config.server.port, 9090);
    }
}
