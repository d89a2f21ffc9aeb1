///! Wikipedia strategies (REST page summary and title search)
use super::error::ResolveError;
use super::filename::FilenameFilter;
use super::http::get_json;
use super::ImageStrategy;
use crate::config::ResolverConfig;
use async_trait::async_trait;
use aviary_common::{Bird, ImageCandidate, ImageSource};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail: Option<SummaryImage>,
    #[serde(default)]
    originalimage: Option<SummaryImage>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct SummaryImage {
    source: String,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<ContentUrl>,
}

#[derive(Debug, Deserialize)]
struct ContentUrl {
    page: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImagePreference {
    Original,
    Thumbnail,
}

/// Fetch `page/summary/{title}` and pull one image out of it
async fn summary_image(
    client: &Client,
    config: &ResolverConfig,
    filter: &FilenameFilter,
    step: &'static str,
    title: &str,
    preference: ImagePreference,
) -> Result<ImageCandidate, ResolveError> {
    let url = format!(
        "{}/page/summary/{}",
        config.endpoints.wikipedia_rest.trim_end_matches('/'),
        urlencoding::encode(title)
    );
    let summary: PageSummary = get_json(client, step, &url, &[]).await?;
    candidate_from_summary(summary, config, filter, step, title, preference)
}

fn candidate_from_summary(
    summary: PageSummary,
    config: &ResolverConfig,
    filter: &FilenameFilter,
    step: &'static str,
    title: &str,
    preference: ImagePreference,
) -> Result<ImageCandidate, ResolveError> {
    if summary.kind.as_deref() == Some("disambiguation") {
        tracing::debug!("{}: '{}' is a disambiguation page", step, title);
        return Err(ResolveError::NoResult { step });
    }

    let original = summary.originalimage.map(|i| i.source);
    let thumbnail = summary.thumbnail.map(|i| i.source);
    let image = match preference {
        ImagePreference::Original => original.or(thumbnail),
        ImagePreference::Thumbnail => thumbnail.or(original),
    };

    let Some(image) = image else {
        return Err(ResolveError::NoResult { step });
    };
    if filter.url_file_is_excluded(&image) {
        tracing::debug!("{}: summary image {} looks like a map or diagram", step, image);
        return Err(ResolveError::NoResult { step });
    }

    let link = summary
        .content_urls
        .and_then(|c| c.desktop)
        .map(|d| d.page)
        .unwrap_or_else(|| {
            let page_title = summary.title.as_deref().unwrap_or(title).replace(' ', "_");
            format!(
                "{}/{}",
                config.endpoints.wikipedia_page.trim_end_matches('/'),
                page_title
            )
        });

    Ok(ImageCandidate::new(image, link, ImageSource::Wikipedia))
}

/// Step 3: summary of the article titled after the common name
pub struct WikipediaSummaryStrategy {
    client: Client,
    config: Arc<ResolverConfig>,
    filter: FilenameFilter,
}

impl WikipediaSummaryStrategy {
    pub const NAME: &'static str = "wikipedia-summary";

    pub fn new(client: Client, config: Arc<ResolverConfig>) -> Self {
        let filter = FilenameFilter::new(&config.filenames);
        Self { client, config, filter }
    }
}

#[async_trait]
impl ImageStrategy for WikipediaSummaryStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError> {
        let candidate = summary_image(
            &self.client,
            &self.config,
            &self.filter,
            Self::NAME,
            &bird.wiki_title(),
            ImagePreference::Original,
        )
        .await?;
        Ok(vec![candidate])
    }
}

/// Step 4: search "<common name> bird" and use the top hit's summary thumbnail
pub struct WikipediaSearchStrategy {
    client: Client,
    config: Arc<ResolverConfig>,
    filter: FilenameFilter,
}

impl WikipediaSearchStrategy {
    pub const NAME: &'static str = "wikipedia-search";

    pub fn new(client: Client, config: Arc<ResolverConfig>) -> Self {
        let filter = FilenameFilter::new(&config.filenames);
        Self { client, config, filter }
    }
}

#[async_trait]
impl ImageStrategy for WikipediaSearchStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError> {
        let terms = format!("{} bird", bird.common_name);
        let params = [
            ("action", "query"),
            ("list", "search"),
            ("srsearch", terms.as_str()),
            ("srlimit", "1"),
            ("format", "json"),
            ("formatversion", "2"),
            ("origin", "*"),
        ];

        let response: SearchResponse = get_json(
            &self.client,
            Self::NAME,
            &self.config.endpoints.wikipedia_api,
            &params,
        )
        .await?;

        let Some(top) = response
            .query
            .and_then(|q| q.search.into_iter().next())
        else {
            return Err(ResolveError::NoResult { step: Self::NAME });
        };

        tracing::debug!("{}: '{}' -> '{}'", Self::NAME, terms, top.title);
        let candidate = summary_image(
            &self.client,
            &self.config,
            &self.filter,
            Self::NAME,
            &top.title.replace(' ', "_"),
            ImagePreference::Thumbnail,
        )
        .await?;
        Ok(vec![candidate])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(json: &str) -> PageSummary {
        serde_json::from_str(json).unwrap()
    }

    fn pick(json: &str, preference: ImagePreference) -> Result<ImageCandidate, ResolveError> {
        candidate_from_summary(
            summary(json),
            &ResolverConfig::default(),
            &FilenameFilter::default(),
            "test",
            "Snowcap",
            preference,
        )
    }

    const BOTH: &str = r#"{
        "type": "standard",
        "title": "Snowcap",
        "thumbnail": {"source": "https://upload.example/320px-Snowcap.jpg"},
        "originalimage": {"source": "https://upload.example/Snowcap.jpg"},
        "content_urls": {"desktop": {"page": "https://en.wikipedia.org/wiki/Snowcap"}}
    }"#;

    #[test]
    fn test_preference_picks_image_variant() {
        let original = pick(BOTH, ImagePreference::Original).unwrap();
        assert_eq!(original.url, "https://upload.example/Snowcap.jpg");
        assert_eq!(original.link, "https://en.wikipedia.org/wiki/Snowcap");
        assert_eq!(original.source, ImageSource::Wikipedia);

        let thumb = pick(BOTH, ImagePreference::Thumbnail).unwrap();
        assert_eq!(thumb.url, "https://upload.example/320px-Snowcap.jpg");
    }

    #[test]
    fn test_falls_back_to_other_variant() {
        let only_thumb = r#"{"thumbnail": {"source": "https://upload.example/t.jpg"}}"#;
        let candidate = pick(only_thumb, ImagePreference::Original).unwrap();
        assert_eq!(candidate.url, "https://upload.example/t.jpg");
        assert_eq!(candidate.link, "https://en.wikipedia.org/wiki/Snowcap");
    }

    #[test]
    fn test_summary_without_image_is_no_result() {
        let err = pick(r#"{"type": "standard"}"#, ImagePreference::Original).unwrap_err();
        assert!(err.is_no_result());
    }

    #[test]
    fn test_disambiguation_is_no_result() {
        let json = r#"{"type": "disambiguation", "thumbnail": {"source": "https://u/x.jpg"}}"#;
        assert!(pick(json, ImagePreference::Thumbnail).unwrap_err().is_no_result());
    }

    #[test]
    fn test_range_map_summary_image_is_rejected() {
        let json = r#"{"originalimage": {"source": "https://upload.example/Snowcap_map.png"}}"#;
        assert!(pick(json, ImagePreference::Original).unwrap_err().is_no_result());
    }
}
