///! Wikimedia Commons strategies
///!
///! Both steps use the `api.php` generator form with `prop=imageinfo`, so a
///! single request yields titles and scaled image URLs together.

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

const THUMB_WIDTH: &str = "800";
const BIRDS_CATEGORY: &str = "Birds";

#[derive(Debug, Deserialize)]
struct CommonsResponse {
    #[serde(default)]
    query: Option<CommonsQuery>,
}

#[derive(Debug, Deserialize)]
struct CommonsQuery {
    #[serde(default)]
    pages: Vec<CommonsPage>,
}

#[derive(Debug, Deserialize)]
struct CommonsPage {
    title: String,
    /// Search rank; absent for category listings
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    imageinfo: Vec<CommonsImageInfo>,
}

#[derive(Debug, Deserialize)]
struct CommonsImageInfo {
    url: String,
    #[serde(default)]
    thumburl: Option<String>,
    #[serde(default)]
    descriptionurl: Option<String>,
}

/// Turn a generator response into filtered candidates, keeping upstream order
fn candidates_from_response(
    response: CommonsResponse,
    filter: &FilenameFilter,
    max_candidates: usize,
) -> Vec<ImageCandidate> {
    let mut pages = response.query.map(|q| q.pages).unwrap_or_default();
    pages.sort_by_key(|p| p.index.unwrap_or(u32::MAX));

    pages
        .into_iter()
        .filter(|page| {
            let keep = filter.accepts(&page.title);
            if !keep {
                tracing::trace!("Skipping Commons file {}", page.title);
            }
            keep
        })
        .filter_map(|page| {
            let info = page.imageinfo.into_iter().next()?;
            let link = info.descriptionurl.unwrap_or_else(|| {
                format!(
                    "https://commons.wikimedia.org/wiki/{}",
                    page.title.replace(' ', "_")
                )
            });
            let url = info.thumburl.unwrap_or(info.url);
            Some(ImageCandidate::new(url, link, ImageSource::Commons))
        })
        .take(max_candidates)
        .collect()
}

/// Step 1: files in `Category:<scientific name>`
pub struct CommonsCategoryStrategy {
    client: Client,
    config: Arc<ResolverConfig>,
    filter: FilenameFilter,
}

impl CommonsCategoryStrategy {
    pub const NAME: &'static str = "commons-category";

    pub fn new(client: Client, config: Arc<ResolverConfig>) -> Self {
        let filter = FilenameFilter::new(&config.filenames);
        Self { client, config, filter }
    }
}

#[async_trait]
impl ImageStrategy for CommonsCategoryStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError> {
        let category = format!("Category:{}", bird.scientific_name);
        let limit = self.config.page_size.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "categorymembers"),
            ("gcmtitle", category.as_str()),
            ("gcmtype", "file"),
            ("gcmlimit", limit.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("iiurlwidth", THUMB_WIDTH),
            ("origin", "*"),
        ];

        let response: CommonsResponse =
            get_json(&self.client, Self::NAME, &self.config.endpoints.commons_api, &params).await?;

        let candidates =
            candidates_from_response(response, &self.filter, self.config.max_candidates);
        if candidates.is_empty() {
            return Err(ResolveError::NoResult { step: Self::NAME });
        }
        Ok(candidates)
    }
}

/// Step 2: full-text file search restricted to the Birds category
pub struct CommonsSearchStrategy {
    client: Client,
    config: Arc<ResolverConfig>,
    filter: FilenameFilter,
}

impl CommonsSearchStrategy {
    pub const NAME: &'static str = "commons-search";

    pub fn new(client: Client, config: Arc<ResolverConfig>) -> Self {
        let filter = FilenameFilter::new(&config.filenames);
        Self { client, config, filter }
    }

    fn search_terms(bird: &Bird) -> String {
        format!("{} incategory:{}", bird.scientific_name, BIRDS_CATEGORY)
    }
}

#[async_trait]
impl ImageStrategy for CommonsSearchStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError> {
        let terms = Self::search_terms(bird);
        let limit = self.config.page_size.to_string();
        let params = [
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("generator", "search"),
            ("gsrsearch", terms.as_str()),
            ("gsrnamespace", "6"),
            ("gsrlimit", limit.as_str()),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("iiurlwidth", THUMB_WIDTH),
            ("origin", "*"),
        ];

        let response: CommonsResponse =
            get_json(&self.client, Self::NAME, &self.config.endpoints.commons_api, &params).await?;

        let candidates =
            candidates_from_response(response, &self.filter, self.config.max_candidates);
        if candidates.is_empty() {
            return Err(ResolveError::NoResult { step: Self::NAME });
        }
        Ok(candidates)
    }
}
