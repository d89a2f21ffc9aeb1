///! Stock photo strategy (Unsplash + Pixabay)
///!
///! Runs several templated queries against each configured provider, scores
///! every photo and puts a random near-top pick first.

use super::error::ResolveError;
use super::http::get_json;
use super::scoring::{rank_with_variety, score_photo, ScoredPhoto, StockPhoto};
use super::ImageStrategy;
use crate::config::{has_key, ResolverConfig};
use async_trait::async_trait;
use aviary_common::{Attribution, Bird, ImageCandidate, ImageSource};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const UNSPLASH_MAX_PER_PAGE: usize = 30;
const PIXABAY_MIN_PER_PAGE: usize = 3;
const PIXABAY_MAX_PER_PAGE: usize = 200;

// ============ Unsplash ============

#[derive(Debug, Deserialize)]
struct UnsplashSearchResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alt_description: Option<String>,
    urls: UnsplashUrls,
    links: UnsplashLinks,
    user: UnsplashUser,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    tags: Vec<UnsplashTag>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashLinks {
    html: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: String,
    username: String,
    links: UnsplashLinks,
}

#[derive(Debug, Deserialize)]
struct UnsplashTag {
    title: String,
}

impl From<UnsplashPhoto> for StockPhoto {
    fn from(photo: UnsplashPhoto) -> Self {
        let description = [photo.description, photo.alt_description]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        let candidate = ImageCandidate::new(photo.urls.regular, photo.links.html, ImageSource::Unsplash)
            .with_attribution(Attribution {
                name: photo.user.name,
                username: photo.user.username,
                link: photo.user.links.html,
            });

        StockPhoto {
            candidate,
            description,
            tags: photo.tags.into_iter().map(|t| t.title).collect(),
            likes: photo.likes,
        }
    }
}

// ============ Pixabay ============

#[derive(Debug, Deserialize)]
struct PixabaySearchResponse {
    #[serde(default)]
    hits: Vec<PixabayHit>,
}

#[derive(Debug, Deserialize)]
struct PixabayHit {
    #[serde(rename = "pageURL")]
    page_url: String,
    #[serde(default)]
    tags: String,
    #[serde(rename = "webformatURL")]
    webformat_url: String,
    #[serde(default, rename = "largeImageURL")]
    large_image_url: Option<String>,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    user: String,
    #[serde(default)]
    user_id: u64,
}

impl From<PixabayHit> for StockPhoto {
    fn from(hit: PixabayHit) -> Self {
        let url = hit.large_image_url.unwrap_or(hit.webformat_url);
        let mut candidate = ImageCandidate::new(url, hit.page_url, ImageSource::Pixabay);
        if !hit.user.is_empty() {
            candidate = candidate.with_attribution(Attribution {
                link: format!("https://pixabay.com/users/{}-{}/", hit.user, hit.user_id),
                name: hit.user.clone(),
                username: hit.user,
            });
        }

        StockPhoto {
            candidate,
            description: String::new(),
            tags: hit
                .tags
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            likes: hit.likes,
        }
    }
}

// ============ Strategy ============

/// Step 5: search both stock libraries with several phrasings
pub struct StockPhotoStrategy {
    client: Client,
    config: Arc<ResolverConfig>,
    rng: Mutex<StdRng>,
}

impl StockPhotoStrategy {
    pub const NAME: &'static str = "stock-photos";

    pub fn new(client: Client, config: Arc<ResolverConfig>) -> Self {
        Self {
            client,
            config,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Fixed seed for reproducible picks
    pub fn with_seed(client: Client, config: Arc<ResolverConfig>, seed: u64) -> Self {
        Self {
            client,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// "<name> bird", "<name> bird <locale>", "<scientific name> bird photo"
    pub fn queries(bird: &Bird, locale: &str) -> Vec<String> {
        let mut queries = vec![format!("{} bird", bird.common_name)];
        if !locale.trim().is_empty() {
            queries.push(format!("{} bird {}", bird.common_name, locale.trim()));
        }
        queries.push(format!("{} bird photo", bird.scientific_name));
        queries
    }

    async fn search_unsplash(&self, key: &str, query: &str) -> Result<Vec<StockPhoto>, ResolveError> {
        let url = format!(
            "{}/search/photos",
            self.config.endpoints.unsplash_api.trim_end_matches('/')
        );
        let per_page = self.config.page_size.clamp(1, UNSPLASH_MAX_PER_PAGE).to_string();
        let params = [
            ("query", query),
            ("per_page", per_page.as_str()),
            ("content_filter", "high"),
            ("client_id", key),
        ];

        let response: UnsplashSearchResponse =
            get_json(&self.client, "unsplash", &url, &params).await?;
        Ok(response.results.into_iter().map(StockPhoto::from).collect())
    }

    async fn search_pixabay(&self, key: &str, query: &str) -> Result<Vec<StockPhoto>, ResolveError> {
        let per_page = self
            .config
            .page_size
            .clamp(PIXABAY_MIN_PER_PAGE, PIXABAY_MAX_PER_PAGE)
            .to_string();
        let params = [
            ("key", key),
            ("q", query),
            ("image_type", "photo"),
            ("safesearch", "true"),
            ("per_page", per_page.as_str()),
        ];

        let response: PixabaySearchResponse =
            get_json(&self.client, "pixabay", &self.config.endpoints.pixabay_api, &params).await?;
        Ok(response.hits.into_iter().map(StockPhoto::from).collect())
    }

    /// Every query against every configured provider, deduplicated by URL
    async fn collect_photos(&self, bird: &Bird) -> (Vec<StockPhoto>, Option<ResolveError>) {
        let mut photos = Vec::new();
        let mut seen = HashSet::new();
        let mut last_error = None;

        for query in Self::queries(bird, &self.config.locale_keyword) {
            if has_key(&self.config.unsplash_access_key) {
                let key = self.config.unsplash_access_key.as_deref().unwrap_or_default();
                match self.search_unsplash(key, &query).await {
                    Ok(found) => photos.extend(found.into_iter().filter(|p| seen.insert(p.candidate.url.clone()))),
                    Err(e) => {
                        tracing::debug!("Unsplash query '{}' failed: {}", query, e);
                        last_error = Some(e);
                    }
                }
            }

            if has_key(&self.config.pixabay_api_key) {
                let key = self.config.pixabay_api_key.as_deref().unwrap_or_default();
                match self.search_pixabay(key, &query).await {
                    Ok(found) => photos.extend(found.into_iter().filter(|p| seen.insert(p.candidate.url.clone()))),
                    Err(e) => {
                        tracing::debug!("Pixabay query '{}' failed: {}", query, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        (photos, last_error)
    }
}

#[async_trait]
impl ImageStrategy for StockPhotoStrategy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError> {
        let (photos, last_error) = self.collect_photos(bird).await;

        if photos.is_empty() {
            return Err(last_error.unwrap_or(ResolveError::NoResult { step: Self::NAME }));
        }

        let scored: Vec<ScoredPhoto> = photos
            .into_iter()
            .map(|photo| {
                let score = score_photo(&photo, bird, &self.config);
                ScoredPhoto { photo, score }
            })
            .collect();

        let ranked = match self.rng.lock() {
            Ok(mut rng) => rank_with_variety(scored, &self.config.selection, &mut *rng),
            Err(poisoned) => rank_with_variety(scored, &self.config.selection, &mut *poisoned.into_inner()),
        };

        tracing::debug!(
            "{}: {} photos for {}, picked score {:.1}",
            Self::NAME,
            ranked.len(),
            bird.common_name,
            ranked[0].score
        );

        Ok(ranked
            .into_iter()
            .take(self.config.max_candidates.max(1))
            .map(|s| s.photo.candidate)
            .collect())
    }
}
