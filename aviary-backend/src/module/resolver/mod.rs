///! Multi-source bird image resolution
///!
///! ## Fallback chain
///! 1. Commons category of the scientific name
///! 2. Commons file search inside the Birds category
///! 3. Wikipedia summary of the common name
///! 4. Wikipedia search for "<common name> bird"
///! 5. Unsplash / Pixabay (only when a key is configured)
///! 6. Placeholder drawn from the common name
///!
///! Every step shares the [`ImageStrategy`] signature. The first step that
///! returns images wins; failures are logged and never reach the caller.

mod commons;
mod error;
mod filename;
mod http;
mod placeholder;
mod scoring;
mod stock;
mod wikipedia;

pub use commons::{CommonsCategoryStrategy, CommonsSearchStrategy};
pub use error::ResolveError;
pub use filename::FilenameFilter;
pub use placeholder::{placeholder_candidate, placeholder_url};
pub use scoring::{rank_with_variety, score_photo, ScoredPhoto, StockPhoto};
pub use stock::StockPhotoStrategy;
pub use wikipedia::{WikipediaSearchStrategy, WikipediaSummaryStrategy};

use crate::config::ResolverConfig;
use async_trait::async_trait;
use aviary_common::{Bird, ImageCandidate, ResolvedImageSet};
use std::sync::Arc;

/// One step of the fallback chain
#[async_trait]
pub trait ImageStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidates for `bird`; an empty list counts as no result
    async fn find(&self, bird: &Bird) -> Result<Vec<ImageCandidate>, ResolveError>;
}

/// Runs the fallback chain for one bird at a time
pub struct ImageResolver {
    strategies: Vec<Box<dyn ImageStrategy>>,
    config: Arc<ResolverConfig>,
}

impl ImageResolver {
    /// Build the standard chain from `config`
    pub fn new(config: ResolverConfig) -> anyhow::Result<Self> {
        let client = http::build_client(config.request_timeout_secs, &config.user_agent)?;
        let config = Arc::new(config);

        let mut strategies: Vec<Box<dyn ImageStrategy>> = vec![
            Box::new(CommonsCategoryStrategy::new(client.clone(), config.clone())),
            Box::new(CommonsSearchStrategy::new(client.clone(), config.clone())),
            Box::new(WikipediaSummaryStrategy::new(client.clone(), config.clone())),
            Box::new(WikipediaSearchStrategy::new(client.clone(), config.clone())),
        ];

        if config.stock_photos_configured() {
            strategies.push(Box::new(StockPhotoStrategy::new(client, config.clone())));
        } else {
            tracing::info!("No stock photo API keys configured, skipping Unsplash/Pixabay");
        }

        Ok(Self { strategies, config })
    }

    /// Custom chain; the placeholder still comes from `config`
    pub fn with_strategies(strategies: Vec<Box<dyn ImageStrategy>>, config: ResolverConfig) -> Self {
        Self {
            strategies,
            config: Arc::new(config),
        }
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn placeholder_for(&self, bird: &Bird) -> ImageCandidate {
        placeholder_candidate(
            bird,
            &self.config.endpoints.placeholder_template,
            &self.config.endpoints.wikipedia_page,
        )
    }

    /// Resolve images for `bird`. Never fails and never returns an empty set.
    pub async fn resolve(&self, bird: &Bird) -> ResolvedImageSet {
        for strategy in &self.strategies {
            match strategy.find(bird).await {
                Ok(candidates) if !candidates.is_empty() => {
                    tracing::debug!(
                        "Resolved {} via {} ({} candidates)",
                        bird.common_name,
                        strategy.name(),
                        candidates.len()
                    );
                    return dedupe(candidates, self.config.max_candidates);
                }
                Ok(_) => {
                    tracing::debug!("{}: no qualifying image for {}", strategy.name(), bird.common_name);
                }
                Err(e) if e.is_no_result() => {
                    tracing::debug!("{} ({})", e, bird.common_name);
                }
                Err(e) => {
                    tracing::warn!("{} ({})", e, bird.common_name);
                }
            }
        }

        tracing::info!("No image found for {}, using placeholder", bird.common_name);
        vec![self.placeholder_for(bird)]
    }
}

/// Drop repeated URLs, keep order, cap length
fn dedupe(candidates: Vec<ImageCandidate>, max: usize) -> ResolvedImageSet {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .take(max.max(1))
        .collect()
}
