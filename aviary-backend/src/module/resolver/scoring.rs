///! Relevance scoring and randomized pick for stock photos
use crate::config::{ResolverConfig, SelectionPolicy};
use aviary_common::{Bird, ImageCandidate};
use rand::Rng;

const COMMON_NAME_POINTS: f64 = 10.0;
const SCIENTIFIC_NAME_POINTS: f64 = 15.0;
const KEYWORD_POINTS: f64 = 2.0;
const LOCALE_POINTS: f64 = 5.0;
const MAX_POPULARITY_POINTS: f64 = 5.0;

/// A stock photo plus the text the scorer looks at
#[derive(Debug, Clone)]
pub struct StockPhoto {
    pub candidate: ImageCandidate,
    pub description: String,
    pub tags: Vec<String>,
    pub likes: u64,
}

#[derive(Debug, Clone)]
pub struct ScoredPhoto {
    pub photo: StockPhoto,
    pub score: f64,
}

/// Text relevance of `photo` for `bird`.
///
/// +10 common name, +15 scientific name, +2 per bird keyword found in the
/// tags, +5 locale keyword, plus likes/10 capped at 5.
pub fn score_photo(photo: &StockPhoto, bird: &Bird, config: &ResolverConfig) -> f64 {
    let tags: Vec<String> = photo.tags.iter().map(|t| t.to_lowercase()).collect();
    let text = format!("{} {}", photo.description, tags.join(" ")).to_lowercase();

    let mut score = 0.0;

    let common = bird.common_name.trim().to_lowercase();
    if !common.is_empty() && text.contains(&common) {
        score += COMMON_NAME_POINTS;
    }

    let scientific = bird.scientific_name.trim().to_lowercase();
    if !scientific.is_empty() && text.contains(&scientific) {
        score += SCIENTIFIC_NAME_POINTS;
    }

    let keyword_hits = config
        .bird_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .filter(|k| !k.is_empty() && tags.iter().any(|tag| tag.contains(k.as_str())))
        .count();
    score += keyword_hits as f64 * KEYWORD_POINTS;

    let locale = config.locale_keyword.trim().to_lowercase();
    if !locale.is_empty() && text.contains(&locale) {
        score += LOCALE_POINTS;
    }

    score += (photo.likes as f64 / 10.0).min(MAX_POPULARITY_POINTS);
    score
}

/// Sort best-first, then move a random near-top photo to the front.
///
/// The draw is uniform over the first `top_n` photos whose score is within
/// `score_window` of the best.
pub fn rank_with_variety<R: Rng + ?Sized>(
    mut scored: Vec<ScoredPhoto>,
    policy: &SelectionPolicy,
    rng: &mut R,
) -> Vec<ScoredPhoto> {
    if scored.is_empty() {
        return scored;
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let best = scored[0].score;
    let eligible = scored
        .iter()
        .take(policy.top_n.max(1))
        .take_while(|s| s.score >= best - policy.score_window)
        .count();

    let chosen = rng.gen_range(0..eligible);
    if chosen > 0 {
        let picked = scored.remove(chosen);
        scored.insert(0, picked);
    }
    scored
}
