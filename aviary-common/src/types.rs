use serde::{Deserialize, Serialize};

/// Where a resolved image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageSource {
    #[serde(rename = "wikipedia")]
    Wikipedia,
    #[serde(rename = "commons")]
    Commons,
    #[serde(rename = "unsplash")]
    Unsplash,
    #[serde(rename = "pixabay")]
    Pixabay,
    #[serde(rename = "placeholder")]
    Placeholder,
}

impl ImageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSource::Wikipedia => "wikipedia",
            ImageSource::Commons => "commons",
            ImageSource::Unsplash => "unsplash",
            ImageSource::Pixabay => "pixabay",
            ImageSource::Placeholder => "placeholder",
        }
    }

    /// Human readable provider name used in attribution lines
    pub fn display_name(&self) -> &'static str {
        match self {
            ImageSource::Wikipedia => "Wikipedia",
            ImageSource::Commons => "Wikimedia Commons",
            ImageSource::Unsplash => "Unsplash",
            ImageSource::Pixabay => "Pixabay",
            ImageSource::Placeholder => "Placeholder",
        }
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ImageSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "wikipedia" => Ok(ImageSource::Wikipedia),
            "commons" | "wikimedia" => Ok(ImageSource::Commons),
            "unsplash" => Ok(ImageSource::Unsplash),
            "pixabay" => Ok(ImageSource::Pixabay),
            "placeholder" => Ok(ImageSource::Placeholder),
            _ => Err(format!("Unknown image source: {}", s)),
        }
    }
}

/// A single bird species from the static catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bird {
    pub common_name: String,
    pub scientific_name: String,
    pub category: String,
}

impl Bird {
    pub fn new(
        common_name: impl Into<String>,
        scientific_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            common_name: common_name.into(),
            scientific_name: scientific_name.into(),
            category: category.into(),
        }
    }

    /// Encyclopedia-style title, e.g. "Resplendent_Quetzal"
    pub fn wiki_title(&self) -> String {
        self.common_name.trim().replace(' ', "_")
    }
}

/// Credit for a photo taken from a stock-photo provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    pub username: String,
    pub link: String,
}

/// One resolved image option for a bird
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    /// Direct image URL
    pub url: String,
    /// Page the image was taken from
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    pub source: ImageSource,
}

impl ImageCandidate {
    pub fn new(url: impl Into<String>, link: impl Into<String>, source: ImageSource) -> Self {
        Self {
            url: url.into(),
            link: link.into(),
            attribution: None,
            source,
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = Some(attribution);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ImageSource::Placeholder
    }
}

/// Ordered candidates for one bird, used for click-to-cycle
pub type ResolvedImageSet = Vec<ImageCandidate>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_round_trips_through_str() {
        for source in [
            ImageSource::Wikipedia,
            ImageSource::Commons,
            ImageSource::Unsplash,
            ImageSource::Pixabay,
            ImageSource::Placeholder,
        ] {
            assert_eq!(source.as_str().parse::<ImageSource>(), Ok(source));
        }
        assert_eq!("Wikimedia".parse::<ImageSource>(), Ok(ImageSource::Commons));
        assert!("flickr".parse::<ImageSource>().is_err());
    }

    #[test]
    fn test_wiki_title_underscores_spaces() {
        let bird = Bird::new("Resplendent Quetzal", "Pharomachrus mocinno", "Trogons");
        assert_eq!(bird.wiki_title(), "Resplendent_Quetzal");
    }

    #[test]
    fn test_candidate_serializes_without_empty_attribution() {
        let candidate = ImageCandidate::new("https://a/b.jpg", "https://a", ImageSource::Commons);
        let json = serde_json::to_string(&candidate).unwrap();
        assert!(!json.contains("attribution"));
        assert!(json.contains("\"source\":\"commons\""));
    }
}
