///! Card and page renderer
///!
///! Cards are built from a bird plus its resolved images. The cycle index is
///! not part of the card; it is passed in from the gallery's cycle state
///! whenever a card is turned into HTML.

use super::resolver::placeholder_url;
use crate::config::Endpoints;
use crate::model::CatalogEntry;
use aviary_common::{Bird, ImageCandidate, ImageSource, ResolvedImageSet};
use serde::Serialize;

const PAGE_TEMPLATE: &str = include_str!("../../resources/gallery_template.html");
const DEFAULT_TITLE: &str = "Bird Gallery";

/// Resolution state of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    /// First pass, showing the placeholder while resolution is queued
    Pending,
    /// At least one real image was found
    Resolved,
    /// Every source came back empty
    Placeholder,
}

/// A rendered gallery unit
#[derive(Debug, Clone, Serialize)]
pub struct DisplayUnit {
    pub id: String,
    pub common_name: String,
    pub scientific_name: String,
    pub category: String,
    /// Id of the page section holding this card
    pub section: String,
    /// Never empty; falls back to the placeholder
    pub candidates: ResolvedImageSet,
    pub placeholder: ImageCandidate,
    pub title_link: String,
    pub status: UnitStatus,
}

impl DisplayUnit {
    /// Candidate shown at cycle position `index` (wraps)
    pub fn image_at(&self, index: usize) -> &ImageCandidate {
        if self.candidates.is_empty() {
            return &self.placeholder;
        }
        &self.candidates[index % self.candidates.len()]
    }

    pub fn can_cycle(&self) -> bool {
        self.candidates.len() > 1
    }

    /// What a failed image load should switch to; `None` once already on the placeholder
    pub fn fallback_for(&self, shown: &ImageCandidate) -> Option<&ImageCandidate> {
        if shown.is_placeholder() || shown.url == self.placeholder.url {
            None
        } else {
            Some(&self.placeholder)
        }
    }
}

/// Credit line for sourced images
pub fn attribution_text(candidate: &ImageCandidate) -> Option<String> {
    match (&candidate.source, &candidate.attribution) {
        (ImageSource::Placeholder, _) => None,
        (ImageSource::Unsplash, Some(a)) => Some(format!("Photo by {} on Unsplash", a.name)),
        (ImageSource::Pixabay, Some(a)) => Some(format!("Image by {} from Pixabay", a.name)),
        (source, Some(a)) => Some(format!("{} via {}", a.name, source.display_name())),
        (source, None) => Some(format!("Image via {}", source.display_name())),
    }
}

/// Builds display units
#[derive(Debug, Clone)]
pub struct CardRenderer {
    wikipedia_page: String,
    placeholder_template: String,
}

impl CardRenderer {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            wikipedia_page: endpoints.wikipedia_page.trim_end_matches('/').to_string(),
            placeholder_template: endpoints.placeholder_template.clone(),
        }
    }

    pub fn placeholder(&self, bird: &Bird) -> ImageCandidate {
        ImageCandidate::new(
            placeholder_url(&self.placeholder_template, &bird.common_name),
            self.article_link(bird),
            ImageSource::Placeholder,
        )
    }

    pub fn article_link(&self, bird: &Bird) -> String {
        format!("{}/{}", self.wikipedia_page, bird.wiki_title())
    }

    /// First-pass unit: placeholder only, resolution pending
    pub fn render_pending(&self, entry: &CatalogEntry) -> DisplayUnit {
        let mut unit = self.render(entry, Vec::new());
        unit.status = UnitStatus::Pending;
        unit
    }

    pub fn render(&self, entry: &CatalogEntry, candidates: ResolvedImageSet) -> DisplayUnit {
        let bird = &entry.bird;
        let placeholder = self.placeholder(bird);
        let has_real_image = candidates.iter().any(|c| !c.is_placeholder());
        let candidates = if candidates.is_empty() {
            vec![placeholder.clone()]
        } else {
            candidates
        };

        DisplayUnit {
            id: entry.id.clone(),
            common_name: bird.common_name.clone(),
            scientific_name: bird.scientific_name.clone(),
            category: bird.category.clone(),
            section: entry.section.clone(),
            candidates,
            placeholder,
            title_link: self.article_link(bird),
            status: if has_real_image {
                UnitStatus::Resolved
            } else {
                UnitStatus::Placeholder
            },
        }
    }
}

// ============ Page HTML ============

/// One category heading with its cards
#[derive(Debug, Clone)]
pub struct SectionView<'a> {
    pub name: &'a str,
    pub slug: String,
    pub visible: bool,
    pub cards: Vec<CardView<'a>>,
}

#[derive(Debug, Clone)]
pub struct CardView<'a> {
    pub unit: &'a DisplayUnit,
    pub index: usize,
    pub visible: bool,
    /// Active filter, carried through the cycle link
    pub query: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct PageView<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub query: &'a str,
    pub status_line: String,
    pub sections: Vec<SectionView<'a>>,
}

pub fn render_page(page: &PageView<'_>) -> String {
    let content: String = page.sections.iter().map(render_section).collect();
    fill_template(
        page.title.unwrap_or(DEFAULT_TITLE),
        page.description.unwrap_or_default(),
        page.query,
        &page.status_line,
        "",
        &content,
    )
}

/// Page-level failure, e.g. the bird list could not be loaded
pub fn render_error_page(message: &str) -> String {
    let error = format!(
        r#"<div class="error" role="alert"><strong>Unable to load the bird gallery.</strong> {}</div>"#,
        escape_html(message)
    );
    fill_template(DEFAULT_TITLE, "", "", "", &error, "")
}

fn fill_template(
    title: &str,
    description: &str,
    query: &str,
    status: &str,
    error: &str,
    content: &str,
) -> String {
    // Single pass over the template; substituted text is never rescanned
    let mut out = String::with_capacity(PAGE_TEMPLATE.len() + content.len());
    let mut rest = PAGE_TEMPLATE;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        match &after[..end] {
            "TITLE" => out.push_str(&escape_html(title)),
            "DESCRIPTION" => out.push_str(&escape_html(description)),
            "QUERY" => out.push_str(&escape_html(query)),
            "STATUS" => out.push_str(&escape_html(status)),
            "ERROR" => out.push_str(error),
            "CONTENT" => out.push_str(content),
            _ => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

fn render_section(section: &SectionView<'_>) -> String {
    let mut out = format!(
        r#"<section data-category="{slug}"{hidden}><h2>{name}</h2><div class="grid">"#,
        slug = escape_html(&section.slug),
        hidden = hidden_attr(section.visible),
        name = escape_html(section.name),
    );
    for card in &section.cards {
        out.push_str(&render_card(card));
    }
    out.push_str("</div></section>");
    out
}

pub fn render_card(card: &CardView<'_>) -> String {
    let unit = card.unit;
    let shown = unit.image_at(card.index);
    let id = escape_html(&unit.id);

    // Swap to the placeholder once; clearing onerror stops a failing placeholder from looping
    let onerror = match unit.fallback_for(shown) {
        Some(fallback) => format!(
            r#" onerror="this.onerror=null;this.src='{}'""#,
            escape_html(&fallback.url)
        ),
        None => String::new(),
    };

    let image = format!(
        r#"<img src="{src}" alt="{alt}" loading="lazy"{onerror}>"#,
        src = escape_html(&shown.url),
        alt = escape_html(&unit.common_name),
        onerror = onerror,
    );

    let image = if unit.can_cycle() {
        let mut href = format!("/units/{}/next", urlencoding::encode(&unit.id));
        if !card.query.trim().is_empty() {
            href.push_str("?q=");
            href.push_str(&urlencoding::encode(card.query.trim()));
        }
        format!(
            r#"<a class="cycle-image" href="{href}" title="Next image">{image}</a>"#,
            href = escape_html(&href),
            image = image,
        )
    } else {
        image
    };

    let mut body = format!(
        r#"<h3><a href="{link}" target="_blank" rel="noopener">{name}</a></h3><div class="sci">{sci}</div>"#,
        link = escape_html(&unit.title_link),
        name = escape_html(&unit.common_name),
        sci = escape_html(&unit.scientific_name),
    );

    if unit.can_cycle() {
        body.push_str(&format!(
            r#"<div class="cycle">{} / {}</div>"#,
            card.index % unit.candidates.len() + 1,
            unit.candidates.len()
        ));
    }

    if let Some(credit) = attribution_text(shown) {
        let href = shown
            .attribution
            .as_ref()
            .map(|a| a.link.as_str())
            .unwrap_or(shown.link.as_str());
        body.push_str(&format!(
            r#"<div class="credit"><a href="{}" target="_blank" rel="noopener">{}</a></div>"#,
            escape_html(href),
            escape_html(&credit)
        ));
    }

    format!(
        r#"<article class="card" id="{id}" data-unit="{id}" data-source="{source}"{hidden}>{image}<div class="body">{body}</div></article>"#,
        id = id,
        source = shown.source,
        hidden = hidden_attr(card.visible),
        image = image,
        body = body,
    )
}

fn hidden_attr(visible: bool) -> &'static str {
    if visible { "" } else { " hidden" }
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
