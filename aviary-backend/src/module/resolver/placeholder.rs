///! "Text on image" placeholder candidates
use aviary_common::{Bird, ImageCandidate, ImageSource};

/// Placeholder image URL showing `text`.
///
/// `template` must contain `{text}`; templates without it get the text
/// appended as a `text` query parameter.
pub fn placeholder_url(template: &str, text: &str) -> String {
    let encoded = urlencoding::encode(text.trim());
    if template.contains("{text}") {
        template.replace("{text}", &encoded)
    } else {
        let separator = if template.contains('?') { '&' } else { '?' };
        format!("{}{}text={}", template, separator, encoded)
    }
}

/// The last-resort candidate: the bird's common name drawn on a plain image
pub fn placeholder_candidate(bird: &Bird, template: &str, wikipedia_page: &str) -> ImageCandidate {
    ImageCandidate::new(
        placeholder_url(template, &bird.common_name),
        format!("{}/{}", wikipedia_page.trim_end_matches('/'), bird.wiki_title()),
        ImageSource::Placeholder,
    )
}
