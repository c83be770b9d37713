use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::extraction::text::{collapse_whitespace, element_text, truncate_description};

pub const UNTITLED: &str = "Untitled";

static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid title selector"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="description"]"#).expect("valid meta selector")
});
static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").expect("valid p selector"));

/// Page-level title and description for the synthesized feed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

pub fn extract_metadata(document: &Html) -> PageMetadata {
    let title = document
        .select(&TITLE)
        .map(element_text)
        .find(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let meta = document
        .select(&META_DESCRIPTION)
        .filter_map(|meta| meta.value().attr("content"))
        .map(collapse_whitespace)
        .find(|content| !content.is_empty());

    let description = meta
        .or_else(|| {
            document
                .select(&PARAGRAPH)
                .find_map(|p| truncate_description(&element_text(p)))
        })
        .unwrap_or_default();

    PageMetadata { title, description }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_meta_description() {
        let document = Html::parse_document(
            r#"<html><head><title>  Example   News </title>
            <meta name="description" content="Latest stories"></head>
            <body><p>Ignored paragraph</p></body></html>"#,
        );
        let metadata = extract_metadata(&document);

        assert_eq!(metadata.title, "Example News");
        assert_eq!(metadata.description, "Latest stories");
    }

    #[test]
    fn test_defaults_and_paragraph_fallback() {
        let document = Html::parse_document("<html><body><p></p><p>First real paragraph.</p></body></html>");
        let metadata = extract_metadata(&document);

        assert_eq!(metadata.title, UNTITLED);
        assert_eq!(metadata.description, "First real paragraph.");
    }

    #[test]
    fn test_no_description_at_all() {
        let document = Html::parse_document("<html><head><title>T</title></head><body></body></html>");
        assert_eq!(extract_metadata(&document).description, "");
    }
}
