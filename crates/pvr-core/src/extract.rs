//! Video link extraction from the rendered profile page.

use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use thiserror::Error;

/// One video link found on the profile page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkItem {
    /// Video detail page URL truncated before its query string.
    pub resource_id: String,
    /// Anchor text, HTML-decoded; becomes the output filename slug.
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("profile page has no content container (div.content-1)")]
    MissingContainer,
}

fn container_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div.content-1").expect("static selector"))
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a.title").expect("static selector"))
}

fn video_href_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://plays\.tv/video/[0-9a-f]+/").expect("static regex")
    })
}

/// Extracts video links from the rendered profile page, in document order.
///
/// Matching anchors are `a.title` elements inside the single `div.content-1`
/// container whose href points at a video detail page. An anchor whose href
/// carries no query string is malformed snapshot data and is skipped with a
/// warning rather than aborting the run.
pub fn extract_links(page_markup: &str) -> Result<Vec<LinkItem>, ExtractError> {
    let document = Html::parse_document(page_markup);
    let container = document
        .select(container_selector())
        .next()
        .ok_or(ExtractError::MissingContainer)?;

    let mut items = Vec::new();
    for anchor in container.select(anchor_selector()) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !video_href_pattern().is_match(href) {
            continue;
        }
        let Some((resource_id, _query)) = href.split_once('?') else {
            tracing::warn!(href, "video link without query string, skipping");
            continue;
        };
        let display_name: String = anchor.text().collect();
        items.push(LinkItem {
            resource_id: resource_id.to_string(),
            display_name,
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE: &str = r#"
        <html><body>
          <div class="header">not this one</div>
          <div class="content-1">
            <a class="title" href="https://plays.tv/video/0a1b2c/first-clip?from=user_page">First Clip</a>
            <a class="other" href="https://plays.tv/video/ffffff/not-a-title?x=1">Wrong class</a>
            <a class="title" href="https://plays.tv/video/3d4e5f/second-clip?from=user_page">Second &amp; Clip</a>
            <a class="title" href="https://example.com/video/123abc/off-site?x=1">Off-site</a>
            <a class="title" href="https://plays.tv/video/678901/third-clip?feed=1&amp;pos=3">Third Clip</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_matching_anchors_in_document_order() {
        let items = extract_links(PROFILE).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[0],
            LinkItem {
                resource_id: "https://plays.tv/video/0a1b2c/first-clip".to_string(),
                display_name: "First Clip".to_string(),
            }
        );
        assert_eq!(items[1].resource_id, "https://plays.tv/video/3d4e5f/second-clip");
        assert_eq!(items[2].resource_id, "https://plays.tv/video/678901/third-clip");
    }

    #[test]
    fn decodes_html_entities_in_display_names() {
        let items = extract_links(PROFILE).unwrap();
        assert_eq!(items[1].display_name, "Second & Clip");
    }

    #[test]
    fn truncates_resource_id_before_query() {
        let items = extract_links(PROFILE).unwrap();
        assert!(items.iter().all(|i| !i.resource_id.contains('?')));
    }

    #[test]
    fn missing_container_is_an_error() {
        let markup = r#"<html><body><div class="content-2"></div></body></html>"#;
        assert!(matches!(
            extract_links(markup),
            Err(ExtractError::MissingContainer)
        ));
    }

    #[test]
    fn anchor_without_query_is_skipped() {
        let markup = r#"
            <div class="content-1">
              <a class="title" href="https://plays.tv/video/abcdef/no-query">No Query</a>
              <a class="title" href="https://plays.tv/video/abc123/ok?x=1">Ok</a>
            </div>
        "#;
        let items = extract_links(markup).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].display_name, "Ok");
    }

    #[test]
    fn empty_container_yields_no_items() {
        let markup = r#"<div class="content-1"></div>"#;
        let items = extract_links(markup).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn anchors_with_extra_classes_still_match() {
        let markup = r#"
            <div class="content-1 wide">
              <a class="title bold" href="https://plays.tv/video/aaaa11/clip?x=1">Clip</a>
            </div>
        "#;
        let items = extract_links(markup).unwrap();
        assert_eq!(items.len(), 1);
    }
}
