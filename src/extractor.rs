use crate::utils::normalize_whitespace;
use crate::{OptimizerError, ProductListing};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

/// How many following element siblings of a landmark are inspected for its content.
pub const MAX_LANDMARK_DISTANCE: usize = 8;

pub const DESCRIPTION_PLACEHOLDER: &str = "No description available";

const TITLE_SELECTORS: [&str; 2] = ["#productTitle", "#title"];
const BULLETS_LANDMARK: &str = "About this item";
const DESCRIPTION_LANDMARK: &str = "Product description";
const CAPTCHA_PHRASE: &str = "Enter the characters you see below";

/// Listing extractor, turns a product page into title, bullets and description.
///
/// Sections other than the title are located through landmark headings rather than
/// fixed selectors, so a missing or reshuffled section degrades to an empty result.
#[derive(Clone, Default)]
pub struct ListingExtractor;

impl ListingExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> Result<ProductListing, OptimizerError> {
        let document = Html::parse_document(html);

        let title = match self.extract_title(&document) {
            Some(title) => title,
            None if self.is_captcha_page(&document) => {
                warn!("Product page is a robot check");
                return Err(OptimizerError::ProductInaccessible(
                    "marketplace served a captcha page".to_string(),
                ));
            }
            None => {
                warn!("Product title element missing");
                return Err(OptimizerError::ProductNotFound(
                    "title element missing".to_string(),
                ));
            }
        };

        let bullets = self.extract_bullets(&document);
        let description = self.extract_description(&document, &bullets);

        debug!(
            title = %crate::truncate_str(&title, 50),
            bullets = bullets.len(),
            description_len = description.len(),
            "Extracted product listing"
        );

        Ok(ProductListing {
            title,
            bullets,
            description,
        })
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        TITLE_SELECTORS.iter().find_map(|css| {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .map(element_text)
                .find(|text| !text.is_empty())
        })
    }

    fn extract_bullets(&self, document: &Html) -> Vec<String> {
        let Some(list) = find_after_landmark(document, BULLETS_LANDMARK, "ul") else {
            debug!("No bullet list found after landmark");
            return Vec::new();
        };

        let items = collect_texts(list, "li span.a-list-item");
        if !items.is_empty() {
            return items;
        }
        direct_items(list)
    }

    fn extract_description(&self, document: &Html, bullets: &[String]) -> String {
        let description = find_after_landmark(document, DESCRIPTION_LANDMARK, "p, div")
            .map(element_text)
            .unwrap_or_default();

        if !description.is_empty() {
            return description;
        }
        if !bullets.is_empty() {
            debug!("Description falls back to joined bullets");
            return bullets.join(" ");
        }
        DESCRIPTION_PLACEHOLDER.to_string()
    }

    fn is_captcha_page(&self, document: &Html) -> bool {
        let has_form = Selector::parse("form[action*='validateCaptcha']")
            .map(|selector| document.select(&selector).next().is_some())
            .unwrap_or(false);

        has_form
            || document
                .root_element()
                .text()
                .any(|piece| piece.contains(CAPTCHA_PHRASE))
    }
}

/// Phase one picks every element whose text reads exactly `landmark`, in document order.
/// Phase two looks at a bounded run of following siblings of each candidate for an element
/// matching `target`, either the sibling itself or something inside it.
fn find_after_landmark<'a>(
    document: &'a Html,
    landmark: &str,
    target: &str,
) -> Option<ElementRef<'a>> {
    let any = Selector::parse("*").ok()?;
    let target = Selector::parse(target).ok()?;

    document
        .select(&any)
        .filter(|el| has_landmark_text(*el, landmark))
        .find_map(|el| nearest_following(el, &target))
}

fn nearest_following<'a>(landmark: ElementRef<'a>, target: &Selector) -> Option<ElementRef<'a>> {
    landmark
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take(MAX_LANDMARK_DISTANCE)
        .find_map(|sibling| {
            if target.matches(&sibling) {
                Some(sibling)
            } else {
                sibling.select(target).next()
            }
        })
}

fn has_landmark_text(el: ElementRef<'_>, landmark: &str) -> bool {
    let budget = landmark.chars().filter(|c| !c.is_whitespace()).count();
    let mut text = String::new();
    let mut significant = 0;

    for piece in el.text() {
        significant += piece.chars().filter(|c| !c.is_whitespace()).count();
        if significant > budget {
            return false;
        }
        text.push_str(piece);
    }

    normalize_whitespace(&text) == landmark
}

fn collect_texts(scope: ElementRef<'_>, css: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(css) else {
        return Vec::new();
    };

    scope
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

/// Texts of the list's own `li` children; nested lists stay part of their parent item.
fn direct_items(list: ElementRef<'_>) -> Vec<String> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!("<!DOCTYPE html><html><head><title>Amazon</title></head><body>{body}</body></html>")
    }

    #[test]
    fn test_landmark_text_is_exact() {
        let html = Html::parse_fragment("<h1> About\n this   item </h1><h2>About this item!</h2>");
        let selector = Selector::parse("h1, h2").unwrap();
        let matches: Vec<bool> = html
            .select(&selector)
            .map(|el| has_landmark_text(el, BULLETS_LANDMARK))
            .collect();
        assert_eq!(matches, vec![true, false]);
    }

    #[test]
    fn test_nested_landmark_climbs_to_wrapper() {
        let html = page(
            r#"<span id="productTitle">Lamp</span>
            <div><h1><span>About this item</span></h1></div>
            <ul><li><span class="a-list-item">Bright</span></li></ul>"#,
        );
        let listing = ListingExtractor::new().extract(&html).unwrap();
        assert_eq!(listing.bullets, vec!["Bright"]);
    }

    #[test]
    fn test_list_beyond_distance_is_ignored() {
        let filler = "<p>x</p>".repeat(MAX_LANDMARK_DISTANCE);
        let html = page(&format!(
            r#"<span id="productTitle">Lamp</span>
            <div><h1>About this item</h1>{filler}<ul><li>Too far</li></ul></div>"#
        ));
        let listing = ListingExtractor::new().extract(&html).unwrap();
        assert!(listing.bullets.is_empty());
        assert_eq!(listing.description, DESCRIPTION_PLACEHOLDER);
    }

    #[test]
    fn test_plain_li_fallback() {
        let html = page(
            r#"<span id="productTitle">Lamp</span>
            <h1>About this item</h1><ul><li> Warm light </li><li>  </li><li>USB powered</li></ul>"#,
        );
        let listing = ListingExtractor::new().extract(&html).unwrap();
        assert_eq!(listing.bullets, vec!["Warm light", "USB powered"]);
    }

    #[test]
    fn test_nested_list_items_are_not_repeated() {
        let html = page(
            r#"<span id="productTitle">Lamp</span>
            <h1>About this item</h1>
            <ul>
                <li>Modes <ul><li>Warm</li> <li>Cool</li></ul></li>
                <li>USB powered</li>
            </ul>"#,
        );
        let listing = ListingExtractor::new().extract(&html).unwrap();
        assert_eq!(listing.bullets, vec!["Modes Warm Cool", "USB powered"]);
    }

    #[test]
    fn test_title_fallback_selector() {
        let html = page(r#"<div id="title"> Desk  Lamp </div>"#);
        let listing = ListingExtractor::new().extract(&html).unwrap();
        assert_eq!(listing.title, "Desk Lamp");
    }

    #[test]
    fn test_empty_title_is_not_found() {
        let html = page(r#"<span id="productTitle">   </span>"#);
        assert!(matches!(
            ListingExtractor::new().extract(&html),
            Err(OptimizerError::ProductNotFound(_))
        ));
    }
}
