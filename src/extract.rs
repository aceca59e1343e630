//! Cascading field extraction.
//!
//! The listing UI renders each logical field under several alternative DOM
//! shapes depending on experiment, version, and locale. Every field
//! therefore maps to an ordered list of [`FieldStrategy`] values, and a
//! single generic evaluator dispatches on the variant using only
//! [`PageDriver`] primitives. The first strategy producing a non-empty
//! `Success` wins. Exhausting the list is not an error: the field resolves
//! to its empty/None sentinel and processing continues. No single selector
//! change can halt a run, only degrade field completeness.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::session::PageDriver;

/// The result of trying one strategy for one field on one DOM node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome<T> {
    Success(T),
    NotFound,
    TransientError(String),
}

impl<T> ExtractionOutcome<T> {
    pub fn success(self) -> Option<T> {
        match self {
            ExtractionOutcome::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// One candidate extraction method for a field. Strategies are data, not
/// closures, so registries stay declarative and printable.
#[derive(Debug, Clone, Copy)]
pub enum FieldStrategy {
    /// Inner text of the first matching descendant.
    Text { selector: &'static str },
    /// Attribute value of the first matching descendant.
    Attr { selector: &'static str, attr: &'static str },
    /// First integer embedded in an attribute value ("4 stars" -> "4").
    AttrDigit { selector: &'static str, attr: &'static str },
    /// Number of matching descendants, as a string ("filled star" icons).
    CountNodes { selector: &'static str },
}

static FIRST_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Evaluate a single strategy against one node.
pub fn evaluate<D: PageDriver>(
    driver: &D,
    scope: &D::Node,
    strategy: &FieldStrategy,
) -> ExtractionOutcome<String> {
    match strategy {
        FieldStrategy::Text { selector } => {
            let Some(node) = driver.query_within(scope, selector).into_iter().next() else {
                return ExtractionOutcome::NotFound;
            };
            match driver.text(&node) {
                Ok(text) if !text.trim().is_empty() => {
                    ExtractionOutcome::Success(text.trim().to_string())
                }
                Ok(_) => ExtractionOutcome::NotFound,
                Err(e) => ExtractionOutcome::TransientError(e.to_string()),
            }
        }
        FieldStrategy::Attr { selector, attr } => match first_attr(driver, scope, selector, attr) {
            Ok(Some(value)) => ExtractionOutcome::Success(value),
            Ok(None) => ExtractionOutcome::NotFound,
            Err(e) => ExtractionOutcome::TransientError(e),
        },
        FieldStrategy::AttrDigit { selector, attr } => {
            match first_attr(driver, scope, selector, attr) {
                Ok(Some(value)) => match FIRST_DIGITS.find(&value) {
                    Some(m) => ExtractionOutcome::Success(m.as_str().to_string()),
                    None => ExtractionOutcome::NotFound,
                },
                Ok(None) => ExtractionOutcome::NotFound,
                Err(e) => ExtractionOutcome::TransientError(e),
            }
        }
        FieldStrategy::CountNodes { selector } => {
            let count = driver.query_within(scope, selector).len();
            if count == 0 {
                ExtractionOutcome::NotFound
            } else {
                ExtractionOutcome::Success(count.to_string())
            }
        }
    }
}

fn first_attr<D: PageDriver>(
    driver: &D,
    scope: &D::Node,
    selector: &str,
    attr: &str,
) -> Result<Option<String>, String> {
    let Some(node) = driver.query_within(scope, selector).into_iter().next() else {
        return Ok(None);
    };
    match driver.attr(&node, attr) {
        Ok(Some(value)) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Try strategies in declared order; the first non-empty `Success` wins.
pub fn first_success<D: PageDriver>(
    driver: &D,
    scope: &D::Node,
    strategies: &[FieldStrategy],
) -> Option<String> {
    for strategy in strategies {
        match evaluate(driver, scope, strategy) {
            ExtractionOutcome::Success(value) => return Some(value),
            ExtractionOutcome::NotFound => continue,
            ExtractionOutcome::TransientError(cause) => {
                debug!("Strategy {:?} failed transiently: {}", strategy, cause);
                continue;
            }
        }
    }
    None
}

/// Rating-specific cascade: the first source yielding an integer inside the
/// 1-5 domain wins; out-of-domain values are rejected and the cascade
/// continues.
pub fn first_rating<D: PageDriver>(
    driver: &D,
    scope: &D::Node,
    strategies: &[FieldStrategy],
) -> Option<u8> {
    for strategy in strategies {
        if let ExtractionOutcome::Success(raw) = evaluate(driver, scope, strategy) {
            if let Ok(value) = raw.parse::<u8>() {
                if (1..=5).contains(&value) {
                    return Some(value);
                }
            }
        }
    }
    None
}

// ============================================================================
// Field registries
// ============================================================================

/// Listing items on a search result page, most specific first.
pub const LISTING_ITEM_SELECTORS: &[&str] = &["div.Nv2PK", "div.fontHeadlineSmall"];

pub const ENTITY_NAME: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "div.qBF1Pd" },
    FieldStrategy::Text { selector: "span.fontHeadlineSmall" },
];

pub const ENTITY_ADDRESS: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "div.W4Efsd > div:nth-child(1) > span:nth-child(1)" },
    FieldStrategy::Text { selector: "div.W4Efsd div[jsan]" },
    FieldStrategy::Text { selector: "div[aria-label*='address']" },
];

pub const ENTITY_RATING: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "span.MW4etd" },
];

/// Review containers on a detail page, tried in order until one matches.
pub const REVIEW_CONTAINER_SELECTORS: &[&str] = &[
    "div.jftiEf",
    "div.gws-localreviews__google-review",
    "div[data-review-id]",
    "div.jJc9Ad",
    "div[class*='review']",
];

pub const REVIEWER_NAME: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "div.d4r55" },
    FieldStrategy::Text { selector: ".WNxzHc" },
];

pub const REVIEW_RATING: &[FieldStrategy] = &[
    FieldStrategy::AttrDigit { selector: "span[aria-label*='star' i]", attr: "aria-label" },
    FieldStrategy::CountNodes { selector: "img[src*='star_active']" },
    FieldStrategy::CountNodes { selector: "span.vzX5Ic" },
    FieldStrategy::AttrDigit { selector: "span.kvMYJc", attr: "aria-label" },
];

pub const REVIEW_TEXT: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "span.wiI7pd" },
    FieldStrategy::Text { selector: "span.review-full-text" },
    FieldStrategy::Text { selector: "div.MyEned" },
    FieldStrategy::Text { selector: "div.review-content" },
];

pub const REVIEW_DATE: &[FieldStrategy] = &[
    FieldStrategy::Text { selector: "span.rsqaWe" },
    FieldStrategy::Text { selector: "span.review-date" },
    FieldStrategy::Text { selector: "span[class*='date']" },
];

/// "More"/expand affordances that gate collapsed review text and further
/// pages of reviews.
pub const EXPAND_TRIGGER_SELECTORS: &[&str] = &[
    "button.w8nwRe",
    "button[aria-label*='More']",
    "button[jsaction*='pane.review']",
];

/// Scrollable feed containers, most specific first; whole-page scroll is the
/// fallback when none match.
pub const SCROLL_CONTAINER_SELECTORS: &[&str] = &[
    "div[role='feed']",
    "div.m6QErb.DxyBCb.kA9KIf.dS8AEf",
    "div.m6QErb",
    "div.DxyBCb.kA9KIf.dS8AEf",
    "div.lXJj5c.Hk4XGb",
];

/// Consent/interstitial dismiss buttons.
pub const CONSENT_SELECTORS: &[&str] = &[
    "button[aria-label*='Accept']",
    "button[aria-label*='Agree']",
    "button[jsaction*='consent']",
    "button[jsaction*='agree']",
    "[aria-label*='cookie'] button",
    "[aria-label*='consent'] button",
];

/// One candidate method for activating the reviews section of a detail page.
#[derive(Debug, Clone, Copy)]
pub enum ActivationStrategy {
    /// Click the first element matching the selector.
    ClickFirst { selector: &'static str },
    /// Click the first matching element whose text contains any needle
    /// (case-insensitive).
    ClickMatchingText { selector: &'static str, needles: &'static [&'static str] },
    /// Scroll the nth matching element into view.
    ScrollIntoView { selector: &'static str, index: usize },
}

pub const REVIEWS_ACTIVATION: &[ActivationStrategy] = &[
    ActivationStrategy::ClickFirst { selector: "button[aria-label*='review']" },
    ActivationStrategy::ClickFirst { selector: "button[aria-label*='avis']" },
    ActivationStrategy::ClickFirst { selector: "button[aria-label*='★']" },
    ActivationStrategy::ClickMatchingText { selector: "button.hh2c6", needles: &["review", "avis"] },
    ActivationStrategy::ClickMatchingText { selector: "div.RWPxGd button", needles: &["review", "avis"] },
    ActivationStrategy::ScrollIntoView { selector: "div.m6QErb.DxyBCb.kA9KIf.dS8AEf", index: 1 },
];

/// Run the activation cascade; true once any strategy lands.
pub fn activate_reviews<D: PageDriver>(driver: &D) -> bool {
    for strategy in REVIEWS_ACTIVATION {
        let activated = match strategy {
            ActivationStrategy::ClickFirst { selector } => driver
                .query(selector)
                .first()
                .map(|node| driver.click(node).is_ok())
                .unwrap_or(false),
            ActivationStrategy::ClickMatchingText { selector, needles } => {
                let mut clicked = false;
                for node in driver.query(selector) {
                    let Ok(text) = driver.text(&node) else { continue };
                    let lower = text.to_lowercase();
                    if needles.iter().any(|n| lower.contains(n)) && driver.click(&node).is_ok() {
                        clicked = true;
                        break;
                    }
                }
                clicked
            }
            ActivationStrategy::ScrollIntoView { selector, index } => driver
                .query(selector)
                .get(*index)
                .map(|node| driver.scroll_into_view(node).is_ok())
                .unwrap_or(false),
        };

        if activated {
            debug!("Reviews section activated via {:?}", strategy);
            return true;
        }
    }
    false
}

/// Best-effort consent/interstitial dismissal. Absence is the common case
/// and never an error.
pub fn dismiss_consent<D: PageDriver>(driver: &D) -> bool {
    for selector in CONSENT_SELECTORS {
        if let Some(node) = driver.query(selector).first() {
            if driver.click(node).is_ok() {
                debug!("Dismissed consent overlay via {}", selector);
                return true;
            }
        }
    }
    false
}

/// Query a selector cascade: the first selector with any match supplies the
/// node list.
pub fn query_cascade<D: PageDriver>(driver: &D, selectors: &[&str]) -> Vec<D::Node> {
    for selector in selectors {
        let nodes = driver.query(selector);
        if !nodes.is_empty() {
            return nodes;
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use std::collections::HashMap;

    /// Minimal in-memory driver: one flat scope whose children are keyed by
    /// exact selector string.
    #[derive(Default)]
    struct FlatDriver {
        children: HashMap<&'static str, Vec<FlatNode>>,
    }

    #[derive(Clone)]
    struct FlatNode {
        text: String,
        attrs: Vec<(String, String)>,
        failing: bool,
    }

    impl FlatNode {
        fn text(t: &str) -> Self {
            Self { text: t.to_string(), attrs: vec![], failing: false }
        }

        fn attr(name: &str, value: &str) -> Self {
            Self {
                text: String::new(),
                attrs: vec![(name.to_string(), value.to_string())],
                failing: false,
            }
        }
    }

    impl PageDriver for FlatDriver {
        type Node = FlatNode;

        fn navigate(&self, _url: &str) -> Result<(), SessionError> {
            Ok(())
        }

        fn query(&self, selector: &str) -> Vec<FlatNode> {
            self.children.get(selector).cloned().unwrap_or_default()
        }

        fn query_within(&self, _scope: &FlatNode, selector: &str) -> Vec<FlatNode> {
            self.query(selector)
        }

        fn text(&self, node: &FlatNode) -> Result<String, SessionError> {
            if node.failing {
                return Err(SessionError::Driver("node went away".to_string()));
            }
            Ok(node.text.clone())
        }

        fn attr(&self, node: &FlatNode, name: &str) -> Result<Option<String>, SessionError> {
            Ok(node
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()))
        }

        fn click(&self, _node: &FlatNode) -> Result<(), SessionError> {
            Ok(())
        }

        fn scroll_into_view(&self, _node: &FlatNode) -> Result<(), SessionError> {
            Ok(())
        }

        fn scroll_to_bottom(&self, _scope: Option<&FlatNode>) {}

        fn back(&self) {}

        fn current_url(&self) -> String {
            String::new()
        }

        fn settle(&self, _wait: std::time::Duration) {}
    }

    fn scope() -> FlatNode {
        FlatNode::text("")
    }

    #[test]
    fn test_first_success_falls_through_to_third_strategy() {
        let mut driver = FlatDriver::default();
        driver.children.insert("c", vec![FlatNode::text("x")]);

        let strategies = [
            FieldStrategy::Text { selector: "a" },
            FieldStrategy::Text { selector: "b" },
            FieldStrategy::Text { selector: "c" },
        ];

        assert_eq!(first_success(&driver, &scope(), &strategies), Some("x".to_string()));
    }

    #[test]
    fn test_exhausted_strategies_yield_none_not_error() {
        let driver = FlatDriver::default();
        let strategies = [
            FieldStrategy::Text { selector: "a" },
            FieldStrategy::Attr { selector: "b", attr: "href" },
        ];
        assert_eq!(first_success(&driver, &scope(), &strategies), None);
    }

    #[test]
    fn test_transient_error_does_not_abort_cascade() {
        let mut driver = FlatDriver::default();
        let mut broken = FlatNode::text("never seen");
        broken.failing = true;
        driver.children.insert("a", vec![broken]);
        driver.children.insert("b", vec![FlatNode::text("fallback")]);

        let strategies = [
            FieldStrategy::Text { selector: "a" },
            FieldStrategy::Text { selector: "b" },
        ];
        assert_eq!(
            first_success(&driver, &scope(), &strategies),
            Some("fallback".to_string())
        );
    }

    #[test]
    fn test_empty_text_counts_as_not_found() {
        let mut driver = FlatDriver::default();
        driver.children.insert("a", vec![FlatNode::text("   ")]);
        driver.children.insert("b", vec![FlatNode::text("real")]);

        let strategies = [
            FieldStrategy::Text { selector: "a" },
            FieldStrategy::Text { selector: "b" },
        ];
        assert_eq!(first_success(&driver, &scope(), &strategies), Some("real".to_string()));
    }

    #[test]
    fn test_rating_from_aria_label() {
        let mut driver = FlatDriver::default();
        driver
            .children
            .insert("stars", vec![FlatNode::attr("aria-label", "4 stars")]);

        let strategies = [FieldStrategy::AttrDigit { selector: "stars", attr: "aria-label" }];
        assert_eq!(first_rating(&driver, &scope(), &strategies), Some(4));
    }

    #[test]
    fn test_rating_star_count_fallback() {
        let mut driver = FlatDriver::default();
        driver.children.insert(
            "filled",
            vec![
                FlatNode::text(""),
                FlatNode::text(""),
                FlatNode::text(""),
            ],
        );

        let strategies = [
            FieldStrategy::AttrDigit { selector: "aria", attr: "aria-label" },
            FieldStrategy::CountNodes { selector: "filled" },
        ];
        assert_eq!(first_rating(&driver, &scope(), &strategies), Some(3));
    }

    #[test]
    fn test_rating_out_of_domain_rejected() {
        let mut driver = FlatDriver::default();
        driver
            .children
            .insert("aria", vec![FlatNode::attr("aria-label", "17 reviews")]);
        driver.children.insert(
            "filled",
            vec![FlatNode::text(""), FlatNode::text("")],
        );

        // 17 is outside [1,5]; the count fallback supplies the value
        let strategies = [
            FieldStrategy::AttrDigit { selector: "aria", attr: "aria-label" },
            FieldStrategy::CountNodes { selector: "filled" },
        ];
        assert_eq!(first_rating(&driver, &scope(), &strategies), Some(2));
    }

    #[test]
    fn test_query_cascade_prefers_first_matching_selector() {
        let mut driver = FlatDriver::default();
        driver.children.insert("second", vec![FlatNode::text("2")]);

        let nodes = query_cascade(&driver, &["first", "second"]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text, "2");
    }
}
