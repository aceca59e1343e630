//! Review extraction for a single entity.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::dates;
use crate::discover::{self, DiscoverSettings};
use crate::extract::{
    self, query_cascade, EXPAND_TRIGGER_SELECTORS, REVIEWER_NAME, REVIEW_CONTAINER_SELECTORS,
    REVIEW_DATE, REVIEW_RATING, REVIEW_TEXT,
};
use crate::lang;
use crate::record::{Entity, ReviewRecord};
use crate::session::PageDriver;

/// Extract up to `max_reviews` records for one entity.
///
/// Failing to locate the reviews section yields an empty set, not an error:
/// some detail pages genuinely have no reviews, and a missing section must
/// not take down the rest of the target. Per-node extraction errors are
/// logged and skip only that node.
pub fn extract_reviews<D: PageDriver>(
    driver: &D,
    entity: &Entity,
    max_reviews: usize,
    settings: &DiscoverSettings,
    run_time: DateTime<Utc>,
) -> Result<Vec<ReviewRecord>> {
    debug!("Collecting reviews for {} ({})", entity.name, entity.canonical_url);

    driver.navigate(&entity.canonical_url)?;
    driver.settle(settings.settle());
    extract::dismiss_consent(driver);

    if !extract::activate_reviews(driver) {
        info!("No reviews section found for {}", entity.name);
        return Ok(Vec::new());
    }
    driver.settle(settings.settle());

    discover::discover(driver, REVIEW_CONTAINER_SELECTORS, settings);

    let nodes = query_cascade(driver, REVIEW_CONTAINER_SELECTORS);
    debug!("{}: {} review nodes after discovery", entity.name, nodes.len());

    let mut records = Vec::new();
    for (index, node) in nodes.iter().take(max_reviews).enumerate() {
        match extract_one(driver, entity, node, settings, run_time) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {
                debug!("Dropped empty review node {} for {}", index, entity.name);
            }
            Err(e) => {
                warn!("Error extracting review {} for {}: {}", index, entity.name, e);
            }
        }
    }

    Ok(records)
}

/// Extract one review node. Returns None when the node carries neither text
/// nor a rating; such nodes are never materialized.
fn extract_one<D: PageDriver>(
    driver: &D,
    entity: &Entity,
    node: &D::Node,
    settings: &DiscoverSettings,
    run_time: DateTime<Utc>,
) -> Result<Option<ReviewRecord>> {
    let reviewer = extract::first_success(driver, node, REVIEWER_NAME)
        .unwrap_or_else(|| "Anonymous".to_string());

    let rating = extract::first_rating(driver, node, REVIEW_RATING);

    let mut text = extract::first_success(driver, node, REVIEW_TEXT).unwrap_or_default();

    // Collapsed reviews hide their body behind a "More" control; expand and
    // retry once before giving up on the text.
    if text.is_empty() && expand_review(driver, node) {
        driver.settle(settings.settle());
        text = extract::first_success(driver, node, REVIEW_TEXT).unwrap_or_default();
    }

    if text.is_empty() && rating.is_none() {
        return Ok(None);
    }

    let date = match extract::first_success(driver, node, REVIEW_DATE) {
        Some(raw) => dates::resolve_review_date(&raw, run_time),
        None => run_time.format("%Y-%m-%d").to_string(),
    };

    let language = lang::detect_language(&text);

    Ok(Some(ReviewRecord {
        entity_name: entity.name.clone(),
        organization: entity.organization.clone(),
        location: entity.location.clone(),
        address: entity.address.clone(),
        reviewer,
        text,
        rating,
        date,
        language,
        source_url: entity.canonical_url.clone(),
    }))
}

fn expand_review<D: PageDriver>(driver: &D, node: &D::Node) -> bool {
    for selector in EXPAND_TRIGGER_SELECTORS {
        if let Some(button) = driver.query_within(node, selector).into_iter().next() {
            if driver.click(&button).is_ok() {
                return true;
            }
        }
    }
    false
}
