//! Target crawling: one (organization, location) pair to a list of
//! relevance-filtered entities with resolved detail-page URLs.

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::discover::{self, DiscoverSettings};
use crate::extract::{
    self, query_cascade, ENTITY_ADDRESS, ENTITY_NAME, ENTITY_RATING, LISTING_ITEM_SELECTORS,
};
use crate::record::{Entity, Target};
use crate::session::PageDriver;

/// Build the search URL for a target from the configured template.
pub fn search_url(target: &Target, search: &SearchConfig) -> String {
    let mut query = format!("{} {}", target.organization, target.location);
    if !search.query_suffix.is_empty() {
        query.push(' ');
        query.push_str(&search.query_suffix);
    }
    search
        .url_template
        .replace("{query}", &query.replace(' ', "+"))
}

/// Relevance filter: the candidate name must contain the organization name
/// or one of the configured domain keywords, case-insensitively.
pub fn is_relevant(name: &str, organization: &str, keywords: &[String]) -> bool {
    let name_lower = name.to_lowercase();
    if name_lower.contains(&organization.to_lowercase()) {
        return true;
    }
    keywords.iter().any(|k| name_lower.contains(&k.to_lowercase()))
}

/// Crawl one target: search, stabilize the listing, then resolve each
/// relevant candidate to an entity with a canonical detail-page URL.
///
/// Candidates are re-queried by position after every click/back round trip
/// because node identities do not survive navigation. A failing candidate is
/// skipped, never aborting the remainder of the target.
pub fn crawl_target<D: PageDriver>(
    driver: &D,
    target: &Target,
    search: &SearchConfig,
    settings: &DiscoverSettings,
) -> Result<Vec<Entity>> {
    let url = search_url(target, search);
    debug!("Searching {} via {}", target, url);

    driver.navigate(&url)?;
    driver.settle(settings.settle());
    extract::dismiss_consent(driver);

    let listing_url = driver.current_url();
    let count = discover::discover(driver, LISTING_ITEM_SELECTORS, settings);
    let limit = count.min(search.max_entities);
    debug!("{}: {} candidates listed, processing {}", target, count, limit);

    let mut entities = Vec::new();
    for index in 0..limit {
        match resolve_candidate(driver, target, search, settings, index, &listing_url) {
            Ok(Some(entity)) => {
                debug!("Accepted entity: {} ({})", entity.name, entity.address);
                entities.push(entity);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Skipping candidate {} for {}: {}", index, target, e);
            }
        }
    }

    Ok(entities)
}

/// Resolve the candidate at `index`: extract fields, filter relevance, then
/// click through to capture the canonical URL and return to the listing.
fn resolve_candidate<D: PageDriver>(
    driver: &D,
    target: &Target,
    search: &SearchConfig,
    settings: &DiscoverSettings,
    index: usize,
    listing_url: &str,
) -> Result<Option<Entity>> {
    let items = query_cascade(driver, LISTING_ITEM_SELECTORS);
    let Some(item) = items.get(index) else {
        debug!("Candidate {} no longer present after re-query", index);
        return Ok(None);
    };

    let Some(name) = extract::first_success(driver, item, ENTITY_NAME) else {
        return Ok(None);
    };

    if !is_relevant(&name, &target.organization, &search.relevance_keywords) {
        debug!("Filtered out irrelevant candidate: {}", name);
        return Ok(None);
    }

    let address = extract::first_success(driver, item, ENTITY_ADDRESS)
        .unwrap_or_else(|| target.location.clone());

    let rating = extract::first_success(driver, item, ENTITY_RATING)
        .and_then(|raw| raw.replace(',', ".").parse::<f64>().ok());

    // Prefer clicking the name element; fall back to the item itself when
    // the inner node is not present under the matched selector variant.
    let name_node = ENTITY_NAME
        .iter()
        .find_map(|strategy| match strategy {
            extract::FieldStrategy::Text { selector } => {
                driver.query_within(item, selector).into_iter().next()
            }
            _ => None,
        });

    let click_result = match &name_node {
        Some(node) => driver.click(node),
        None => driver.click(item),
    };
    click_result?;
    driver.settle(settings.settle());

    let canonical_url = driver.current_url();

    driver.back();
    driver.settle(settings.settle());

    // Navigating back can land on a stale view when history is shallow;
    // re-navigate to the listing explicitly in that case.
    if driver.current_url() != listing_url {
        driver.navigate(listing_url)?;
        driver.settle(settings.settle());
    }

    Ok(Some(Entity {
        name,
        address,
        organization: target.organization.clone(),
        location: target.location.clone(),
        canonical_url,
        rating,
    }))
}
