//! Progressive content discovery.
//!
//! Listing feeds lazy-load on scroll and sometimes gate further pages behind
//! an explicit "more" control, with no end marker. The discoverer scrolls
//! (or clicks) until the visible item count is stable across two consecutive
//! passes, with a hard iteration ceiling so rendering jitter can never spin
//! the loop forever.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::extract::{query_cascade, EXPAND_TRIGGER_SELECTORS, SCROLL_CONTAINER_SELECTORS};
use crate::session::PageDriver;

/// Bounds and timing for the discovery loops.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverSettings {
    /// Hard ceiling on scroll/recount iterations.
    pub max_scroll_iterations: usize,
    /// Hard ceiling on explicit "more" trigger clicks.
    pub max_trigger_clicks: usize,
    /// Fixed settle interval after each scroll or click, in milliseconds.
    pub settle_ms: u64,
}

impl DiscoverSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Core stability loop, separated from the driver so termination is
/// verifiable in isolation. `count_after_scroll` performs one scroll pass
/// and returns the resulting item count; the loop stops as soon as a pass
/// leaves the count unchanged, or at the iteration ceiling.
///
/// Returns (final count, iterations executed).
pub fn run_until_stable(
    initial_count: usize,
    max_iterations: usize,
    mut count_after_scroll: impl FnMut(usize) -> usize,
) -> (usize, usize) {
    let mut previous = initial_count;
    for iteration in 0..max_iterations {
        let current = count_after_scroll(iteration);
        if current == previous {
            return (current, iteration + 1);
        }
        previous = current;
    }
    (previous, max_iterations)
}

/// Drive the feed until the candidate list stops growing.
///
/// Returns the stabilized item count. Also exhausts any explicit "more"
/// trigger controls afterwards, independent of the scroll loop, because some
/// UI variants page exclusively through the control.
pub fn discover<D: PageDriver>(
    driver: &D,
    item_selectors: &[&str],
    settings: &DiscoverSettings,
) -> usize {
    let container = find_scroll_container(driver);
    if container.is_none() {
        debug!("No scrollable container matched; falling back to page scroll");
    }

    let initial = count_items(driver, item_selectors);
    let (count, iterations) = run_until_stable(initial, settings.max_scroll_iterations, |_| {
        click_first_trigger(driver);
        driver.scroll_to_bottom(container.as_ref());
        driver.settle(settings.settle());
        count_items(driver, item_selectors)
    });
    debug!("Feed stabilized at {} items after {} iterations", count, iterations);

    exhaust_triggers(driver, settings);

    count_items(driver, item_selectors)
}

/// Click any visible "more" trigger until none remains, bounded by the
/// configured ceiling.
pub fn exhaust_triggers<D: PageDriver>(driver: &D, settings: &DiscoverSettings) {
    for _ in 0..settings.max_trigger_clicks {
        if !click_first_trigger(driver) {
            return;
        }
        driver.settle(settings.settle());
    }
}

fn click_first_trigger<D: PageDriver>(driver: &D) -> bool {
    for selector in EXPAND_TRIGGER_SELECTORS {
        if let Some(node) = driver.query(selector).first() {
            if driver.click(node).is_ok() {
                return true;
            }
        }
    }
    false
}

fn find_scroll_container<D: PageDriver>(driver: &D) -> Option<D::Node> {
    query_cascade(driver, SCROLL_CONTAINER_SELECTORS).into_iter().next()
}

fn count_items<D: PageDriver>(driver: &D, item_selectors: &[&str]) -> usize {
    query_cascade(driver, item_selectors).len()
}
