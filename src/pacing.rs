//! Inter-request pacing.
//!
//! A randomized delay between successive entities and successive targets
//! bounds the request rate of each worker. Pacing is per-worker, not
//! global: aggregate rate scales with pool size, so pool sizing is the
//! operator's throttle.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;

/// Delay ranges in milliseconds, [min, max] inclusive.
#[derive(Debug, Clone, Deserialize)]
pub struct PacingSettings {
    pub entity_delay_ms: (u64, u64),
    pub target_delay_ms: (u64, u64),
}

/// One pacer per worker slot.
#[derive(Debug, Clone)]
pub struct Pacer {
    settings: PacingSettings,
}

impl Pacer {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }

    /// Sleep a randomized interval between successive entities.
    pub fn between_entities(&self) {
        sleep_random(self.settings.entity_delay_ms);
    }

    /// Sleep a randomized interval between successive targets.
    pub fn between_targets(&self) {
        sleep_random(self.settings.target_delay_ms);
    }
}

fn sleep_random(range: (u64, u64)) {
    let delay = pick_delay(range, || rand::thread_rng().gen_range(range.0..=range.1));
    if delay > 0 {
        debug!("Pacing sleep: {} ms", delay);
        std::thread::sleep(Duration::from_millis(delay));
    }
}

/// Pick a delay from the range. Degenerate ranges short-circuit so a
/// [0, 0] configuration disables pacing entirely.
fn pick_delay(range: (u64, u64), draw: impl FnOnce() -> u64) -> u64 {
    let (min, max) = range;
    if max == 0 || min > max {
        return 0;
    }
    if min == max {
        return min;
    }
    draw()
}
