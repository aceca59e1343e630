use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One (organization, location) pair to crawl. Immutable input unit, built
/// from the cartesian product of the two input lists at run start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub organization: String,
    pub location: String,
}

impl Target {
    pub fn new(organization: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            location: location.into(),
        }
    }

    /// Build the full run queue from organization and location lists.
    pub fn cartesian_product(organizations: &[String], locations: &[String]) -> Vec<Target> {
        let mut targets = Vec::with_capacity(organizations.len() * locations.len());
        for org in organizations {
            for loc in locations {
                targets.push(Target::new(org.clone(), loc.clone()));
            }
        }
        targets
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.organization, self.location)
    }
}

/// A branch/agency discovered on the listing page for a Target, after
/// relevance filtering. Handed by value to review extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub address: String,
    pub organization: String,
    pub location: String,
    /// Resolved detail-page URL captured after clicking through the listing.
    pub canonical_url: String,
    /// Aggregate listing rating, when the listing shows one.
    pub rating: Option<f64>,
}

/// One extracted customer review.
///
/// Invariant: a record with empty `text` AND `rating == None` is never
/// materialized; such nodes are dropped at extraction time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewRecord {
    pub entity_name: String,
    pub organization: String,
    pub location: String,
    pub address: String,
    pub reviewer: String,
    pub text: String,
    /// Star rating in [1, 5], or None when no strategy yielded one.
    pub rating: Option<u8>,
    /// ISO-8601 date, resolved from relative phrases against run time.
    pub date: String,
    /// ISO 639-1 language code, or "unknown".
    pub language: String,
    pub source_url: String,
}

impl ReviewRecord {
    /// True when the record carries actual content (non-empty text or a
    /// rating). Records failing this are dropped, never persisted.
    pub fn is_substantive(&self) -> bool {
        !self.text.is_empty() || self.rating.is_some()
    }

    /// Identity used for deduplication across scroll passes and re-queries.
    pub fn dedup_key(&self) -> (String, String, String, String, Option<u8>) {
        (
            self.entity_name.clone(),
            self.source_url.clone(),
            self.reviewer.clone(),
            self.text.clone(),
            self.rating,
        )
    }
}

/// Lifecycle of one scrape run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Interrupted => "interrupted",
            RunState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Final result of a pool run: terminal state plus everything accumulated.
#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    pub records: Vec<ReviewRecord>,
    pub targets_total: usize,
    pub targets_done: usize,
    pub started_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn is_interrupted(&self) -> bool {
        self.state == RunState::Interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cartesian_product() {
        let orgs = vec!["Acme Bank".to_string(), "Omega Bank".to_string()];
        let locs = vec!["Springfield".to_string()];

        let targets = Target::cartesian_product(&orgs, &locs);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].organization, "Acme Bank");
        assert_eq!(targets[0].location, "Springfield");
        assert_eq!(targets[1].organization, "Omega Bank");
    }

    #[test]
    fn test_cartesian_product_empty_locations() {
        let orgs = vec!["Acme Bank".to_string()];
        let targets = Target::cartesian_product(&orgs, &[]);
        assert!(targets.is_empty());
    }

    #[test]
    fn test_is_substantive() {
        let mut record = ReviewRecord {
            entity_name: "Acme Bank Centre".to_string(),
            organization: "Acme Bank".to_string(),
            location: "Springfield".to_string(),
            address: "1 Main St".to_string(),
            reviewer: "Anonymous".to_string(),
            text: String::new(),
            rating: None,
            date: "2025-01-01".to_string(),
            language: "unknown".to_string(),
            source_url: "https://maps.example.com/place/1".to_string(),
        };

        assert!(!record.is_substantive());

        record.rating = Some(4);
        assert!(record.is_substantive());

        record.rating = None;
        record.text = "Great service".to_string();
        assert!(record.is_substantive());
    }
}
