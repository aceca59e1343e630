pub mod fixtures;
pub mod mock_page;

use mapreviews::config::SearchConfig;
use mapreviews::discover::DiscoverSettings;
use mapreviews::pacing::PacingSettings;
use mapreviews::pool::UnitContext;

/// A unit context with zeroed delays so tests run instantly.
pub fn fast_context(search: SearchConfig, max_reviews: usize) -> UnitContext {
    UnitContext {
        search,
        discover: DiscoverSettings {
            max_scroll_iterations: 5,
            max_trigger_clicks: 3,
            settle_ms: 0,
        },
        pacing: PacingSettings {
            entity_delay_ms: (0, 0),
            target_delay_ms: (0, 0),
        },
        max_reviews,
        run_time: chrono::Utc::now(),
    }
}

pub fn search_config() -> SearchConfig {
    SearchConfig {
        url_template: "https://maps.example.com/search/{query}".to_string(),
        query_suffix: String::new(),
        relevance_keywords: vec![
            "bank".to_string(),
            "banque".to_string(),
            "atm".to_string(),
            "agence".to_string(),
        ],
        max_entities: 10,
    }
}
