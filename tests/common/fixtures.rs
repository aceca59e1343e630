//! Fixture builders for scripted sites.

use super::mock_page::MockSite;

pub struct ReviewFixture {
    pub reviewer: &'static str,
    pub text: &'static str,
    pub stars: Option<u8>,
    pub date: &'static str,
}

impl ReviewFixture {
    pub fn empty() -> Self {
        Self {
            reviewer: "Silent Customer",
            text: "",
            stars: None,
            date: "",
        }
    }
}

pub struct EntityFixture {
    pub name: &'static str,
    pub address: &'static str,
    pub listing_rating: &'static str,
    pub detail_url: &'static str,
    pub reviews: Vec<ReviewFixture>,
}

/// Register one listing page with its entities and their detail pages.
pub fn add_listing(site: &mut MockSite, listing_url: &str, entities: &[EntityFixture]) {
    for entity in entities {
        let item = site.add_node("");
        site.add_page_root(listing_url, "div.Nv2PK", item);

        let name = site.add_node_with_attr(entity.name, "data-href", entity.detail_url);
        site.add_child(item, "div.qBF1Pd", name);

        let address = site.add_node(entity.address);
        site.add_child(
            item,
            "div.W4Efsd > div:nth-child(1) > span:nth-child(1)",
            address,
        );

        if !entity.listing_rating.is_empty() {
            let rating = site.add_node(entity.listing_rating);
            site.add_child(item, "span.MW4etd", rating);
        }

        add_detail_page(site, entity);
    }
}

fn add_detail_page(site: &mut MockSite, entity: &EntityFixture) {
    let url = entity.detail_url;

    let reviews_button = site.add_node("Reviews");
    site.add_page_root(url, "button[aria-label*='review']", reviews_button);

    for review in &entity.reviews {
        let container = site.add_node("");
        site.add_page_root(url, "div.jftiEf", container);

        let reviewer = site.add_node(review.reviewer);
        site.add_child(container, "div.d4r55", reviewer);

        if !review.text.is_empty() {
            let text = site.add_node(review.text);
            site.add_child(container, "span.wiI7pd", text);
        }

        if let Some(stars) = review.stars {
            let label = format!("{} stars", stars);
            let rating = site.add_node_with_attr("", "aria-label", &label);
            site.add_child(container, "span[aria-label*='star' i]", rating);
        }

        if !review.date.is_empty() {
            let date = site.add_node(review.date);
            site.add_child(container, "span.rsqaWe", date);
        }
    }
}

/// A single-entity listing for a second target. Detail URLs are disjoint
/// from the Springfield set so the two listings never share pages.
pub fn acme_shelbyville_entities() -> Vec<EntityFixture> {
    vec![EntityFixture {
        name: "Acme Bank Shelbyville",
        address: "5 River Rd, Shelbyville",
        listing_rating: "4.1",
        detail_url: "https://maps.example.com/place/acme-shelbyville",
        reviews: vec![ReviewFixture {
            reviewer: "E. Moreau",
            text: "Quick service and convenient parking.",
            stars: Some(4),
            date: "today",
        }],
    }]
}

/// The canonical two-entity scenario: each entity carries three reviews, one
/// of which has neither text nor rating and must be dropped.
pub fn acme_springfield_entities() -> Vec<EntityFixture> {
    vec![
        EntityFixture {
            name: "Acme Bank Centre Ville",
            address: "12 Main St, Springfield",
            listing_rating: "4.5",
            detail_url: "https://maps.example.com/place/acme-centre",
            reviews: vec![
                ReviewFixture {
                    reviewer: "A. Dupont",
                    text: "Excellent service, the staff were friendly and efficient.",
                    stars: Some(5),
                    date: "2 weeks ago",
                },
                ReviewFixture {
                    reviewer: "B. Martin",
                    text: "Long queue at the counter but the advisor was helpful.",
                    stars: Some(3),
                    date: "3 months ago",
                },
                ReviewFixture::empty(),
            ],
        },
        EntityFixture {
            name: "Acme Bank Agence Nord",
            address: "88 North Ave, Springfield",
            listing_rating: "3.9",
            detail_url: "https://maps.example.com/place/acme-nord",
            reviews: vec![
                ReviewFixture {
                    reviewer: "C. Bernard",
                    text: "Le personnel est très accueillant et le service est rapide.",
                    stars: Some(4),
                    date: "il y a 1 semaine",
                },
                ReviewFixture {
                    reviewer: "D. Petit",
                    text: "",
                    stars: Some(2),
                    date: "today",
                },
                ReviewFixture::empty(),
            ],
        },
    ]
}
