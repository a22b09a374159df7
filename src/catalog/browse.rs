//! Browse read-path: text search, filters and sorting over listings.
//!
//! Filters compose with AND. Sorting happens once, after filtering; the sort
//! is stable, so ties keep the store's iteration order.

use std::str::FromStr;

use super::types::{Condition, Listing, StatusFilter};
use crate::error::MarketError;
use crate::money::Cents;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// createdAt descending
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
    /// views + favorites descending
    Popularity,
}

impl FromStr for SortOrder {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(SortOrder::Newest),
            "price-low" => Ok(SortOrder::PriceLowToHigh),
            "price-high" => Ok(SortOrder::PriceHighToLow),
            "popular" | "popularity" => Ok(SortOrder::Popularity),
            other => Err(MarketError::validation(format!("Unknown sort order: {}", other))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BrowseQuery {
    /// Case-insensitive substring over title, description and tags
    pub text: Option<String>,
    pub category: Option<String>,
    pub condition: Option<Condition>,
    /// Inclusive bounds
    pub min_price: Option<Cents>,
    pub max_price: Option<Cents>,
    pub status: StatusFilter,
    pub sort: SortOrder,
}

impl BrowseQuery {
    pub fn matches(&self, listing: &Listing) -> bool {
        if !self.status.matches(listing.status) {
            return false;
        }
        if let Some(text) = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = listing.title.to_lowercase().contains(&needle)
                || listing.description.to_lowercase().contains(&needle)
                || listing.tags.iter().any(|tag| tag.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &listing.category != category {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if listing.condition != condition {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| listing.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| listing.price > max) {
            return false;
        }
        true
    }
}

pub fn browse<'a, I>(listings: I, query: &BrowseQuery) -> Vec<Listing>
where
    I: IntoIterator<Item = &'a Listing>,
{
    let mut hits: Vec<Listing> = listings
        .into_iter()
        .filter(|l| query.matches(l))
        .cloned()
        .collect();

    match query.sort {
        SortOrder::Newest => hits.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortOrder::PriceLowToHigh => hits.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceHighToLow => hits.sort_by(|a, b| b.price.cmp(&a.price)),
        SortOrder::Popularity => hits.sort_by(|a, b| b.popularity().cmp(&a.popularity())),
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ListingStatus;
    use crate::storage::fixtures;
    use chrono::Duration;

    fn titles(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.title.as_str()).collect()
    }

    fn sample() -> Vec<Listing> {
        let seller = fixtures::account("seller@example.com");
        let mut lamp = fixtures::listing(&seller, "Brass Lamp", 3500);
        lamp.category = "Furniture".to_string();
        lamp.condition = Condition::Excellent;
        lamp.views = 10;

        let mut novel = fixtures::listing(&seller, "Paperback Novel", 800);
        novel.tags.insert("Fiction".to_string());
        novel.favorites = 30;
        novel.created_at = lamp.created_at - Duration::hours(1);

        let mut sofa = fixtures::listing(&seller, "Green Sofa", 25000);
        sofa.category = "Furniture".to_string();
        sofa.created_at = lamp.created_at + Duration::hours(1);

        let mut sold = fixtures::listing(&seller, "Sold Lamp", 1000);
        sold.status = ListingStatus::Sold;

        vec![lamp, novel, sofa, sold]
    }

    #[test]
    fn test_default_query_shows_active_newest_first() {
        let listings = sample();
        let result = browse(&listings, &BrowseQuery::default());
        assert_eq!(titles(&result), vec!["Green Sofa", "Brass Lamp", "Paperback Novel"]);
    }

    #[test]
    fn test_text_matches_title_description_and_tags() {
        let listings = sample();
        let query = BrowseQuery {
            text: Some("LAMP".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&browse(&listings, &query)), vec!["Brass Lamp"]);

        let query = BrowseQuery {
            text: Some("fict".to_string()),
            ..Default::default()
        };
        assert_eq!(titles(&browse(&listings, &query)), vec!["Paperback Novel"]);

        let query = BrowseQuery {
            text: Some("good shape".to_string()),
            status: StatusFilter::All,
            ..Default::default()
        };
        assert_eq!(browse(&listings, &query).len(), 4);
    }

    #[test]
    fn test_filters_compose() {
        let listings = sample();
        let query = BrowseQuery {
            category: Some("Furniture".to_string()),
            max_price: Some(Cents::new(3500)),
            ..Default::default()
        };
        assert_eq!(titles(&browse(&listings, &query)), vec!["Brass Lamp"]);

        let query = BrowseQuery {
            condition: Some(Condition::Good),
            min_price: Some(Cents::new(800)),
            max_price: Some(Cents::new(800)),
            ..Default::default()
        };
        assert_eq!(titles(&browse(&listings, &query)), vec!["Paperback Novel"]);
    }

    #[test]
    fn test_sort_orders() {
        let listings = sample();
        let by = |sort| browse(&listings, &BrowseQuery { sort, ..Default::default() });

        assert_eq!(
            titles(&by(SortOrder::PriceLowToHigh)),
            vec!["Paperback Novel", "Brass Lamp", "Green Sofa"]
        );
        assert_eq!(
            titles(&by(SortOrder::PriceHighToLow)),
            vec!["Green Sofa", "Brass Lamp", "Paperback Novel"]
        );
        assert_eq!(
            titles(&by(SortOrder::Popularity)),
            vec!["Paperback Novel", "Brass Lamp", "Green Sofa"]
        );
    }

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!("price-low".parse::<SortOrder>().unwrap(), SortOrder::PriceLowToHigh);
        assert_eq!("popular".parse::<SortOrder>().unwrap(), SortOrder::Popularity);
        assert!("cheapest".parse::<SortOrder>().is_err());
    }
}
