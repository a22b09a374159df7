// Request bodies and query strings for the REST endpoints
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use uuid::Uuid;

use crate::catalog::{BrowseQuery, StatusFilter};
use crate::error::{MarketError, MarketResult};
use crate::money::Cents;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartRequest {
    pub product_id: Option<Uuid>,
    pub quantity: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CartItemQuery {
    pub product_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct FavoriteRequest {
    pub favorited: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct StatusQuery {
    pub status: Option<String>,
}

/// Query string of `GET /listings`.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub status: Option<String>,
    pub seller_id: Option<String>,
}

/// Empty query values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_price(value: &str) -> MarketResult<Cents> {
    let decimal = Decimal::from_str(value)
        .map_err(|_| MarketError::validation(format!("Invalid price: {}", value)))?;
    Cents::from_decimal(decimal)
}

pub fn parse_status(value: &Option<String>) -> MarketResult<StatusFilter> {
    present(value).map_or(Ok(StatusFilter::default()), str::parse)
}

/// Ids that do not parse cannot name anything that exists.
pub fn parse_id(value: &str, what: &str) -> MarketResult<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| MarketError::not_found(what))
}

impl ListingsQuery {
    pub fn seller(&self) -> MarketResult<Option<Uuid>> {
        present(&self.seller_id)
            .map(|id| parse_id(id, "User"))
            .transpose()
    }

    pub fn to_browse(&self) -> MarketResult<BrowseQuery> {
        Ok(BrowseQuery {
            text: present(&self.q).map(str::to_string),
            category: present(&self.category).map(str::to_string),
            condition: present(&self.condition).map(str::parse).transpose()?,
            min_price: present(&self.min_price).map(parse_price).transpose()?,
            max_price: present(&self.max_price).map(parse_price).transpose()?,
            status: parse_status(&self.status)?,
            sort: present(&self.sort).map(str::parse).transpose()?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Condition, ListingStatus, SortOrder};

    #[test]
    fn test_listings_query_parsing() {
        let query = ListingsQuery {
            q: Some("  lamp ".to_string()),
            category: Some(String::new()),
            condition: Some("like new".to_string()),
            min_price: Some("10".to_string()),
            max_price: Some("25.5".to_string()),
            sort: Some("price-high".to_string()),
            status: Some("all".to_string()),
            seller_id: None,
        };
        let browse = query.to_browse().unwrap();
        assert_eq!(browse.text.as_deref(), Some("lamp"));
        assert_eq!(browse.category, None);
        assert_eq!(browse.condition, Some(Condition::LikeNew));
        assert_eq!(browse.min_price, Some(Cents::new(1000)));
        assert_eq!(browse.max_price, Some(Cents::new(2550)));
        assert_eq!(browse.sort, SortOrder::PriceHighToLow);
        assert_eq!(browse.status, StatusFilter::All);
        assert_eq!(query.seller().unwrap(), None);
    }

    #[test]
    fn test_defaults_and_bad_values() {
        let browse = ListingsQuery::default().to_browse().unwrap();
        assert_eq!(browse.status, StatusFilter::Only(ListingStatus::Active));
        assert_eq!(browse.sort, SortOrder::Newest);

        let bad_price = ListingsQuery {
            min_price: Some("cheap".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_price.to_browse(), Err(MarketError::Validation(_))));

        let bad_seller = ListingsQuery {
            seller_id: Some("nobody".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad_seller.seller(), Err(MarketError::NotFound(_))));
    }
}
