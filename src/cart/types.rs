use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::catalog::{Listing, ListingId};
use crate::money::Cents;

/// Stored association between an account and a listing it wants to buy.
/// A line with quantity 0 never exists; it is removed instead.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub account_id: AccountId,
    pub listing_id: ListingId,
    pub quantity: u32,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Composite store key: `accountId::listingId`
    pub fn key(account_id: &AccountId, listing_id: &ListingId) -> String {
        format!("{}::{}", account_id, listing_id)
    }

    pub fn id(&self) -> String {
        Self::key(&self.account_id, &self.listing_id)
    }
}

/// A cart line joined with the listing it points at.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CartItem {
    pub id: String,
    pub product: Listing,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Cents {
        self.product.price.saturating_mul(self.quantity)
    }
}

/// Point-in-time view of a cart, priced with live listing prices.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_price(&self) -> Cents {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
