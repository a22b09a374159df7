//! Listing type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

use crate::account::AccountId;
use crate::error::MarketError;
use crate::money::Cents;

pub type ListingId = Uuid;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    Draft,
}

impl FromStr for ListingStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" => Ok(ListingStatus::Sold),
            "draft" => Ok(ListingStatus::Draft),
            other => Err(MarketError::validation(format!("Unknown listing status: {}", other))),
        }
    }
}

/// Status filter for listing queries. `all` disables filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(ListingStatus),
}

impl StatusFilter {
    pub fn matches(self, status: ListingStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        StatusFilter::Only(ListingStatus::Active)
    }
}

impl FromStr for StatusFilter {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// Physical condition of a second-hand item
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::New,
        Condition::LikeNew,
        Condition::Excellent,
        Condition::Good,
        Condition::Fair,
        Condition::Poor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Condition::New => "New",
            Condition::LikeNew => "Like New",
            Condition::Excellent => "Excellent",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
        }
    }
}

impl FromStr for Condition {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| MarketError::validation(format!("Unknown condition: {}", s)))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: Cents,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Cents>,
    pub category: String,
    pub condition: Condition,
    pub images: Vec<String>,

    // Owner, with name/avatar as they were when the listing was created
    pub seller_id: AccountId,
    pub seller_name: String,
    pub seller_avatar: String,

    pub status: ListingStatus,
    pub views: u64,
    pub favorites: u64,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of a create request. Everything optional so that missing fields
/// surface as validation errors rather than parse failures.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    pub original_price: Option<Cents>,
    pub category: Option<String>,
    pub condition: Option<Condition>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Cents>,
    /// Absent keeps the current value, `null` clears it.
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_price: Option<Option<Cents>>,
    pub category: Option<String>,
    pub condition: Option<Condition>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
}

impl Listing {
    pub fn popularity(&self) -> u64 {
        self.views.saturating_add(self.favorites)
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if self.title.trim().is_empty() {
            return Err(MarketError::validation("Title is required"));
        }
        if self.description.trim().is_empty() {
            return Err(MarketError::validation("Description is required"));
        }
        if !self.price.is_positive() {
            return Err(MarketError::validation("Price must be greater than zero"));
        }
        if let Some(original) = self.original_price {
            if original <= self.price {
                return Err(MarketError::validation(
                    "Original price must be greater than price",
                ));
            }
        }
        if self.category.trim().is_empty() {
            return Err(MarketError::validation("Category is required"));
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: &ListingPatch) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(original) = patch.original_price {
            self.original_price = original;
        }
        if let Some(category) = &patch.category {
            self.category = category.trim().to_string();
        }
        if let Some(condition) = patch.condition {
            self.condition = condition;
        }
        if let Some(images) = &patch.images {
            self.images = images.clone();
        }
        if let Some(tags) = &patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Only called when the key is present, so `null` arrives as `Some(None)`.
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub(crate) fn normalize_tags(tags: &[String]) -> BTreeSet<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
