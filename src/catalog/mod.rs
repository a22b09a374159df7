//! Listing catalog: CRUD over listings plus the browse read-path.
//!
//! Ownership is not enforced by the plain `update`/`delete` operations; the
//! `*_owned` variants layer the owner check on top for request handlers.

pub mod browse;
pub mod types;

pub use browse::{BrowseQuery, SortOrder};
pub use types::{Condition, Listing, ListingId, ListingPatch, ListingStatus, NewListing, StatusFilter};

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::account::{AccountId, Identity};
use crate::error::{MarketError, MarketResult};
use crate::storage::{lock_store, EntityStore, SharedStore};

pub struct Catalog {
    store: SharedStore,
}

impl Catalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn list_all(&self) -> MarketResult<Vec<Listing>> {
        Ok(lock_store(&self.store)?.listings().cloned().collect())
    }

    pub fn list_by_owner(&self, owner: &AccountId, status: StatusFilter) -> MarketResult<Vec<Listing>> {
        Ok(lock_store(&self.store)?
            .listings()
            .filter(|l| &l.seller_id == owner && status.matches(l.status))
            .cloned()
            .collect())
    }

    pub fn get(&self, id: &ListingId) -> MarketResult<Listing> {
        lock_store(&self.store)?
            .listing(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("Product"))
    }

    pub fn browse(&self, query: &BrowseQuery) -> MarketResult<Vec<Listing>> {
        Ok(browse::browse(lock_store(&self.store)?.listings(), query))
    }

    /// Create a listing owned by `seller`, snapshotting the seller's current
    /// name and avatar onto it.
    pub fn create(&self, seller: &Identity, new: NewListing) -> MarketResult<Listing> {
        let mut store = lock_store(&self.store)?;
        let account = store
            .account(&seller.account_id)
            .ok_or_else(|| MarketError::not_found("User"))?;

        let listing = Listing {
            id: Uuid::new_v4(),
            title: new.title.unwrap_or_default().trim().to_string(),
            description: new.description.unwrap_or_default().trim().to_string(),
            price: new
                .price
                .ok_or_else(|| MarketError::validation("Title, description, and price are required"))?,
            original_price: new.original_price,
            category: new.category.unwrap_or_default().trim().to_string(),
            condition: new
                .condition
                .ok_or_else(|| MarketError::validation("Condition is required"))?,
            images: new.images.unwrap_or_default(),
            seller_id: account.id,
            seller_name: account.name.clone(),
            seller_avatar: account.avatar.clone(),
            status: new.status.unwrap_or(ListingStatus::Active),
            views: 0,
            favorites: 0,
            tags: types::normalize_tags(&new.tags.unwrap_or_default()),
            created_at: Utc::now(),
        };
        listing.validate()?;

        store.insert_listing(listing.clone());
        info!(listing = %listing.id, seller = %listing.seller_id, "Listing created");
        Ok(listing)
    }

    /// Merge `patch` into a listing. The merged result must still satisfy the
    /// price invariants.
    pub fn update(&self, id: &ListingId, patch: &ListingPatch) -> MarketResult<Listing> {
        let mut store = lock_store(&self.store)?;
        Self::merge(&mut store, id, patch)
    }

    pub fn update_owned(&self, identity: &Identity, id: &ListingId, patch: &ListingPatch) -> MarketResult<Listing> {
        let mut store = lock_store(&self.store)?;
        Self::ensure_owner(&store, identity, id)?;
        Self::merge(&mut store, id, patch)
    }

    pub fn delete(&self, id: &ListingId) -> MarketResult<()> {
        if lock_store(&self.store)?.delete_listing(id) {
            info!(listing = %id, "Listing deleted");
            Ok(())
        } else {
            Err(MarketError::not_found("Product"))
        }
    }

    pub fn delete_owned(&self, identity: &Identity, id: &ListingId) -> MarketResult<()> {
        let mut store = lock_store(&self.store)?;
        Self::ensure_owner(&store, identity, id)?;
        store.delete_listing(id);
        info!(listing = %id, "Listing deleted by owner");
        Ok(())
    }

    pub fn record_view(&self, id: &ListingId) -> MarketResult<Listing> {
        self.touch(id, |l| l.views = l.views.saturating_add(1))
    }

    /// Favorite counter goes up or down but never below zero.
    pub fn set_favorite(&self, id: &ListingId, favorited: bool) -> MarketResult<Listing> {
        self.touch(id, |l| {
            l.favorites = if favorited {
                l.favorites.saturating_add(1)
            } else {
                l.favorites.saturating_sub(1)
            }
        })
    }

    fn touch<F: FnOnce(&mut Listing)>(&self, id: &ListingId, f: F) -> MarketResult<Listing> {
        let mut store = lock_store(&self.store)?;
        if !store.modify_listing(id, f) {
            return Err(MarketError::not_found("Product"));
        }
        store
            .listing(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("Product"))
    }

    fn merge(store: &mut EntityStore, id: &ListingId, patch: &ListingPatch) -> MarketResult<Listing> {
        let mut listing = store
            .listing(id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("Product"))?;
        listing.apply(patch);
        listing.validate()?;

        if !store.replace_listing(listing.clone()) {
            return Err(MarketError::not_found("Product"));
        }
        Ok(listing)
    }

    fn ensure_owner(store: &EntityStore, identity: &Identity, id: &ListingId) -> MarketResult<()> {
        let listing = store
            .listing(id)
            .ok_or_else(|| MarketError::not_found("Product"))?;
        if listing.seller_id != identity.account_id {
            return Err(MarketError::Forbidden(
                "Only the seller can modify this listing".to_string(),
            ));
        }
        Ok(())
    }
}
