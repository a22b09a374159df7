//! Per-account shopping carts
//!
//! Server-side lines live in the entity store; [`client::LocalCart`] is the
//! client-side mirror that keeps working when the server does not answer.

pub mod client;
pub mod types;

pub use client::{CartBackend, HttpCartBackend, LocalCart, SyncState};
pub use types::{CartItem, CartLine, CartSnapshot};

use chrono::Utc;
use tracing::debug;

use crate::account::Identity;
use crate::catalog::ListingId;
use crate::error::{MarketError, MarketResult};
use crate::storage::{lock_store, EntityStore, SharedStore};

/// Cart operations scoped to the calling identity. Nothing here can reach
/// another account's lines.
pub struct CartService {
    store: SharedStore,
}

impl CartService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Add `quantity` of a listing, merging into an existing line.
    pub fn add(&self, identity: &Identity, listing_id: ListingId, quantity: u32) -> MarketResult<CartSnapshot> {
        if quantity == 0 {
            return Err(MarketError::validation("Quantity must be at least 1"));
        }

        let mut store = lock_store(&self.store)?;
        if store.listing(&listing_id).is_none() {
            return Err(MarketError::not_found("Product"));
        }

        let account_id = identity.account_id;
        let line = match store.cart_line(&account_id, &listing_id) {
            Some(existing) => {
                let mut line = existing.clone();
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| MarketError::validation("Quantity is too large"))?;
                line
            }
            None => CartLine {
                account_id,
                listing_id,
                quantity,
                added_at: Utc::now(),
            },
        };
        debug!(account = %account_id, listing = %listing_id, quantity = line.quantity, "Cart line set");
        store.put_cart_line(line);

        Ok(Self::snapshot_of(&store, identity))
    }

    /// Set the quantity exactly. Zero or less removes the line; a missing
    /// line is left missing.
    pub fn update_quantity(&self, identity: &Identity, listing_id: ListingId, quantity: i64) -> MarketResult<CartSnapshot> {
        if quantity <= 0 {
            return self.remove(identity, listing_id);
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| MarketError::validation("Quantity is too large"))?;

        let mut store = lock_store(&self.store)?;
        let updated = store
            .cart_line(&identity.account_id, &listing_id)
            .cloned()
            .map(|line| CartLine { quantity, ..line });
        if let Some(line) = updated {
            store.put_cart_line(line);
        }

        Ok(Self::snapshot_of(&store, identity))
    }

    pub fn remove(&self, identity: &Identity, listing_id: ListingId) -> MarketResult<CartSnapshot> {
        let mut store = lock_store(&self.store)?;
        store.delete_cart_line(&identity.account_id, &listing_id);
        Ok(Self::snapshot_of(&store, identity))
    }

    pub fn snapshot(&self, identity: &Identity) -> MarketResult<CartSnapshot> {
        let store = lock_store(&self.store)?;
        Ok(Self::snapshot_of(&store, identity))
    }

    /// Remove every line. Returns how many lines were removed.
    pub fn clear(&self, identity: &Identity) -> MarketResult<usize> {
        let mut store = lock_store(&self.store)?;
        Ok(clear_lines(&mut store, identity))
    }

    /// Join lines with live listings, dropping lines whose listing is gone.
    pub(crate) fn snapshot_of(store: &EntityStore, identity: &Identity) -> CartSnapshot {
        let mut lines: Vec<&CartLine> = store.cart_lines_for(&identity.account_id).collect();
        lines.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.listing_id.cmp(&b.listing_id))
        });

        let items = lines
            .into_iter()
            .filter_map(|line| {
                store.listing(&line.listing_id).map(|listing| CartItem {
                    id: line.id(),
                    product: listing.clone(),
                    quantity: line.quantity,
                })
            })
            .collect();

        CartSnapshot { items }
    }
}

fn clear_lines(store: &mut EntityStore, identity: &Identity) -> usize {
    let listing_ids: Vec<ListingId> = store
        .cart_lines_for(&identity.account_id)
        .map(|line| line.listing_id)
        .collect();

    listing_ids
        .iter()
        .filter(|listing_id| store.delete_cart_line(&identity.account_id, listing_id))
        .count()
}

/// Take what an order consumed out of the cart. Lines added or raised after
/// `ordered` was snapshotted keep their surplus.
pub(crate) fn release_ordered(store: &mut EntityStore, identity: &Identity, ordered: &[CartItem]) -> usize {
    let account_id = identity.account_id;
    let mut released = 0;
    for item in ordered {
        let Some(line) = store.cart_line(&account_id, &item.product.id).cloned() else {
            continue;
        };
        match line.quantity.checked_sub(item.quantity).filter(|left| *left > 0) {
            Some(left) => store.put_cart_line(CartLine { quantity: left, ..line }),
            None => {
                store.delete_cart_line(&account_id, &item.product.id);
            }
        }
        released += 1;
    }
    released
}
