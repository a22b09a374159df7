//! In-process entity store.
//!
//! Plain maps keyed by generated ids (accounts, listings, orders) or by the
//! composite `accountId::listingId` key (cart lines). Every operation is
//! atomic for a single entity only; nothing spans entities. Contents live as
//! long as the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::account::{Account, AccountId, AccountPatch};
use crate::cart::CartLine;
use crate::catalog::{Listing, ListingId};
use crate::checkout::{Order, OrderId};
use crate::error::MarketError;

/// Store shared between request handlers.
pub type SharedStore = Arc<Mutex<EntityStore>>;

#[derive(Default)]
pub struct EntityStore {
    accounts: HashMap<AccountId, Account>,
    listings: HashMap<ListingId, Listing>,
    cart_lines: HashMap<String, CartLine>,
    orders: HashMap<OrderId, Order>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // --- Accounts ---

    /// Insert a new account. Fails with `Conflict` if the email is taken.
    pub fn create_account(&mut self, account: Account) -> Result<(), MarketError> {
        if self.account_by_email(&account.email).is_some() {
            return Err(MarketError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }
        if self.accounts.contains_key(&account.id) {
            return Err(MarketError::Conflict(format!("Account {} already exists", account.id)));
        }
        self.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn account(&self, id: &AccountId) -> Option<&Account> {
        self.accounts.get(id)
    }

    /// Emails are compared trimmed and ASCII case-insensitively.
    pub fn account_by_email(&self, email: &str) -> Option<&Account> {
        let email = email.trim();
        self.accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Returns false if the account does not exist.
    pub fn update_account(&mut self, id: &AccountId, patch: &AccountPatch) -> bool {
        match self.accounts.get_mut(id) {
            Some(account) => {
                account.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn delete_account(&mut self, id: &AccountId) -> bool {
        self.accounts.remove(id).is_some()
    }

    // --- Listings ---

    pub fn insert_listing(&mut self, listing: Listing) {
        self.listings.insert(listing.id, listing);
    }

    pub fn listing(&self, id: &ListingId) -> Option<&Listing> {
        self.listings.get(id)
    }

    pub fn listings(&self) -> impl Iterator<Item = &Listing> {
        self.listings.values()
    }

    /// Replace a stored listing with an already-merged version.
    /// Returns false if there was nothing to replace.
    pub fn replace_listing(&mut self, listing: Listing) -> bool {
        match self.listings.get_mut(&listing.id) {
            Some(slot) => {
                *slot = listing;
                true
            }
            None => false,
        }
    }

    /// Mutate a listing in place. Returns false if it does not exist.
    pub fn modify_listing<F>(&mut self, id: &ListingId, f: F) -> bool
    where
        F: FnOnce(&mut Listing),
    {
        match self.listings.get_mut(id) {
            Some(listing) => {
                f(listing);
                true
            }
            None => false,
        }
    }

    /// Idempotent. Cart lines pointing at the listing are left alone and
    /// filtered out when carts are read.
    pub fn delete_listing(&mut self, id: &ListingId) -> bool {
        self.listings.remove(id).is_some()
    }

    // --- Cart lines ---

    pub fn cart_line(&self, account_id: &AccountId, listing_id: &ListingId) -> Option<&CartLine> {
        self.cart_lines.get(&CartLine::key(account_id, listing_id))
    }

    pub fn put_cart_line(&mut self, line: CartLine) {
        self.cart_lines.insert(line.id(), line);
    }

    pub fn cart_lines_for<'a>(&'a self, account_id: &'a AccountId) -> impl Iterator<Item = &'a CartLine> + 'a {
        self.cart_lines
            .values()
            .filter(move |line| &line.account_id == account_id)
    }

    pub fn delete_cart_line(&mut self, account_id: &AccountId, listing_id: &ListingId) -> bool {
        self.cart_lines
            .remove(&CartLine::key(account_id, listing_id))
            .is_some()
    }

    // --- Orders ---

    pub fn insert_order(&mut self, order: Order) {
        self.orders.insert(order.id, order);
    }

    pub fn order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn orders_for<'a>(&'a self, account_id: &'a AccountId) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders
            .values()
            .filter(move |order| &order.account_id == account_id)
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn listing_count(&self) -> usize {
        self.listings.len()
    }
}

/// Lock the shared store, turning a poisoned mutex into an internal error.
pub fn lock_store(store: &SharedStore) -> Result<MutexGuard<'_, EntityStore>, MarketError> {
    store.lock().map_err(|e| {
        tracing::error!("Store mutex poisoned: {}", e);
        MarketError::Internal("store mutex poisoned".to_string())
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::catalog::{Condition, ListingStatus};
    use crate::money::Cents;
    use chrono::Utc;
    use uuid::Uuid;

    pub fn account(email: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
            avatar: "/placeholder.svg".to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn listing(seller: &Account, title: &str, price_cents: i64) -> Listing {
        Listing {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: format!("{} in good shape", title),
            price: Cents::new(price_cents),
            original_price: None,
            category: "Books".to_string(),
            condition: Condition::Good,
            images: vec![],
            seller_id: seller.id,
            seller_name: seller.name.clone(),
            seller_avatar: seller.avatar.clone(),
            status: ListingStatus::Active,
            views: 0,
            favorites: 0,
            tags: Default::default(),
            created_at: Utc::now(),
        }
    }
}
