// Client-side cart container mirroring the server cart
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::types::{CartItem, CartSnapshot};
use crate::catalog::{Listing, ListingId};
use crate::error::{MarketError, MarketResult};
use crate::money::Cents;

/// Remote side of the cart. Every call answers with the full server cart.
#[async_trait]
pub trait CartBackend: Send + Sync {
    async fn fetch(&self) -> MarketResult<CartSnapshot>;
    async fn add(&self, listing_id: ListingId, quantity: u32) -> MarketResult<CartSnapshot>;
    async fn update(&self, listing_id: ListingId, quantity: i64) -> MarketResult<CartSnapshot>;
    async fn remove(&self, listing_id: ListingId) -> MarketResult<CartSnapshot>;
}

/// Talks to the `/cart` endpoints of a running server.
pub struct HttpCartBackend {
    base_url: String,
    token: String,
    client: Client,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpCartBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client: Client::new(),
        }
    }

    fn cart_url(&self) -> String {
        format!("{}/cart", self.base_url)
    }

    /// Look up a listing, e.g. to have product data for an optimistic add.
    pub async fn listing(&self, listing_id: ListingId) -> MarketResult<Listing> {
        #[derive(Deserialize)]
        struct ProductBody {
            product: Listing,
        }

        let request = self
            .client
            .get(format!("{}/listings/{}", self.base_url, listing_id));
        Ok(self.send::<ProductBody>(request).await?.product)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> MarketResult<T> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| MarketError::Integration(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(MarketError::Integration(format!("Server answered {}: {}", status.as_u16(), message)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MarketError::Integration(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl CartBackend for HttpCartBackend {
    async fn fetch(&self) -> MarketResult<CartSnapshot> {
        self.send(self.client.get(self.cart_url())).await
    }

    async fn add(&self, listing_id: ListingId, quantity: u32) -> MarketResult<CartSnapshot> {
        let body = json!({ "productId": listing_id, "quantity": quantity });
        self.send(self.client.post(self.cart_url()).json(&body)).await
    }

    async fn update(&self, listing_id: ListingId, quantity: i64) -> MarketResult<CartSnapshot> {
        let body = json!({ "productId": listing_id, "quantity": quantity });
        self.send(self.client.put(self.cart_url()).json(&body)).await
    }

    async fn remove(&self, listing_id: ListingId) -> MarketResult<CartSnapshot> {
        let request = self
            .client
            .delete(self.cart_url())
            .query(&[("productId", listing_id.to_string())]);
        self.send(request).await
    }
}

/// Whether the last mutation reached the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    /// Local copy holds an optimistic change the server has not confirmed
    Diverged,
}

/// Local mirror of the caller's cart.
///
/// Mutations are applied to the local copy first and then sent to the
/// backend. A successful answer replaces the local copy; a failed one leaves
/// the optimistic change in place until the next [`LocalCart::refresh`],
/// which always overwrites local state with the server's.
pub struct LocalCart<B: CartBackend> {
    backend: B,
    items: Vec<CartItem>,
    diverged: bool,
}

impl<B: CartBackend> LocalCart<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            items: Vec::new(),
            diverged: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_diverged(&self) -> bool {
        self.diverged
    }

    pub fn total_price(&self) -> Cents {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Authoritative refresh. On failure the local copy is left as it was.
    pub async fn refresh(&mut self) -> MarketResult<()> {
        let snapshot = self.backend.fetch().await?;
        self.items = snapshot.items;
        self.diverged = false;
        Ok(())
    }

    pub async fn add(&mut self, product: Listing, quantity: u32) -> MarketResult<SyncState> {
        if quantity == 0 {
            return Err(MarketError::validation("Quantity must be at least 1"));
        }
        let listing_id = product.id;

        match self.items.iter_mut().find(|item| item.product.id == listing_id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                id: pending_key(&listing_id),
                product,
                quantity,
            }),
        }

        let result = self.backend.add(listing_id, quantity).await;
        Ok(self.settle("add", result))
    }

    pub async fn update_quantity(&mut self, listing_id: ListingId, quantity: i64) -> SyncState {
        if quantity <= 0 {
            self.items.retain(|item| item.product.id != listing_id);
        } else if let Some(item) = self.items.iter_mut().find(|item| item.product.id == listing_id) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }

        let result = self.backend.update(listing_id, quantity).await;
        self.settle("update", result)
    }

    pub async fn remove(&mut self, listing_id: ListingId) -> SyncState {
        self.items.retain(|item| item.product.id != listing_id);
        let result = self.backend.remove(listing_id).await;
        self.settle("remove", result)
    }

    /// Remove every line one by one. Local state ends up empty either way;
    /// lines the server kept come back on the next refresh.
    pub async fn clear(&mut self) -> SyncState {
        let listing_ids: Vec<ListingId> = self.items.iter().map(|item| item.product.id).collect();
        self.items.clear();

        let mut failed = 0usize;
        for listing_id in listing_ids {
            if let Err(e) = self.backend.remove(listing_id).await {
                warn!(listing = %listing_id, "Failed to remove cart line: {}", e);
                failed += 1;
            }
        }

        if failed == 0 {
            self.diverged = false;
            SyncState::Synced
        } else {
            self.diverged = true;
            SyncState::Diverged
        }
    }

    fn settle(&mut self, op: &str, result: MarketResult<CartSnapshot>) -> SyncState {
        match result {
            Ok(snapshot) => {
                debug!(op, items = snapshot.items.len(), "Cart synced");
                self.items = snapshot.items;
                self.diverged = false;
                SyncState::Synced
            }
            Err(e) => {
                warn!(op, "Cart sync failed, keeping local state: {}", e);
                self.diverged = true;
                SyncState::Diverged
            }
        }
    }
}

/// Placeholder id for a line the server has not confirmed yet.
fn pending_key(listing_id: &ListingId) -> String {
    format!("pending::{}", listing_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Identity;
    use crate::cart::{CartLine, CartService};
    use crate::storage::{fixtures, EntityStore};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Backend over an in-process cart service that can be switched off.
    struct FlakyBackend {
        carts: CartService,
        identity: Identity,
        offline: AtomicBool,
    }

    impl FlakyBackend {
        fn check(&self) -> MarketResult<()> {
            if self.offline.load(Ordering::SeqCst) {
                Err(MarketError::Integration("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CartBackend for FlakyBackend {
        async fn fetch(&self) -> MarketResult<CartSnapshot> {
            self.check()?;
            self.carts.snapshot(&self.identity)
        }

        async fn add(&self, listing_id: ListingId, quantity: u32) -> MarketResult<CartSnapshot> {
            self.check()?;
            self.carts.add(&self.identity, listing_id, quantity)
        }

        async fn update(&self, listing_id: ListingId, quantity: i64) -> MarketResult<CartSnapshot> {
            self.check()?;
            self.carts.update_quantity(&self.identity, listing_id, quantity)
        }

        async fn remove(&self, listing_id: ListingId) -> MarketResult<CartSnapshot> {
            self.check()?;
            self.carts.remove(&self.identity, listing_id)
        }
    }

    fn setup() -> (LocalCart<FlakyBackend>, Listing, Listing) {
        let store = EntityStore::new().shared();
        let seller = fixtures::account("seller@example.com");
        let buyer = fixtures::account("buyer@example.com");
        let lamp = fixtures::listing(&seller, "Lamp", 2000);
        let rug = fixtures::listing(&seller, "Rug", 3000);
        {
            let mut s = store.lock().unwrap();
            s.insert_listing(lamp.clone());
            s.insert_listing(rug.clone());
        }
        let backend = FlakyBackend {
            carts: CartService::new(store),
            identity: buyer.identity(),
            offline: AtomicBool::new(false),
        };
        (LocalCart::new(backend), lamp, rug)
    }

    #[tokio::test]
    async fn test_online_mutations_adopt_server_state() {
        let (mut cart, lamp, rug) = setup();

        assert_eq!(cart.add(lamp.clone(), 1).await.unwrap(), SyncState::Synced);
        assert_eq!(cart.add(lamp.clone(), 2).await.unwrap(), SyncState::Synced);
        cart.add(rug.clone(), 1).await.unwrap();

        assert_eq!(cart.total_items(), 4);
        assert_eq!(cart.total_price(), Cents::new(3 * 2000 + 3000));
        let buyer = cart.backend.identity.account_id;
        let line = cart.items().iter().find(|i| i.product.id == lamp.id).unwrap();
        assert_eq!(line.id, CartLine::key(&buyer, &lamp.id));

        assert_eq!(cart.update_quantity(lamp.id, 0).await, SyncState::Synced);
        assert_eq!(cart.items().len(), 1);
        assert!(!cart.is_diverged());
    }

    #[tokio::test]
    async fn test_offline_mutations_stay_usable_then_converge() {
        let (mut cart, lamp, rug) = setup();
        cart.add(lamp.clone(), 1).await.unwrap();

        cart.backend.offline.store(true, Ordering::SeqCst);
        assert_eq!(cart.add(rug.clone(), 2).await.unwrap(), SyncState::Diverged);
        assert_eq!(cart.update_quantity(lamp.id, 5).await, SyncState::Diverged);
        assert!(cart.is_diverged());
        assert_eq!(cart.total_items(), 7);
        assert_eq!(cart.total_price(), Cents::new(5 * 2000 + 2 * 3000));

        // refresh fails while offline and leaves local state alone
        assert!(cart.refresh().await.is_err());
        assert_eq!(cart.total_items(), 7);

        cart.backend.offline.store(false, Ordering::SeqCst);
        cart.refresh().await.unwrap();
        assert!(!cart.is_diverged());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id, lamp.id);
        assert_eq!(cart.total_items(), 1);
    }

    #[tokio::test]
    async fn test_offline_remove_filters_locally() {
        let (mut cart, lamp, rug) = setup();
        cart.add(lamp.clone(), 1).await.unwrap();
        cart.add(rug.clone(), 1).await.unwrap();

        cart.backend.offline.store(true, Ordering::SeqCst);
        assert_eq!(cart.remove(rug.id).await, SyncState::Diverged);
        assert_eq!(cart.items().len(), 1);

        cart.backend.offline.store(false, Ordering::SeqCst);
        cart.refresh().await.unwrap();
        assert_eq!(cart.items().len(), 2);
    }

    #[tokio::test]
    async fn test_clear_empties_local_state_even_when_offline() {
        let (mut cart, lamp, rug) = setup();
        cart.add(lamp.clone(), 1).await.unwrap();
        cart.add(rug.clone(), 3).await.unwrap();

        cart.backend.offline.store(true, Ordering::SeqCst);
        assert_eq!(cart.clear().await, SyncState::Diverged);
        assert!(cart.items().is_empty());

        cart.backend.offline.store(false, Ordering::SeqCst);
        cart.refresh().await.unwrap();
        assert_eq!(cart.total_items(), 4);

        assert_eq!(cart.clear().await, SyncState::Synced);
        cart.refresh().await.unwrap();
        assert!(cart.items().is_empty());
    }

    #[tokio::test]
    async fn test_add_zero_is_rejected_locally() {
        let (mut cart, lamp, _) = setup();
        assert!(matches!(cart.add(lamp, 0).await, Err(MarketError::Validation(_))));
        assert!(cart.items().is_empty());
        assert!(!cart.is_diverged());
    }
}
