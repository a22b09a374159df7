//! Checkout pipeline
//!
//! Turns the caller's cart into a confirmed order:
//! 1. Snapshot the cart (must not be empty)
//! 2. Validate shipping, price the snapshot once
//! 3. Settle payment (card/paypal are simulated, crypto goes through the wallet)
//! 4. Store the order and take the ordered lines out of the cart
//!
//! Any failure before step 4 leaves no order behind. One checkout per
//! account runs at a time.

pub mod pricing;
pub mod types;
pub mod wallet;

pub use pricing::{quote, PriceBreakdown};
pub use types::{
    CheckoutRequest, Order, OrderId, OrderStatus, PaymentRecord, PaymentSelection, ShippingAddress,
    ShippingForm,
};
pub use wallet::{SimulatedAccount, SimulatedWallet, UnavailableWallet, WalletError, WalletProvider};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::{AccountId, Identity};
use crate::cart::{self, CartService};
use crate::error::{MarketError, MarketResult};
use crate::storage::{lock_store, SharedStore};

pub const DELIVERY_DAYS: i64 = 7;

/// Crypto settlement parameters.
#[derive(Clone, Debug)]
pub struct CheckoutSettings {
    pub asset: String,
    /// USD per unit of `asset`
    pub usd_per_unit: Decimal,
    pub merchant_address: String,
}

/// Live price of the caller's cart.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    #[serde(flatten)]
    pub pricing: PriceBreakdown,
    pub total_items: u64,
    pub asset: String,
    pub asset_amount: Decimal,
}

pub struct CheckoutPipeline {
    store: SharedStore,
    wallet: Arc<dyn WalletProvider>,
    settings: CheckoutSettings,
    in_flight: Mutex<HashSet<AccountId>>,
}

/// Marks an account's checkout as running until dropped.
struct InFlight<'a> {
    accounts: &'a Mutex<HashSet<AccountId>>,
    account_id: AccountId,
}

impl<'a> InFlight<'a> {
    fn begin(accounts: &'a Mutex<HashSet<AccountId>>, account_id: AccountId) -> MarketResult<Self> {
        let mut running = accounts
            .lock()
            .map_err(|_| MarketError::Internal("checkout lock poisoned".to_string()))?;
        if !running.insert(account_id) {
            return Err(MarketError::Conflict(
                "A checkout is already in progress".to_string(),
            ));
        }
        Ok(Self {
            accounts,
            account_id,
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.account_id);
    }
}

impl CheckoutPipeline {
    pub fn new(store: SharedStore, wallet: Arc<dyn WalletProvider>, settings: CheckoutSettings) -> Self {
        Self {
            store,
            wallet,
            settings,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn quote(&self, identity: &Identity) -> MarketResult<CheckoutQuote> {
        let snapshot = CartService::snapshot_of(&*lock_store(&self.store)?, identity);
        let pricing = pricing::quote(snapshot.total_price());
        Ok(CheckoutQuote {
            pricing,
            total_items: snapshot.total_items(),
            asset: self.settings.asset.clone(),
            asset_amount: pricing::to_asset_amount(pricing.total, self.settings.usd_per_unit)?,
        })
    }

    pub async fn submit(&self, identity: &Identity, request: CheckoutRequest) -> MarketResult<Order> {
        let _running = InFlight::begin(&self.in_flight, identity.account_id)?;
        let snapshot = CartService::snapshot_of(&*lock_store(&self.store)?, identity);
        if snapshot.is_empty() {
            return Err(MarketError::EmptyCart);
        }

        let shipping_address = request.shipping.validate()?;
        let pricing = pricing::quote(snapshot.total_price());
        let payment = self.settle(identity, &request.payment, &pricing).await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            account_id: identity.account_id,
            items: snapshot.items,
            pricing,
            total: pricing.total,
            status: OrderStatus::Confirmed,
            created_at: now,
            estimated_delivery: now + Duration::days(DELIVERY_DAYS),
            shipping_address,
            payment,
        };

        // The lock was released across payment; only what was ordered leaves the cart.
        let mut store = lock_store(&self.store)?;
        store.insert_order(order.clone());
        let cleared = cart::release_ordered(&mut store, identity, &order.items);

        info!(
            order = %order.id,
            account = %identity.account_id,
            total = %order.total,
            lines = cleared,
            "Order confirmed"
        );
        Ok(order)
    }

    /// The caller's orders, newest first.
    pub fn orders(&self, identity: &Identity) -> MarketResult<Vec<Order>> {
        let mut orders: Vec<Order> = lock_store(&self.store)?
            .orders_for(&identity.account_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Another account's order is reported as missing.
    pub fn order(&self, identity: &Identity, id: &OrderId) -> MarketResult<Order> {
        lock_store(&self.store)?
            .order(id)
            .filter(|order| order.account_id == identity.account_id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("Order"))
    }

    async fn settle(
        &self,
        identity: &Identity,
        selection: &PaymentSelection,
        pricing: &PriceBreakdown,
    ) -> MarketResult<PaymentRecord> {
        match selection {
            PaymentSelection::Card {
                card_number,
                expiry_date,
                cvv,
                card_name,
            } => {
                let missing = || MarketError::validation("Please fill in all payment information");
                let number = filled(card_number).ok_or_else(missing)?;
                filled(expiry_date).ok_or_else(missing)?;
                filled(cvv).ok_or_else(missing)?;
                filled(card_name).ok_or_else(missing)?;

                let digits: String = number.chars().filter(char::is_ascii_digit).collect();
                if digits.len() < 4 {
                    return Err(MarketError::validation("Card number is invalid"));
                }
                Ok(PaymentRecord::Card {
                    last4: digits[digits.len() - 4..].to_string(),
                })
            }
            PaymentSelection::Paypal => Ok(PaymentRecord::Paypal),
            PaymentSelection::Crypto { wallet_address } => {
                self.settle_crypto(identity, wallet_address.as_deref(), pricing).await
            }
        }
    }

    async fn settle_crypto(
        &self,
        identity: &Identity,
        requested: Option<&str>,
        pricing: &PriceBreakdown,
    ) -> MarketResult<PaymentRecord> {
        let accounts = self.wallet.get_accounts().await?;
        let address = match requested.map(str::trim).filter(|a| !a.is_empty()) {
            Some(wanted) => accounts
                .into_iter()
                .find(|a| a.eq_ignore_ascii_case(wanted))
                .ok_or_else(|| WalletError::UnknownAccount(wanted.to_string()))?,
            None => accounts.into_iter().next().ok_or(WalletError::NoAccounts)?,
        };

        let amount = pricing::to_asset_amount(pricing.total, self.settings.usd_per_unit)?;
        let balance = self.wallet.get_balance(&address).await?;
        if balance < amount {
            warn!(account = %identity.account_id, %amount, %balance, "Wallet balance too low");
            return Err(MarketError::InsufficientBalance {
                required: amount,
                available: balance,
            });
        }

        let tx_hash = self
            .wallet
            .send_value(&address, &self.settings.merchant_address, amount)
            .await?;

        Ok(PaymentRecord::Crypto {
            wallet_address: address,
            transaction_hash: tx_hash,
            asset: self.settings.asset.clone(),
            asset_amount: amount,
        })
    }
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
