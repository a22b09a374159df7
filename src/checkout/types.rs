//! Order and payment type definitions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::pricing::PriceBreakdown;
use crate::account::AccountId;
use crate::cart::CartItem;
use crate::error::MarketError;
use crate::money::Cents;

pub type OrderId = Uuid;

pub const DEFAULT_COUNTRY: &str = "US";

/// Orders are created confirmed and stay that way.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Confirmed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// Shipping form as submitted; validated into a [`ShippingAddress`].
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingForm {
    pub name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

impl ShippingForm {
    pub fn validate(&self) -> Result<ShippingAddress, MarketError> {
        let required = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| MarketError::validation("Please fill in all shipping information"))
        };

        Ok(ShippingAddress {
            name: required(&self.name)?,
            address: required(&self.address)?,
            city: required(&self.city)?,
            state: required(&self.state)?,
            zip_code: required(&self.zip_code)?,
            country: self
                .country
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_COUNTRY)
                .to_string(),
        })
    }
}

/// Payment method chosen at checkout.
#[derive(Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentSelection {
    #[serde(rename_all = "camelCase")]
    Card {
        card_number: Option<String>,
        expiry_date: Option<String>,
        cvv: Option<String>,
        card_name: Option<String>,
    },
    Paypal,
    #[serde(rename_all = "camelCase")]
    Crypto { wallet_address: Option<String> },
}

// Card details must never end up in logs.
impl fmt::Debug for PaymentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentSelection::Card { .. } => f.write_str("Card { .. }"),
            PaymentSelection::Paypal => f.write_str("Paypal"),
            PaymentSelection::Crypto { wallet_address } => f
                .debug_struct("Crypto")
                .field("wallet_address", wallet_address)
                .finish(),
        }
    }
}

/// What the order remembers about how it was paid.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PaymentRecord {
    Card {
        last4: String,
    },
    Paypal,
    #[serde(rename_all = "camelCase")]
    Crypto {
        wallet_address: String,
        transaction_hash: String,
        asset: String,
        /// Up to 18 places; a string keeps every digit.
        #[serde(with = "rust_decimal::serde::str")]
        asset_amount: Decimal,
    },
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct CheckoutRequest {
    pub shipping: ShippingForm,
    pub payment: PaymentSelection,
}

/// Immutable record of a completed checkout. Items are copied by value, so
/// later edits or deletions of the listings do not touch it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub account_id: AccountId,
    pub items: Vec<CartItem>,
    pub pricing: PriceBreakdown,
    pub total: Cents,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_crypto_record_keeps_full_precision() {
        let record = PaymentRecord::Crypto {
            wallet_address: "0xabc".to_string(),
            transaction_hash: "0x01".to_string(),
            asset: "ETH".to_string(),
            asset_amount: Decimal::from_str("0.026595000000000001").unwrap(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "crypto");
        assert_eq!(json["assetAmount"], "0.026595000000000001");

        let back: PaymentRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
