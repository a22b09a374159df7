// Wallet capability used by the crypto payment path
use async_trait::async_trait;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::MarketError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalletError {
    #[error("No wallet provider found. Please install a wallet.")]
    ProviderUnavailable,
    #[error("No wallet account connected")]
    NoAccounts,
    #[error("Wallet account {0} is not connected")]
    UnknownAccount(String),
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    #[error("Transaction failed: {0}")]
    TransferFailed(String),
}

impl From<WalletError> for MarketError {
    fn from(e: WalletError) -> Self {
        MarketError::Integration(e.to_string())
    }
}

/// Address discovery, balance query and value transfer. Transaction ids are
/// opaque strings.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<String>, WalletError>;
    async fn get_balance(&self, address: &str) -> Result<Decimal, WalletError>;
    async fn send_value(&self, from: &str, to: &str, amount: Decimal) -> Result<String, WalletError>;
}

/// A configured wallet account and its starting balance.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SimulatedAccount {
    pub address: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
}

/// In-process wallet with fixed accounts. Transfers debit the sender and
/// credit the receiver when the receiver is one of the accounts.
pub struct SimulatedWallet {
    accounts: Mutex<Vec<SimulatedAccount>>,
    reject: bool,
}

impl SimulatedWallet {
    pub fn new(accounts: Vec<SimulatedAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            reject: false,
        }
    }

    /// Behave like a user who declines every transfer prompt.
    pub fn rejecting(mut self) -> Self {
        self.reject = true;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<SimulatedAccount>>, WalletError> {
        self.accounts
            .lock()
            .map_err(|_| WalletError::ProviderUnavailable)
    }
}

fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl WalletProvider for SimulatedWallet {
    async fn get_accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.lock()?.iter().map(|a| a.address.clone()).collect())
    }

    async fn get_balance(&self, address: &str) -> Result<Decimal, WalletError> {
        self.lock()?
            .iter()
            .find(|a| same_address(&a.address, address))
            .map(|a| a.balance)
            .ok_or_else(|| WalletError::UnknownAccount(address.to_string()))
    }

    async fn send_value(&self, from: &str, to: &str, amount: Decimal) -> Result<String, WalletError> {
        if self.reject {
            warn!(from, "Simulated wallet rejected transfer");
            return Err(WalletError::Rejected("User denied transaction signature".to_string()));
        }
        if amount <= Decimal::ZERO {
            return Err(WalletError::TransferFailed("amount must be positive".to_string()));
        }

        let mut accounts = self.lock()?;
        let sender = accounts
            .iter_mut()
            .find(|a| same_address(&a.address, from))
            .ok_or_else(|| WalletError::UnknownAccount(from.to_string()))?;
        if sender.balance < amount {
            return Err(WalletError::TransferFailed("insufficient funds for transfer".to_string()));
        }
        sender.balance -= amount;

        if let Some(receiver) = accounts.iter_mut().find(|a| same_address(&a.address, to)) {
            receiver.balance += amount;
        }

        let nonce: u64 = rand::thread_rng().gen();
        let mut hasher = Sha256::new();
        hasher.update(from.as_bytes());
        hasher.update(to.as_bytes());
        hasher.update(amount.to_string().as_bytes());
        hasher.update(nonce.to_le_bytes());
        let tx_hash = format!("0x{}", hex::encode(hasher.finalize()));

        info!(from, to, %amount, tx = %tx_hash, "Simulated transfer sent");
        Ok(tx_hash)
    }
}

/// No provider present; every call fails.
pub struct UnavailableWallet;

#[async_trait]
impl WalletProvider for UnavailableWallet {
    async fn get_accounts(&self) -> Result<Vec<String>, WalletError> {
        Err(WalletError::ProviderUnavailable)
    }

    async fn get_balance(&self, _address: &str) -> Result<Decimal, WalletError> {
        Err(WalletError::ProviderUnavailable)
    }

    async fn send_value(&self, _from: &str, _to: &str, _amount: Decimal) -> Result<String, WalletError> {
        Err(WalletError::ProviderUnavailable)
    }
}
