use rand::RngCore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::checkout::{CheckoutSettings, SimulatedAccount};

/// Overrides `auth.token_secret` when set.
pub const TOKEN_SECRET_ENV: &str = "ECOFINDS_TOKEN_SECRET";
pub const MERCHANT_ADDRESS: &str = "0x742d35Cc6634C0532925a3b8D0C9C0E3C5d5c8E9";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MarketConfig {
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    pub token_secret: String,
    #[serde(default = "default_token_days")]
    pub token_validity_days: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CheckoutConfig {
    pub asset: String,
    /// Fixed USD price of one unit of `asset`
    #[serde(with = "rust_decimal::serde::float")]
    pub usd_per_unit: Decimal,
    pub merchant_address: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WalletConfig {
    /// Without a wallet every crypto checkout fails as if no provider were installed
    pub enabled: bool,
    #[serde(default)]
    pub accounts: Vec<SimulatedAccount>,
}

fn default_true() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_token_days() -> i64 {
    7
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            accounts: vec![SimulatedAccount {
                address: "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string(),
                balance: Decimal::from(5),
            }],
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            server: ServerConfig {
                bind: default_bind(),
                port: 8080,
                log_level: "info".to_string(),
            },
            auth: AuthConfig {
                token_secret: random_secret(),
                token_validity_days: default_token_days(),
            },
            checkout: CheckoutConfig {
                asset: "ETH".to_string(),
                usd_per_unit: Decimal::from(2000),
                merchant_address: MERCHANT_ADDRESS.to_string(),
            },
            wallet: WalletConfig::default(),
        }
    }
}

/// How the configuration was obtained; reported once logging is up.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    Loaded(String),
    Created(String),
    Defaulted { path: String, reason: String },
}

impl MarketConfig {
    /// Read `path`, writing a default file there if nothing exists yet.
    /// Unreadable or unparsable files fall back to defaults.
    pub fn load_or_default(path: &str) -> (Self, ConfigSource) {
        let (mut config, source) = if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => (c, ConfigSource::Loaded(path.to_string())),
                    Err(e) => (
                        Self::default(),
                        ConfigSource::Defaulted {
                            path: path.to_string(),
                            reason: format!("parse error: {}", e),
                        },
                    ),
                },
                Err(e) => (
                    Self::default(),
                    ConfigSource::Defaulted {
                        path: path.to_string(),
                        reason: format!("read error: {}", e),
                    },
                ),
            }
        } else {
            let config = Self::default();
            match config.write(path) {
                Ok(()) => (config, ConfigSource::Created(path.to_string())),
                Err(reason) => (
                    config,
                    ConfigSource::Defaulted {
                        path: path.to_string(),
                        reason,
                    },
                ),
            }
        };

        if let Ok(secret) = std::env::var(TOKEN_SECRET_ENV) {
            if !secret.is_empty() {
                config.auth.token_secret = secret;
            }
        }
        (config, source)
    }

    pub fn write(&self, path: &str) -> Result<(), String> {
        let s = toml::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, s).map_err(|e| e.to_string())
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        CheckoutSettings {
            asset: self.checkout.asset.clone(),
            usd_per_unit: self.checkout.usd_per_unit,
            merchant_address: self.checkout.merchant_address.clone(),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}
