//! Password hashing and bearer tokens

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use super::types::{AccountId, Identity};
use crate::error::MarketError;

type HmacSha256 = Hmac<Sha256>;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidPassword,
    #[error("password hashing failed")]
    HashingFailed,
}

impl From<AuthError> for MarketError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidPassword => MarketError::Authentication("Invalid credentials".to_string()),
            AuthError::HashingFailed => MarketError::Internal(err.to_string()),
        }
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::HashingFailed)
}

/// Verify a password against a stored hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(password_hash).map_err(|_| AuthError::InvalidPassword)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidPassword)
}

/// Argon2 is CPU bound; run it on the blocking pool, not a runtime worker.
async fn off_runtime<T, F>(work: F) -> Result<T, MarketError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| MarketError::Internal(format!("password worker failed: {}", e)))
}

pub async fn hash_password_async(password: String) -> Result<String, MarketError> {
    Ok(off_runtime(move || hash_password(&password)).await??)
}

/// The outer error is a worker failure, the inner one a wrong password.
pub async fn verify_password_async(
    password: String,
    password_hash: String,
) -> Result<Result<(), AuthError>, MarketError> {
    off_runtime(move || verify_password(&password, &password_hash)).await
}

/// Token payload. Serialized as JSON, hex encoded, then signed.
#[derive(Serialize, Deserialize, Debug, Clone)]
struct Claims {
    sub: AccountId,
    email: String,
    exp: i64,
}

/// Issues and checks `Authorization: Bearer` tokens.
///
/// Format: `hex(claims_json).hex(hmac_sha256(secret, claims_json))`.
#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    validity: Duration,
}

impl TokenService {
    pub fn new(secret: impl AsRef<[u8]>, validity_days: i64) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            validity: Duration::days(validity_days),
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, MarketError> {
        self.issue_at(identity, Utc::now())
    }

    pub fn verify(&self, token: &str) -> Result<Identity, MarketError> {
        self.verify_at(token, Utc::now())
    }

    fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<String, MarketError> {
        let claims = Claims {
            sub: identity.account_id,
            email: identity.email.clone(),
            exp: (now + self.validity).timestamp(),
        };
        let payload = serde_json::to_vec(&claims)
            .map_err(|e| MarketError::Internal(format!("token encoding failed: {}", e)))?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", hex::encode(&payload), hex::encode(signature)))
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, MarketError> {
        let (payload_hex, signature_hex) = token.split_once('.').ok_or_else(MarketError::unauthorized)?;
        let payload = hex::decode(payload_hex).map_err(|_| MarketError::unauthorized())?;
        let signature = hex::decode(signature_hex).map_err(|_| MarketError::unauthorized())?;

        let mut mac = self.mac()?;
        mac.update(&payload);
        mac.verify_slice(&signature).map_err(|_| MarketError::unauthorized())?;

        let claims: Claims = serde_json::from_slice(&payload).map_err(|_| MarketError::unauthorized())?;
        if claims.exp <= now.timestamp() {
            return Err(MarketError::Authentication("Token expired".to_string()));
        }

        Ok(Identity {
            account_id: claims.sub,
            email: claims.email,
        })
    }

    fn mac(&self) -> Result<HmacSha256, MarketError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| MarketError::Internal(format!("bad token key: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            account_id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let password = "my_secure_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).is_ok());
        assert_eq!(verify_password("wrong_password", &hash), Err(AuthError::InvalidPassword));
        assert!(verify_password(password, "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_password_hashing_on_blocking_pool() {
        let hash = hash_password_async("hunter22".to_string()).await.unwrap();

        let ok = verify_password_async("hunter22".to_string(), hash.clone()).await.unwrap();
        assert!(ok.is_ok());
        let wrong = verify_password_async("hunter23".to_string(), hash).await.unwrap();
        assert_eq!(wrong, Err(AuthError::InvalidPassword));
    }

    #[test]
    fn test_token_roundtrip() {
        let tokens = TokenService::new("secret", 7);
        let who = identity();
        let token = tokens.issue(&who).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), who);
    }

    #[test]
    fn test_token_expires_after_validity() {
        let tokens = TokenService::new("secret", 7);
        let issued = Utc::now();
        let token = tokens.issue_at(&identity(), issued).unwrap();

        assert!(tokens.verify_at(&token, issued + Duration::days(6)).is_ok());
        let err = tokens.verify_at(&token, issued + Duration::days(7)).unwrap_err();
        assert!(matches!(err, MarketError::Authentication(_)));
    }

    #[test]
    fn test_token_rejects_tampering_and_foreign_keys() {
        let tokens = TokenService::new("secret", 7);
        let token = tokens.issue(&identity()).unwrap();

        let other = TokenService::new("another-secret", 7);
        assert!(other.verify(&token).is_err());

        let (payload, sig) = token.split_once('.').unwrap();
        let forged_claims = serde_json::to_vec(&Claims {
            sub: Uuid::new_v4(),
            email: "mallory@example.com".to_string(),
            exp: i64::MAX,
        })
        .unwrap();
        let forged = format!("{}.{}", hex::encode(forged_claims), sig);
        assert!(tokens.verify(&forged).is_err());

        assert!(tokens.verify(payload).is_err());
        assert!(tokens.verify("").is_err());
        assert!(tokens.verify("zz.zz").is_err());
    }
}
