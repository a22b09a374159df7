//! Registration, login and profile management

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::auth::{hash_password_async, verify_password_async, TokenService, MIN_PASSWORD_LEN};
use super::types::{Account, AccountId, AccountPatch, Identity, Profile, PublicProfile, Session, DEFAULT_AVATAR};
use crate::error::{MarketError, MarketResult};
use crate::storage::{lock_store, SharedStore};

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Registration {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Account operations over the shared entity store.
///
/// Password hashing runs on the blocking pool, outside the store lock; the
/// uniqueness check is repeated under the lock when the record is written.
pub struct AccountService {
    store: SharedStore,
    tokens: TokenService,
}

impl AccountService {
    pub fn new(store: SharedStore, tokens: TokenService) -> Self {
        Self { store, tokens }
    }

    pub async fn register(&self, req: Registration) -> MarketResult<Session> {
        let missing = || MarketError::validation("Name, email, and password are required");
        let name = non_empty(req.name).ok_or_else(missing)?;
        let email = non_empty(req.email).ok_or_else(missing)?;
        let password = req.password.filter(|p| !p.is_empty()).ok_or_else(missing)?;

        ensure_email_shape(&email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(MarketError::validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LEN
            )));
        }
        if lock_store(&self.store)?.account_by_email(&email).is_some() {
            return Err(MarketError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = hash_password_async(password).await?;
        let account = Account {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            avatar: DEFAULT_AVATAR.to_string(),
            created_at: Utc::now(),
        };
        lock_store(&self.store)?.create_account(account.clone())?;

        info!(account = %account.id, "Account registered");
        self.session_for(&account)
    }

    pub async fn login(&self, creds: Credentials) -> MarketResult<Session> {
        let missing = || MarketError::validation("Email and password are required");
        let email = non_empty(creds.email).ok_or_else(missing)?;
        let password = creds.password.filter(|p| !p.is_empty()).ok_or_else(missing)?;

        let account = lock_store(&self.store)?
            .account_by_email(&email)
            .cloned()
            .ok_or_else(|| MarketError::Authentication("Invalid credentials".to_string()))?;

        verify_password_async(password, account.password_hash.clone()).await??;

        debug!(account = %account.id, "Login succeeded");
        self.session_for(&account)
    }

    /// Resolve a bearer token to the identity it was issued for.
    pub fn authenticate(&self, token: &str) -> MarketResult<Identity> {
        self.tokens.verify(token)
    }

    pub fn profile(&self, identity: &Identity) -> MarketResult<Profile> {
        lock_store(&self.store)?
            .account(&identity.account_id)
            .map(Account::profile)
            .ok_or_else(|| MarketError::not_found("User"))
    }

    pub fn public_profile(&self, id: &AccountId) -> MarketResult<PublicProfile> {
        lock_store(&self.store)?
            .account(id)
            .map(Account::public_profile)
            .ok_or_else(|| MarketError::not_found("User"))
    }

    pub async fn update_profile(&self, identity: &Identity, update: ProfileUpdate) -> MarketResult<Profile> {
        let id = identity.account_id;
        let current = lock_store(&self.store)?
            .account(&id)
            .cloned()
            .ok_or_else(|| MarketError::not_found("User"))?;

        let mut patch = AccountPatch {
            name: non_empty(update.name),
            email: non_empty(update.email),
            avatar: non_empty(update.avatar),
            password_hash: None,
        };

        if let Some(email) = &patch.email {
            ensure_email_shape(email)?;
            self.ensure_email_free(email, &id)?;
        }

        if let Some(new_password) = update.new_password.filter(|p| !p.is_empty()) {
            let current_password = update
                .current_password
                .filter(|p| !p.is_empty())
                .ok_or_else(|| {
                    MarketError::validation("Current password required to change password")
                })?;
            verify_password_async(current_password, current.password_hash.clone())
                .await?
                .map_err(|_| MarketError::validation("Current password is incorrect"))?;
            if new_password.chars().count() < MIN_PASSWORD_LEN {
                return Err(MarketError::validation(format!(
                    "New password must be at least {} characters long",
                    MIN_PASSWORD_LEN
                )));
            }
            patch.password_hash = Some(hash_password_async(new_password).await?);
        }

        let mut store = lock_store(&self.store)?;
        if let Some(email) = &patch.email {
            if store.account_by_email(email).is_some_and(|other| other.id != id) {
                return Err(MarketError::Conflict("Email already in use".to_string()));
            }
        }
        if !store.update_account(&id, &patch) {
            return Err(MarketError::not_found("User"));
        }

        info!(account = %id, "Profile updated");
        store
            .account(&id)
            .map(Account::profile)
            .ok_or_else(|| MarketError::not_found("User"))
    }

    fn ensure_email_free(&self, email: &str, owner: &AccountId) -> MarketResult<()> {
        match lock_store(&self.store)?.account_by_email(email) {
            Some(other) if &other.id != owner => {
                Err(MarketError::Conflict("Email already in use".to_string()))
            }
            _ => Ok(()),
        }
    }

    fn session_for(&self, account: &Account) -> MarketResult<Session> {
        Ok(Session {
            user: account.profile(),
            token: self.tokens.issue(&account.identity())?,
        })
    }
}

fn ensure_email_shape(email: &str) -> MarketResult<()> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(MarketError::validation("Email address is invalid"))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
