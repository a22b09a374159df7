//! Account type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account identifier
pub type AccountId = Uuid;

pub const DEFAULT_AVATAR: &str = "/placeholder.svg";

/// Stored account record.
///
/// Deliberately not `Serialize`: the password hash must never reach a read
/// path, so every response goes through [`Profile`] or [`PublicProfile`].
#[derive(Clone, Debug)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller, as recovered from a bearer token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub account_id: AccountId,
    pub email: String,
}

/// Everything about an account except its secret. Only shown to the owner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// What other users get to see.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: AccountId,
    pub name: String,
    pub avatar: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied by the entity store. `None` leaves a field alone.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub password_hash: Option<String>,
}

/// Logged-in session handed back by register/login.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub user: Profile,
    pub token: String,
}

impl Account {
    pub fn identity(&self) -> Identity {
        Identity {
            account_id: self.id,
            email: self.email.clone(),
        }
    }

    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }

    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            created_at: self.created_at,
        }
    }

    pub fn apply(&mut self, patch: &AccountPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(avatar) = &patch.avatar {
            self.avatar = avatar.clone();
        }
        if let Some(hash) = &patch.password_hash {
            self.password_hash = hash.clone();
        }
    }
}
