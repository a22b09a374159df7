//! Accounts and credentials
//!
//! - Registration with a unique contact email
//! - Argon2 password hashing
//! - Signed bearer tokens carrying account id + email
//! - Owner and public profile views (the hash never leaves the store)

pub mod auth;
pub mod service;
pub mod types;

pub use auth::TokenService;
pub use service::{AccountService, Credentials, ProfileUpdate, Registration};
pub use types::{
    Account, AccountId, AccountPatch, Identity, Profile, PublicProfile, Session, DEFAULT_AVATAR,
};
