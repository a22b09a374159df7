//! Demo data loaded at startup when `seed_demo_data` is on.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::account::auth::hash_password;
use crate::account::{Account, DEFAULT_AVATAR};
use crate::catalog::{Condition, Listing, ListingStatus};
use crate::error::MarketResult;
use crate::money::Cents;
use crate::storage::EntityStore;

pub const DEMO_EMAIL: &str = "john@example.com";
pub const DEMO_PASSWORD: &str = "password123";

struct SeedListing {
    title: &'static str,
    description: &'static str,
    price: i64,
    original_price: Option<i64>,
    category: &'static str,
    image: &'static str,
    tags: &'static [&'static str],
}

const LISTINGS: &[SeedListing] = &[
    SeedListing {
        title: "Eco-Friendly Water Bottle",
        description: "Reusable stainless steel water bottle, perfect for staying hydrated while reducing plastic waste.",
        price: 2599,
        original_price: Some(3599),
        category: "Kitchen & Dining",
        image: "/reusable-water-bottle.png",
        tags: &["eco-friendly", "reusable", "water bottle"],
    },
    SeedListing {
        title: "Organic Cotton Tote Bag",
        description: "Durable tote bag made from 100% organic cotton. Great for groceries and everyday use.",
        price: 1599,
        original_price: None,
        category: "Bags & Accessories",
        image: "/simple-canvas-tote.png",
        tags: &["organic", "cotton", "sustainable"],
    },
];

/// Insert the demo seller and their listings. Does nothing if the demo
/// account already exists.
pub fn seed_demo_data(store: &mut EntityStore) -> MarketResult<()> {
    if store.account_by_email(DEMO_EMAIL).is_some() {
        return Ok(());
    }

    let seller = Account {
        id: Uuid::new_v4(),
        name: "John Doe".to_string(),
        email: DEMO_EMAIL.to_string(),
        password_hash: hash_password(DEMO_PASSWORD)?,
        avatar: DEFAULT_AVATAR.to_string(),
        created_at: Utc::now(),
    };

    for seed in LISTINGS {
        store.insert_listing(Listing {
            id: Uuid::new_v4(),
            title: seed.title.to_string(),
            description: seed.description.to_string(),
            price: Cents::new(seed.price),
            original_price: seed.original_price.map(Cents::new),
            category: seed.category.to_string(),
            condition: Condition::New,
            images: vec![seed.image.to_string()],
            seller_id: seller.id,
            seller_name: seller.name.clone(),
            seller_avatar: seller.avatar.clone(),
            status: ListingStatus::Active,
            views: 0,
            favorites: 0,
            tags: seed.tags.iter().map(|t| t.to_string()).collect(),
            created_at: Utc::now(),
        });
    }
    store.create_account(seller)?;

    info!(
        accounts = store.account_count(),
        listings = store.listing_count(),
        "Demo data seeded"
    );
    Ok(())
}
