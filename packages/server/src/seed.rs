use anyhow::Context;
use chrono::{Duration, Utc};
use classifieds_common::{MediaKind, MediaStore};
use classifieds_common::media::{classify, identifier};
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{listing, media, user};
use crate::utils::hash::hash_password;

/// 1x1 transparent GIF used as the body of every demo photo.
const DEMO_PHOTO: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
];

/// Bare `ftyp` box; enough for a placeholder video file.
const DEMO_VIDEO: &[u8] = &[
    0x00, 0x00, 0x00, 0x14, 0x66, 0x74, 0x79, 0x70, 0x69, 0x73, 0x6F, 0x6D, 0x00, 0x00, 0x02,
    0x00, 0x69, 0x73, 0x6F, 0x6D,
];

struct DemoUser {
    username: &'static str,
    email: &'static str,
    password: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    phone_number: &'static str,
}

struct DemoListing {
    /// Index into [`DEMO_USERS`].
    owner: usize,
    title: &'static str,
    description: &'static str,
    price: f64,
    category: &'static str,
    location: &'static str,
    posted_days_ago: i64,
    valid_for_days: i64,
    /// Upload names, in display order. Only the extension is kept.
    media: &'static [&'static str],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        username: "prof.farwell",
        email: "farwell@example.com",
        password: "password123",
        first_name: "Professor",
        last_name: "Farwell",
        phone_number: "555-123-4567",
    },
    DemoUser {
        username: "jane.doe",
        email: "jane@example.com",
        password: "securepass",
        first_name: "Jane",
        last_name: "Doe",
        phone_number: "555-987-6543",
    },
    DemoUser {
        username: "john.smith",
        email: "john@example.com",
        password: "devpass",
        first_name: "John",
        last_name: "Smith",
        phone_number: "555-111-2222",
    },
];

const DEMO_LISTINGS: &[DemoListing] = &[
    DemoListing {
        owner: 0,
        title: "Vintage Telescope - Rare Find!",
        description: "A classic brass telescope from the early 20th century. Optics in great \
            condition, minor wear on the tube.",
        price: 750.0,
        category: "Collectibles",
        location: "Los Angeles, CA",
        posted_days_ago: 0,
        valid_for_days: 30,
        media: &["telescope_main.gif", "telescope_lens.gif"],
    },
    DemoListing {
        owner: 1,
        title: "Handmade Ceramic Mug Set (4)",
        description: "Hand-thrown ceramic mugs with unique glazes. Dishwasher and microwave safe.",
        price: 45.0,
        category: "Home Goods",
        location: "San Francisco, CA",
        posted_days_ago: 5,
        valid_for_days: 25,
        media: &["mugs_set.gif", "mugs_closeup.gif"],
    },
    DemoListing {
        owner: 0,
        title: "Abstract Art Piece - 'Chaos Theory'",
        description: "Large acrylic on canvas, 48x36 inches, exploring mathematical chaos.",
        price: 1200.0,
        category: "Art",
        location: "Pasadena, CA",
        posted_days_ago: 10,
        valid_for_days: 20,
        media: &[
            "chaos_theory_full.gif",
            "chaos_theory_detail.gif",
            "chaos_theory_video_tour.mp4",
        ],
    },
    DemoListing {
        owner: 2,
        title: "Used Mountain Bike - Good Condition",
        description: "Trek mountain bike, medium frame. Well maintained, some scratches.",
        price: 300.0,
        category: "Sporting Goods",
        location: "San Diego, CA",
        posted_days_ago: 2,
        valid_for_days: 28,
        media: &[],
    },
];

/// Row counts written by [`seed_demo_data`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub listings: usize,
    pub media: usize,
}

/// Load demo users, listings and media into an empty database.
///
/// Does nothing when any user already exists. Rows are written in one
/// transaction; media files go through `store` and are removed again if the
/// transaction does not commit.
pub async fn seed_demo_data(
    db: &DatabaseConnection,
    store: &dyn MediaStore,
) -> anyhow::Result<SeedSummary> {
    if user::Entity::find().count(db).await? > 0 {
        info!("Database already has users, skipping demo data");
        return Ok(SeedSummary::default());
    }

    let txn = db.begin().await?;
    let mut touched = Vec::new();

    match insert_demo_data(&txn, store, &mut touched).await {
        Ok(summary) => {
            txn.commit().await?;
            info!(
                users = summary.users,
                listings = summary.listings,
                media = summary.media,
                "Seeded demo data"
            );
            Ok(summary)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                warn!(error = %rb, "Failed to roll back demo data");
            }
            for listing_id in touched {
                store.remove_listing(listing_id).await;
            }
            Err(e)
        }
    }
}

async fn insert_demo_data(
    txn: &DatabaseTransaction,
    store: &dyn MediaStore,
    touched: &mut Vec<i32>,
) -> anyhow::Result<SeedSummary> {
    let now = Utc::now();
    let mut summary = SeedSummary::default();
    let mut user_ids = Vec::with_capacity(DEMO_USERS.len());

    for demo in DEMO_USERS {
        let hash = hash_password(demo.password)
            .map_err(|e| anyhow::anyhow!("Password hash error: {e}"))?;
        let row = user::ActiveModel {
            username: Set(demo.username.to_string()),
            email: Set(demo.email.to_string()),
            password_hash: Set(hash),
            first_name: Set(Some(demo.first_name.to_string())),
            last_name: Set(Some(demo.last_name.to_string())),
            phone_number: Set(Some(demo.phone_number.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await
        .with_context(|| format!("Failed to insert demo user {}", demo.username))?;
        user_ids.push(row.id);
        summary.users += 1;
    }

    for demo in DEMO_LISTINGS {
        let owner = *user_ids
            .get(demo.owner)
            .context("Demo listing refers to an unknown user")?;
        let posted_at = now - Duration::days(demo.posted_days_ago);
        let row = listing::ActiveModel {
            user_id: Set(owner),
            title: Set(demo.title.to_string()),
            description: Set(demo.description.to_string()),
            price: Set(Some(demo.price)),
            category: Set(Some(demo.category.to_string())),
            location: Set(Some(demo.location.to_string())),
            posted_at: Set(posted_at),
            valid_until: Set(Some(now + Duration::days(demo.valid_for_days))),
            is_active: Set(true),
            updated_at: Set(posted_at),
            ..Default::default()
        }
        .insert(txn)
        .await
        .with_context(|| format!("Failed to insert demo listing {}", demo.title))?;
        summary.listings += 1;

        if !demo.media.is_empty() {
            touched.push(row.id);
        }
        for (position, name) in (0i32..).zip(demo.media.iter()) {
            let class = classify(name)?;
            let bytes = match class.kind {
                MediaKind::Photo => DEMO_PHOTO,
                MediaKind::Video => DEMO_VIDEO,
            };
            let stored = identifier::stored_filename(&class.extension);
            store
                .save(row.id, class.kind, &stored, bytes)
                .await
                .with_context(|| format!("Failed to store demo file {name}"))?;

            media::ActiveModel {
                listing_id: Set(row.id),
                filename: Set(stored),
                file_extension: Set(class.extension),
                mimetype: Set(class.mimetype.to_string()),
                media_type: Set(class.kind.to_string()),
                position: Set(position),
                uploaded_at: Set(posted_at),
                ..Default::default()
            }
            .insert(txn)
            .await?;
            summary.media += 1;
        }
    }

    Ok(summary)
}
