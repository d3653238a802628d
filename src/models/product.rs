//! Represents a catalog product and the provenance of its image.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Where a product's image URL came from.
///
/// Written at the same time as `image_url` and consulted whenever an image
/// is replaced or its product deleted: only `MediaStore` images were created
/// by this service and are therefore eligible for remote deletion. Stored as
/// TEXT (`media_store` / `external`) next to the URL.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ImageOrigin {
    /// Uploaded by this service to the remote media store.
    MediaStore,

    /// Supplied by a caller as a plain URL; never deleted remotely.
    External,
}

/// A single furniture product.
///
/// The image is optional: `image_url` and `image_origin` are either both
/// present or both absent. The remote object behind a `MediaStore` URL is
/// owned by this record — replacing or deleting the product reclaims it.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Product {
    /// Identifier assigned by the database.
    pub id: i64,

    /// Product display name.
    pub name: String,

    /// Unit price.
    pub price: f64,

    /// Foreign key linking to the parent category.
    pub category_id: i64,

    /// Fully-qualified URL of the product image, if any.
    pub image_url: Option<String>,

    /// Provenance tag for `image_url`.
    pub image_origin: Option<ImageOrigin>,

    /// When this product was created.
    pub created_at: DateTime<Utc>,

    /// When this product was last modified.
    pub updated_at: DateTime<Utc>,
}
