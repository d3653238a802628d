//! Represents a product category (chairs, tables, sofas, ...).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog category referenced by products.
///
/// Categories are seeded by the initial migration; products reference them
/// by id in a many-products-to-one-category relationship.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Category {
    /// Identifier assigned by the database.
    pub id: i64,

    /// Unique human-readable category name.
    pub name: String,
}
