//! Core data models for the furniture catalog.
//!
//! These entities represent products and the categories they belong to.
//! They map cleanly to database tables via `sqlx::FromRow` and serialize
//! naturally as JSON via `serde`.

pub mod category;
pub mod product;
