//! Defines routes for the catalog API and static image serving.
//!
//! ## Structure
//! - **Catalog endpoints**
//!   - `GET    /api/categories` — list categories
//!
//! - **Product endpoints**
//!   - `GET    /api/products` — list products (supports ?category=)
//!   - `POST   /api/products` — create product (multipart form)
//!   - `GET    /api/products/{id}` — fetch one product
//!   - `PUT    /api/products/{id}` — update product (multipart form)
//!   - `DELETE /api/products/{id}` — delete product and reclaim its image
//!
//! - **Static assets**
//!   - `GET /uploads/images/{*path}` — serve a locally stored image
//!
//! The wildcard `*path` allows nested files like `2025/chairs/oak.jpg`.

use crate::{
    handlers::{
        asset_handlers::serve_image,
        health_handlers::{healthz, readyz},
        product_handlers::{
            create_product, delete_product, get_product, list_categories, list_products,
            update_product,
        },
    },
    state::AppState,
};
use axum::{Router, routing::get};

/// Build and return the router for all catalog routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // catalog reads + product CRUD
        .route("/api/categories", get(list_categories))
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        // locally hosted images
        .route("/uploads/images/{*path}", get(serve_image))
}
