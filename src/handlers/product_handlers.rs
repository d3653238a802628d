//! HTTP handlers for product CRUD.
//!
//! Create and update accept `multipart/form-data` so a request can carry the
//! product fields and the raw image bytes in one round trip. Parsing the form
//! is all that happens here; lifecycle decisions live in `ProductService`.

use crate::{
    errors::AppError,
    models::{category::Category, product::Product},
    services::product_service::{ImageInput, ProductInput},
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;

/// Query params accepted by `GET /api/products`.
#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    /// Restrict the listing to one category.
    pub category: Option<i64>,
}

/// Fields collected from a product multipart form.
///
/// `image` (a file part) and `image_url` (a text field) are both optional;
/// an empty file part or blank URL counts as not provided, so "no image
/// change" stays distinguishable from a real value.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<f64>,
    category_id: Option<i64>,
    image: Option<Bytes>,
    image_url: Option<String>,
}

impl ProductForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(format!("invalid multipart body: {}", err)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "name" => form.name = Some(text_field(&name, field).await?),
                "price" => {
                    form.price = Some(parse_field(&name, text_field(&name, field).await?)?)
                }
                "category_id" => {
                    form.category_id = Some(parse_field(&name, text_field(&name, field).await?)?)
                }
                "image" => {
                    let bytes = field.bytes().await.map_err(|err| {
                        AppError::bad_request(format!("reading field `image`: {}", err))
                    })?;
                    if !bytes.is_empty() {
                        form.image = Some(bytes);
                    }
                }
                "image_url" => {
                    let url = text_field(&name, field).await?;
                    if !url.trim().is_empty() {
                        form.image_url = Some(url);
                    }
                }
                // unknown fields are ignored
                _ => {}
            }
        }

        Ok(form)
    }

    fn into_input(self) -> Result<ProductInput, AppError> {
        let name = require(self.name, "name")?;
        let price = require(self.price, "price")?;
        let category_id = require(self.category_id, "category_id")?;

        // uploaded bytes win over a caller-supplied URL
        let image = match (self.image, self.image_url) {
            (Some(bytes), _) => Some(ImageInput::Upload(bytes)),
            (None, Some(url)) => Some(ImageInput::External(url)),
            (None, None) => None,
        };

        Ok(ProductInput {
            name,
            price,
            category_id,
            image,
        })
    }
}

async fn text_field(
    name: &str,
    field: axum::extract::multipart::Field<'_>,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::bad_request(format!("reading field `{}`: {}", name, err)))
}

fn parse_field<T: std::str::FromStr>(name: &str, value: String) -> Result<T, AppError> {
    value
        .parse()
        .map_err(|_| AppError::bad_request(format!("invalid value for field `{}`", name)))
}

fn require<T>(value: Option<T>, name: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::bad_request(format!("missing field `{}`", name)))
}

/// GET `/api/categories` — list the categories products can reference.
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.products.list_categories().await?))
}

/// GET `/api/products` — list all products, or one category's with `?category=`.
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = match query.category {
        Some(category_id) => state.products.list_products_by_category(category_id).await?,
        None => state.products.list_products().await?,
    };
    Ok(Json(products))
}

/// GET `/api/products/{id}` — 404 when no such product exists.
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    match state.products.get_product(id).await? {
        Some(product) => Ok(Json(product)),
        None => Err(AppError::not_found(format!("product `{}` not found", id))),
    }
}

/// POST `/api/products` — create from a multipart form, uploading the image
/// if one was attached.
pub async fn create_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let input = ProductForm::from_multipart(multipart).await?.into_input()?;
    let product = state.products.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT `/api/products/{id}` — overwrite fields, replacing the stored image
/// only when the form carries a new one.
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<Product>, AppError> {
    let input = ProductForm::from_multipart(multipart).await?.into_input()?;
    let product = state.products.update_product(id, input).await?;
    Ok(Json(product))
}

/// DELETE `/api/products/{id}` — idempotent; a missing id is still 204.
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
