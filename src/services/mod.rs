pub mod media_store;
pub mod product_service;
