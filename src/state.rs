use crate::services::product_service::ProductService;
use std::path::PathBuf;

/// Shared state handed to every handler through the router.
#[derive(Clone)]
pub struct AppState {
    /// Product lifecycle service (catalog rows + remote images).
    pub products: ProductService,

    /// Local directory the static image routes serve from. Fixed at startup.
    pub upload_dir: PathBuf,
}
