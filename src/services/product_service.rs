//! ProductService — catalog CRUD backed by SQLite for product rows and a
//! remote media store for image payloads. The service is the sole writer of
//! the product→remote-image relationship: it uploads on create, replaces on
//! update, and reclaims best-effort on delete, so a product owns at most one
//! remote image at a time.

use crate::models::{
    category::Category,
    product::{ImageOrigin, Product},
};
use crate::services::media_store::{IMAGE_FOLDER, MediaStore, MediaStoreError, public_id_for_url};
use bytes::Bytes;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product `{0}` not found")]
    ProductNotFound(i64),
    #[error("category `{0}` not found")]
    CategoryNotFound(i64),
    #[error("image upload failed: {0}")]
    Upload(#[from] MediaStoreError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Image supplied with a create/update request.
///
/// Absence (`Option::None` at the call site) means "no image change", which
/// is distinct from both variants here. `Upload` bytes are expected to be
/// non-empty; handlers drop empty file parts before they reach the service.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// Raw bytes to push to the media store.
    Upload(Bytes),
    /// A caller-supplied URL the service records but never uploads or
    /// deletes remotely.
    External(String),
}

/// Product fields carried by a create or update request.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub price: f64,
    pub category_id: i64,
    pub image: Option<ImageInput>,
}

const PRODUCT_COLUMNS: &str =
    "id, name, price, category_id, image_url, image_origin, created_at, updated_at";

/// ProductService provides the product lifecycle operations:
/// - List products (all, or filtered by category)
/// - Get a product by id (absent result, not an error)
/// - Create with an optional image (conditional upload)
/// - Update with an optional replacement image (old resource reclaimed)
/// - Delete (remote image reclaimed best-effort, then the row removed)
///
/// Upload failures abort the surrounding write before anything is persisted;
/// remote delete failures are logged and swallowed so they never block the
/// product mutation. There is no transaction spanning upload + persist.
#[derive(Clone)]
pub struct ProductService {
    /// Shared SQLite connection pool for product and category rows.
    pub db: Arc<SqlitePool>,

    /// Remote store hosting the image payloads.
    media: Arc<dyn MediaStore>,
}

impl ProductService {
    pub fn new(db: Arc<SqlitePool>, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    pub async fn list_categories(&self) -> CatalogResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id ASC")
            .fetch_all(&*self.db)
            .await?;
        Ok(rows)
    }

    pub async fn list_products(&self) -> CatalogResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn list_products_by_category(&self, category_id: i64) -> CatalogResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE category_id = ? ORDER BY id ASC"
        ))
        .bind(category_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Fetch a single product. A missing id is absence, not an error.
    pub async fn get_product(&self, id: i64) -> CatalogResult<Option<Product>> {
        let row = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row)
    }

    /// Create a product, uploading its image first if one was supplied.
    ///
    /// The upload happens before any persistence write, so a failed upload
    /// leaves the database untouched. If the insert fails after a successful
    /// upload the remote object is orphaned; accepted, not rolled back.
    pub async fn create_product(&self, input: ProductInput) -> CatalogResult<Product> {
        self.fetch_category(input.category_id).await?;

        let image = match input.image {
            Some(image) => Some(self.resolve_image(image).await?),
            None => None,
        };
        let (image_url, image_origin) = match image {
            Some((url, origin)) => (Some(url), Some(origin)),
            None => (None, None),
        };

        let now = Utc::now();
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, price, category_id, image_url, image_origin, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.price)
        .bind(input.category_id)
        .bind(&image_url)
        .bind(image_origin)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        Ok(product)
    }

    /// Update a product, replacing its image if new one was supplied.
    ///
    /// Name, price, and category are overwritten unconditionally. When a new
    /// image arrives the old store-owned resource is reclaimed best-effort
    /// before the new upload; an upload failure aborts the whole update and
    /// no row is written. Without a new image the stored reference is left
    /// exactly as it was.
    pub async fn update_product(&self, id: i64, input: ProductInput) -> CatalogResult<Product> {
        let existing = self
            .get_product(id)
            .await?
            .ok_or(CatalogError::ProductNotFound(id))?;
        self.fetch_category(input.category_id).await?;

        let (image_url, image_origin) = match input.image {
            Some(image) => {
                self.reclaim_remote_image(&existing).await;
                let (url, origin) = self.resolve_image(image).await?;
                (Some(url), Some(origin))
            }
            None => (existing.image_url.clone(), existing.image_origin),
        };

        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products
             SET name = ?, price = ?, category_id = ?, image_url = ?, image_origin = ?, updated_at = ?
             WHERE id = ?
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(input.price)
        .bind(input.category_id)
        .bind(&image_url)
        .bind(image_origin)
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&*self.db)
        .await?;

        Ok(product)
    }

    /// Delete a product and reclaim its remote image best-effort.
    ///
    /// Idempotent: a missing id is a silent no-op and makes no media store
    /// call. A failed remote deletion never prevents the row removal.
    pub async fn delete_product(&self, id: i64) -> CatalogResult<()> {
        let Some(product) = self.get_product(id).await? else {
            debug!("delete of missing product {id} ignored");
            return Ok(());
        };

        self.reclaim_remote_image(&product).await;

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    /// Turn an image input into the (url, origin) pair to persist.
    ///
    /// Upload errors propagate; they are the one media store failure that is
    /// fatal to the surrounding write.
    async fn resolve_image(&self, image: ImageInput) -> CatalogResult<(String, ImageOrigin)> {
        match image {
            ImageInput::Upload(bytes) => {
                let url = self.media.upload(bytes, IMAGE_FOLDER).await?;
                Ok((url, ImageOrigin::MediaStore))
            }
            ImageInput::External(url) => Ok((url, ImageOrigin::External)),
        }
    }

    /// Best-effort removal of a product's remote image.
    ///
    /// Skips images this service did not upload (`External` origin) and URLs
    /// the resolver cannot turn into a public id; those stale objects stay
    /// orphaned at the store. Failures are logged and swallowed.
    async fn reclaim_remote_image(&self, product: &Product) {
        if product.image_origin != Some(ImageOrigin::MediaStore) {
            return;
        }
        let Some(url) = product.image_url.as_deref() else {
            return;
        };
        let Some(public_id) = public_id_for_url(url) else {
            debug!("no public id derivable from `{url}`, leaving remote object in place");
            return;
        };
        if let Err(err) = self.media.delete(&public_id).await {
            warn!("failed to delete `{public_id}` from media store: {err}");
        }
    }

    async fn fetch_category(&self, id: i64) -> CatalogResult<Category> {
        sqlx::query_as::<_, Category>("SELECT id, name FROM categories WHERE id = ?")
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => CatalogError::CategoryNotFound(id),
                other => CatalogError::Sqlx(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::media_store::MediaStoreResult;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    const CHAIRS: i64 = 1;
    const TABLES: i64 = 2;

    /// Records every call and can be told to fail either operation.
    #[derive(Default)]
    struct MockMediaStore {
        uploads: Mutex<Vec<(usize, String)>>,
        deletes: Mutex<Vec<String>>,
        fail_upload: AtomicBool,
        fail_delete: AtomicBool,
    }

    impl MockMediaStore {
        fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }

        fn deleted_ids(&self) -> Vec<String> {
            self.deletes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaStore for MockMediaStore {
        async fn upload(&self, bytes: Bytes, folder: &str) -> MediaStoreResult<String> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(MediaStoreError::Status {
                    status: 500,
                    body: "simulated upload failure".into(),
                });
            }
            let mut uploads = self.uploads.lock().unwrap();
            uploads.push((bytes.len(), folder.to_string()));
            let n = uploads.len();
            Ok(format!(
                "https://media.example.com/image/upload/v1/furniture_products/upload-{n}.jpg"
            ))
        }

        async fn delete(&self, public_id: &str) -> MediaStoreResult<()> {
            self.deletes.lock().unwrap().push(public_id.to_string());
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(MediaStoreError::Status {
                    status: 500,
                    body: "simulated delete failure".into(),
                });
            }
            Ok(())
        }
    }

    async fn setup() -> (ProductService, Arc<MockMediaStore>) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");

        let schema = include_str!("../../migrations/0001_init.sql");
        for stmt in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(stmt).execute(&pool).await.expect("migration");
        }

        let media = Arc::new(MockMediaStore::default());
        let service = ProductService::new(Arc::new(pool), media.clone());
        (service, media)
    }

    fn input(name: &str, price: f64, category_id: i64, image: Option<ImageInput>) -> ProductInput {
        ProductInput {
            name: name.into(),
            price,
            category_id,
            image,
        }
    }

    fn upload(bytes: &[u8]) -> Option<ImageInput> {
        Some(ImageInput::Upload(Bytes::copy_from_slice(bytes)))
    }

    #[tokio::test]
    async fn create_without_image_persists_absent_image() {
        let (service, media) = setup().await;

        let product = service
            .create_product(input("Oak chair", 129.99, CHAIRS, None))
            .await
            .unwrap();

        assert_eq!(product.image_url, None);
        assert_eq!(product.image_origin, None);
        assert_eq!(media.upload_count(), 0);
        assert!(media.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn create_with_image_uploads_once_and_persists_url() {
        let (service, media) = setup().await;

        let product = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"jpegbytes")))
            .await
            .unwrap();

        assert_eq!(media.upload_count(), 1);
        assert_eq!(
            media.uploads.lock().unwrap()[0],
            (9, "furniture_products".to_string())
        );
        assert_eq!(
            product.image_url.as_deref(),
            Some("https://media.example.com/image/upload/v1/furniture_products/upload-1.jpg")
        );
        assert_eq!(product.image_origin, Some(ImageOrigin::MediaStore));
    }

    #[tokio::test]
    async fn create_with_external_url_never_calls_the_store() {
        let (service, media) = setup().await;

        let product = service
            .create_product(input(
                "Oak chair",
                129.99,
                CHAIRS,
                Some(ImageInput::External("https://elsewhere.example/p.jpg".into())),
            ))
            .await
            .unwrap();

        assert_eq!(
            product.image_url.as_deref(),
            Some("https://elsewhere.example/p.jpg")
        );
        assert_eq!(product.image_origin, Some(ImageOrigin::External));
        assert_eq!(media.upload_count(), 0);
    }

    #[tokio::test]
    async fn create_with_unknown_category_fails() {
        let (service, media) = setup().await;

        let err = service
            .create_product(input("Oak chair", 129.99, 999, upload(b"jpegbytes")))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::CategoryNotFound(999)));
        // category is checked before any upload
        assert_eq!(media.upload_count(), 0);
    }

    #[tokio::test]
    async fn update_with_image_reclaims_old_then_uploads_new() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"old")))
            .await
            .unwrap();

        let updated = service
            .update_product(created.id, input("Oak chair v2", 149.99, CHAIRS, upload(b"new")))
            .await
            .unwrap();

        assert_eq!(media.deleted_ids(), vec!["furniture_products/upload-1"]);
        assert_eq!(media.upload_count(), 2);
        assert_eq!(
            updated.image_url.as_deref(),
            Some("https://media.example.com/image/upload/v1/furniture_products/upload-2.jpg")
        );
        assert_eq!(updated.name, "Oak chair v2");
    }

    #[tokio::test]
    async fn update_without_image_leaves_image_untouched() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"old")))
            .await
            .unwrap();

        let updated = service
            .update_product(created.id, input("Walnut table", 899.0, TABLES, None))
            .await
            .unwrap();

        assert_eq!(updated.name, "Walnut table");
        assert_eq!(updated.category_id, TABLES);
        assert_eq!(updated.image_url, created.image_url);
        assert_eq!(updated.image_origin, created.image_origin);
        assert_eq!(media.upload_count(), 1);
        assert!(media.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_product_is_not_found() {
        let (service, media) = setup().await;

        let err = service
            .update_product(42, input("Ghost", 1.0, CHAIRS, None))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::ProductNotFound(42)));
        assert_eq!(media.upload_count(), 0);
    }

    #[tokio::test]
    async fn update_never_deletes_external_images_remotely() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input(
                "Oak chair",
                129.99,
                CHAIRS,
                Some(ImageInput::External("https://elsewhere.example/p.jpg".into())),
            ))
            .await
            .unwrap();

        service
            .update_product(created.id, input("Oak chair", 129.99, CHAIRS, upload(b"new")))
            .await
            .unwrap();

        assert!(media.deleted_ids().is_empty());
        assert_eq!(media.upload_count(), 1);
    }

    #[tokio::test]
    async fn unresolvable_stored_url_is_skipped_silently() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"old")))
            .await
            .unwrap();

        // stored URL with no extension: the resolver yields nothing to delete
        sqlx::query("UPDATE products SET image_url = ? WHERE id = ?")
            .bind("https://media.example.com/raw/noextension")
            .bind(created.id)
            .execute(&*service.db)
            .await
            .unwrap();

        let updated = service
            .update_product(created.id, input("Oak chair", 129.99, CHAIRS, upload(b"new")))
            .await
            .unwrap();

        assert!(media.deleted_ids().is_empty());
        assert_eq!(media.upload_count(), 2);
        assert_eq!(
            updated.image_url.as_deref(),
            Some("https://media.example.com/image/upload/v1/furniture_products/upload-2.jpg")
        );
    }

    #[tokio::test]
    async fn delete_reclaims_remote_image_and_removes_row() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"img")))
            .await
            .unwrap();

        service.delete_product(created.id).await.unwrap();

        assert_eq!(media.deleted_ids(), vec!["furniture_products/upload-1"]);
        assert!(service.get_product(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_missing_product_is_a_silent_noop() {
        let (service, media) = setup().await;

        service.delete_product(42).await.unwrap();

        assert_eq!(media.upload_count(), 0);
        assert!(media.deleted_ids().is_empty());
    }

    #[tokio::test]
    async fn failed_remote_delete_does_not_block_row_removal() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"img")))
            .await
            .unwrap();
        media.fail_delete.store(true, Ordering::SeqCst);

        service.delete_product(created.id).await.unwrap();

        // the delete was attempted, its failure swallowed
        assert_eq!(media.deleted_ids(), vec!["furniture_products/upload-1"]);
        assert!(service.get_product(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_upload_aborts_create_before_persistence() {
        let (service, media) = setup().await;
        media.fail_upload.store(true, Ordering::SeqCst);

        let err = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"img")))
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Upload(_)));
        assert!(service.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_upload_aborts_update_before_persistence() {
        let (service, media) = setup().await;

        let created = service
            .create_product(input("Oak chair", 129.99, CHAIRS, upload(b"img")))
            .await
            .unwrap();
        media.fail_upload.store(true, Ordering::SeqCst);

        let err = service
            .update_product(created.id, input("Renamed", 1.0, TABLES, upload(b"new")))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Upload(_)));

        let current = service.get_product(created.id).await.unwrap().unwrap();
        assert_eq!(current.name, "Oak chair");
        assert_eq!(current.image_url, created.image_url);
    }

    #[tokio::test]
    async fn get_of_missing_product_is_absent_not_an_error() {
        let (service, _media) = setup().await;
        assert!(service.get_product(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_seeded_categories() {
        let (service, _media) = setup().await;
        let categories = service.list_categories().await.unwrap();
        assert_eq!(categories.len(), 5);
        assert_eq!(categories[0].name, "chairs");
    }

    #[tokio::test]
    async fn list_by_category_filters() {
        let (service, _media) = setup().await;

        service
            .create_product(input("Oak chair", 129.99, CHAIRS, None))
            .await
            .unwrap();
        service
            .create_product(input("Walnut table", 899.0, TABLES, None))
            .await
            .unwrap();

        let chairs = service.list_products_by_category(CHAIRS).await.unwrap();
        assert_eq!(chairs.len(), 1);
        assert_eq!(chairs[0].name, "Oak chair");
        assert_eq!(service.list_products().await.unwrap().len(), 2);
    }
}
