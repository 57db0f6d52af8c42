//! Firestore REST client.
//!
//! Reads are public and cached with `moka` (products and categories for
//! 5 minutes, the layout config for 1 hour). Writes carry the admin's ID
//! token and are never cached; callers invalidate after writing.

mod cache;
pub mod conversions;
mod query;
pub mod value;

pub use query::ProductCursor;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::Method;
use rocha_brindes_core::{Category, CategoryId, LayoutConfig, Product, ProductId};
use secrecy::ExposeSecret;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use crate::config::FirebaseConfig;
use crate::http::{parse_json, read_body};
use crate::BackendError;

use cache::{CacheKey, CacheValue};
use conversions::{
    category_from_document, category_to_document, layout_from_document, layout_to_document,
    product_from_document, product_to_document,
};
use query::{QueryRow, RunQuery};
use value::Document;

const PRODUCTS: &str = "produtos";
const CATEGORIES: &str = "categorias";
const CONFIG: &str = "config";
const LAYOUT: &str = "layout";

/// One page of the admin product list.
#[derive(Debug, Clone, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    /// Where the next page starts; `None` on the last page.
    pub next: Option<ProductCursor>,
}

// =============================================================================
// FirestoreClient
// =============================================================================

/// Client for the Firestore REST API.
#[derive(Clone)]
pub struct FirestoreClient {
    inner: Arc<FirestoreClientInner>,
}

struct FirestoreClientInner {
    client: reqwest::Client,
    config: FirebaseConfig,
    base: String,
    cache: Cache<CacheKey, CacheValue>,
    layout_cache: Cache<CacheKey, CacheValue>,
}

impl FirestoreClient {
    /// Create a new Firestore client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        Self::with_base(config, config.firestore_base())
    }

    fn with_base(config: &FirebaseConfig, base: String) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        let layout_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(3600)) // 1 hour
            .build();

        Self {
            inner: Arc::new(FirestoreClientInner {
                client: reqwest::Client::new(),
                base,
                config: config.clone(),
                cache,
                layout_cache,
            }),
        }
    }

    /// Build a URL under the documents root with the API key attached.
    fn url(&self, path: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base))
            .map_err(|e| BackendError::Decode(format!("invalid URL for {path}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.config.api_key.expose_secret());
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, BackendError> {
        self.url(&format!("/{collection}/{}", urlencoding::encode(id)))
    }

    /// Send a request, optionally authorized, and return the body.
    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        token: Option<&str>,
        what: &str,
    ) -> Result<String, BackendError> {
        let mut request = self.inner.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        read_body(response, what).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Document, BackendError> {
        let url = self.document_url(collection, id)?;
        let body = self
            .send::<()>(Method::GET, url, None, None, &format!("{collection}/{id}"))
            .await?;
        parse_json(&body)
    }

    async fn run_query(&self, query: &RunQuery) -> Result<Vec<Document>, BackendError> {
        let url = self.url(":runQuery")?;
        let body = self
            .send(Method::POST, url, Some(query), None, "runQuery")
            .await?;
        let rows: Vec<QueryRow> = parse_json(&body)?;
        Ok(rows.into_iter().filter_map(|row| row.document).collect())
    }

    async fn write_document(
        &self,
        collection: &str,
        id: &str,
        document: &Document,
        mask: &[&str],
        token: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.document_url(collection, id)?;
        if !mask.is_empty() {
            let mut query = url.query_pairs_mut();
            for field in mask {
                query.append_pair("updateMask.fieldPaths", field);
            }
            query.append_pair("currentDocument.exists", "true");
        }
        self.send(
            Method::PATCH,
            url,
            Some(document),
            Some(token),
            &format!("{collection}/{id}"),
        )
        .await?;
        Ok(())
    }

    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        token: &str,
    ) -> Result<(), BackendError> {
        let url = self.document_url(collection, id)?;
        self.send::<()>(
            Method::DELETE,
            url,
            None,
            Some(token),
            &format!("{collection}/{id}"),
        )
        .await?;
        Ok(())
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Products, newest first, optionally limited.
    ///
    /// Products without `createdAt` are not returned: Firestore drops
    /// documents missing the ordered field.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or a document is malformed.
    #[instrument(skip(self))]
    pub async fn products(&self, limit: Option<u32>) -> Result<Arc<Vec<Product>>, BackendError> {
        let cache_key = CacheKey::Products { limit };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let documents = self.run_query(&query::newest_products(limit)).await?;
        let products = Arc::new(
            documents
                .iter()
                .map(product_from_document)
                .collect::<Result<Vec<_>, _>>()?,
        );

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// Get a product by its id.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] for an unknown id, or an error if
    /// the API request fails.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn product(&self, id: &str) -> Result<Product, BackendError> {
        let cache_key = CacheKey::Product(id.to_string());

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let document = self.get_document(PRODUCTS, id).await?;
        let product = product_from_document(&document)?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// One page of the admin product list. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or a document is malformed.
    #[instrument(skip(self))]
    pub async fn product_page(
        &self,
        page_size: u32,
        after: Option<&ProductCursor>,
    ) -> Result<ProductPage, BackendError> {
        let cursor = after.map(|c| (c, self.inner.config.document_name(PRODUCTS, c.id.as_str())));
        let documents = self.run_query(&query::product_page(page_size, cursor)).await?;

        let products = documents
            .iter()
            .map(product_from_document)
            .collect::<Result<Vec<_>, _>>()?;

        let full_page = u32::try_from(products.len()).is_ok_and(|n| n >= page_size);
        let next = if full_page {
            documents.last().zip(products.last()).and_then(|(doc, p)| {
                p.created_at.map(|created_at| ProductCursor {
                    created_at,
                    id: ProductId::new(doc.id()),
                })
            })
        } else {
            None
        };

        Ok(ProductPage { products, next })
    }

    /// Create or fully replace a product document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or the request fails.
    #[instrument(skip(self, product, token), fields(id = %product.id))]
    pub async fn save_product(&self, product: &Product, token: &str) -> Result<(), BackendError> {
        let document = product_to_document(product)?;
        self.write_document(PRODUCTS, product.id.as_str(), &document, &[], token)
            .await
    }

    /// Delete a product document. Its storage files are left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn delete_product(&self, id: &ProductId, token: &str) -> Result<(), BackendError> {
        self.delete_document(PRODUCTS, id.as_str(), token).await
    }

    // =========================================================================
    // Category Methods
    // =========================================================================

    /// Every category, ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or a document is malformed.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, BackendError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let documents = self.run_query(&query::categories_by_name()).await?;
        let categories = Arc::new(
            documents
                .iter()
                .map(category_from_document)
                .collect::<Result<Vec<_>, _>>()?,
        );

        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(Arc::clone(&categories)),
            )
            .await;

        Ok(categories)
    }

    /// Create or fully replace a category document.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or the request fails.
    #[instrument(skip(self, category, token), fields(id = %category.id))]
    pub async fn save_category(&self, category: &Category, token: &str) -> Result<(), BackendError> {
        let document = category_to_document(category)?;
        self.write_document(CATEGORIES, category.id.as_str(), &document, &[], token)
            .await
    }

    /// Set only the `popular` flag of an existing category.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the category does not exist.
    #[instrument(skip(self, token))]
    pub async fn set_category_popular(
        &self,
        id: &CategoryId,
        popular: bool,
        token: &str,
    ) -> Result<(), BackendError> {
        let document = Document::from_json(&serde_json::json!({ "popular": popular }), &[])?;
        self.write_document(CATEGORIES, id.as_str(), &document, &["popular"], token)
            .await
    }

    /// Set only the `imagePath` of an existing category.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the category does not exist.
    #[instrument(skip(self, token))]
    pub async fn set_category_image(
        &self,
        id: &CategoryId,
        image_path: &str,
        token: &str,
    ) -> Result<(), BackendError> {
        let document = Document::from_json(&serde_json::json!({ "imagePath": image_path }), &[])?;
        self.write_document(CATEGORIES, id.as_str(), &document, &["imagePath"], token)
            .await
    }

    /// Delete a category document. Products keep the name in their lists.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn delete_category(&self, id: &CategoryId, token: &str) -> Result<(), BackendError> {
        self.delete_document(CATEGORIES, id.as_str(), token).await
    }

    // =========================================================================
    // Layout Methods
    // =========================================================================

    /// The homepage layout config. A missing document reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the document is malformed.
    #[instrument(skip(self))]
    pub async fn layout(&self) -> Result<LayoutConfig, BackendError> {
        if let Some(CacheValue::Layout(layout)) =
            self.inner.layout_cache.get(&CacheKey::Layout).await
        {
            debug!("Cache hit for layout");
            return Ok(*layout);
        }

        let layout = match self.get_document(CONFIG, LAYOUT).await {
            Ok(document) => layout_from_document(&document)?,
            Err(BackendError::NotFound(_)) => LayoutConfig::default(),
            Err(e) => return Err(e),
        };

        self.inner
            .layout_cache
            .insert(CacheKey::Layout, CacheValue::Layout(Box::new(layout.clone())))
            .await;

        Ok(layout)
    }

    /// Fetch the layout document past the cache. Readiness checks use this
    /// so a warm cache cannot hide an unreachable Firestore.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Firestore rejects it. A
    /// missing layout document still counts as reachable.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), BackendError> {
        match self.get_document(CONFIG, LAYOUT).await {
            Ok(_) | Err(BackendError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Replace the whole layout singleton.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or the request fails.
    #[instrument(skip(self, layout, token))]
    pub async fn save_layout(&self, layout: &LayoutConfig, token: &str) -> Result<(), BackendError> {
        let document = layout_to_document(layout)?;
        self.write_document(CONFIG, LAYOUT, &document, &[], token).await
    }

    // =========================================================================
    // Cache
    // =========================================================================

    /// Drop every cached read so the next request hits Firestore.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.layout_cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
        self.inner.layout_cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn firebase_config() -> FirebaseConfig {
        FirebaseConfig {
            api_key: SecretString::from("test-key"),
            project_id: "rocha-brindes".to_string(),
            storage_bucket: "rocha-brindes.firebasestorage.app".to_string(),
        }
    }

    fn client() -> FirestoreClient {
        FirestoreClient::new(&firebase_config())
    }

    #[tokio::test]
    async fn test_ping_skips_warm_layout_cache() {
        // Nothing listens on the discard port.
        let client = FirestoreClient::with_base(
            &firebase_config(),
            "http://127.0.0.1:9/documents".to_string(),
        );
        client
            .inner
            .layout_cache
            .insert(
                CacheKey::Layout,
                CacheValue::Layout(Box::new(LayoutConfig::default())),
            )
            .await;

        assert!(client.layout().await.is_ok());
        assert!(matches!(client.ping().await, Err(BackendError::Http(_))));
    }

    #[test]
    fn test_document_url_encodes_id_and_adds_key() {
        let url = client().document_url(PRODUCTS, "CAN 001").unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/rocha-brindes/databases/(default)/documents/produtos/CAN%20001?key=test-key"
        );
    }

    #[test]
    fn test_run_query_url() {
        let url = client().url(":runQuery").unwrap();
        assert!(url.as_str().ends_with("/documents:runQuery?key=test-key"));
    }

    #[tokio::test]
    async fn test_cached_product_is_served_without_request() {
        let client = client();
        let product = Product::new("CAN-001", "Caneta");
        client
            .inner
            .cache
            .insert(
                CacheKey::Product("CAN-001".to_string()),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;

        assert_eq!(client.product("CAN-001").await.unwrap(), product);

        client.invalidate_all().await;
        assert!(
            client
                .inner
                .cache
                .get(&CacheKey::Product("CAN-001".to_string()))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cached_layout_is_served_without_request() {
        let client = client();
        let layout = LayoutConfig {
            banners: vec!["https://img/b.webp".to_string()],
            ..LayoutConfig::default()
        };
        client
            .inner
            .layout_cache
            .insert(CacheKey::Layout, CacheValue::Layout(Box::new(layout.clone())))
            .await;

        assert_eq!(client.layout().await.unwrap(), layout);
    }
}
