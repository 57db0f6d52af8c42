//! Firebase Cloud Storage REST client.
//!
//! Uploads return a tokenized download URL, which is what gets stored in
//! documents. Listings are cached for 10 minutes.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use rocha_brindes_core::storage::{base_name, listing_prefix, natural_cmp};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::FirebaseConfig;
use crate::http::{parse_json, read_body};
use crate::BackendError;

/// Object metadata as returned by upload and metadata requests.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    name: String,
    /// Comma-separated download tokens.
    #[serde(default)]
    download_tokens: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    items: Vec<ListItem>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItem {
    name: String,
}

/// A file found under a storage prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFile {
    /// Last path component.
    pub name: String,
    /// Full object path.
    pub path: String,
    /// Download URL suitable for storing in documents.
    pub url: String,
}

/// Immediate children of a storage prefix, each list in natural name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageListing {
    /// Full paths of subfolders, with a trailing slash.
    pub folders: Vec<String>,
    pub files: Vec<StorageFile>,
}

/// Client for the Firebase Storage REST API.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<StorageClientInner>,
}

struct StorageClientInner {
    client: reqwest::Client,
    base: String,
    api_key: String,
    cache: Cache<String, StorageListing>,
}

impl StorageClient {
    /// Create a new Storage client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(100)
            .time_to_live(Duration::from_secs(600)) // 10 minutes
            .build();

        Self {
            inner: Arc::new(StorageClientInner {
                client: reqwest::Client::new(),
                base: config.storage_base(),
                api_key: config.api_key.expose_secret().to_string(),
                cache,
            }),
        }
    }

    fn bucket_url(&self) -> Result<Url, BackendError> {
        Url::parse(&self.inner.base)
            .map_err(|e| BackendError::Decode(format!("invalid storage URL: {e}")))
    }

    fn object_url(&self, path: &str) -> Result<Url, BackendError> {
        Url::parse(&format!("{}/{}", self.inner.base, urlencoding::encode(path)))
            .map_err(|e| BackendError::Decode(format!("invalid storage URL: {e}")))
    }

    /// Public download URL for `path`, tokenized when a token is known.
    fn download_url(&self, path: &str, token: Option<&str>) -> Result<String, BackendError> {
        let mut url = self.object_url(path)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("alt", "media");
            if let Some(token) = token {
                query.append_pair("token", token);
            }
        }
        Ok(url.into())
    }

    fn download_url_for(&self, metadata: &ObjectMetadata) -> Result<String, BackendError> {
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty());
        self.download_url(&metadata.name, token)
    }

    /// Upload `bytes` to `path` and return its download URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the request fails.
    #[instrument(skip(self, bytes, token), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: &str,
    ) -> Result<String, BackendError> {
        let mut url = self.bucket_url()?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", path);

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        let body = read_body(response, path).await?;
        let metadata: ObjectMetadata = parse_json(&body)?;

        debug!(path = %metadata.name, "Uploaded object");
        self.download_url_for(&metadata)
    }

    async fn metadata(&self, path: &str, token: Option<&str>) -> Result<ObjectMetadata, BackendError> {
        let mut request = self.inner.client.get(self.object_url(path)?);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let body = read_body(response, path).await?;
        parse_json(&body)
    }

    /// List the immediate subfolders and files under `folder`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing is rejected or the request fails.
    #[instrument(skip(self, token))]
    pub async fn list(&self, folder: &str, token: Option<&str>) -> Result<StorageListing, BackendError> {
        let prefix = listing_prefix(folder);

        if let Some(listing) = self.inner.cache.get(&prefix).await {
            debug!("Cache hit for storage listing");
            return Ok(listing);
        }

        let mut folders = Vec::new();
        let mut paths = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.bucket_url()?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("prefix", &prefix)
                    .append_pair("delimiter", "/")
                    .append_pair("key", &self.inner.api_key);
                if let Some(page) = &page_token {
                    query.append_pair("pageToken", page);
                }
            }

            let mut request = self.inner.client.get(url);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            let response = request.send().await?;
            let body = read_body(response, &prefix).await?;
            let page: ListResponse = parse_json(&body)?;

            folders.extend(page.prefixes);
            // The folder placeholder object shares the prefix's name.
            paths.extend(
                page.items
                    .into_iter()
                    .map(|item| item.name)
                    .filter(|name| *name != prefix),
            );

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        let mut files = self.resolve_files(paths, token).await?;

        folders.sort_by(|a, b| natural_cmp(base_name(a), base_name(b)));
        files.sort_by(|a, b| natural_cmp(&a.name, &b.name));

        let listing = StorageListing { folders, files };
        self.inner.cache.insert(prefix, listing.clone()).await;
        Ok(listing)
    }

    /// Fetch download tokens for every path concurrently.
    async fn resolve_files(
        &self,
        paths: Vec<String>,
        token: Option<&str>,
    ) -> Result<Vec<StorageFile>, BackendError> {
        let mut tasks = JoinSet::new();
        for path in paths {
            let client = self.clone();
            let token = token.map(str::to_string);
            tasks.spawn(async move {
                let metadata = client.metadata(&path, token.as_deref()).await;
                (path, metadata)
            });
        }

        let mut files = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let Ok((path, metadata)) = joined else {
                warn!("Storage metadata task failed");
                continue;
            };
            let url = match metadata {
                Ok(metadata) => self.download_url_for(&metadata)?,
                Err(e) => {
                    warn!(path = %path, error = %e, "No download token, using untokenized URL");
                    self.download_url(&path, None)?
                }
            };
            files.push(StorageFile {
                name: base_name(&path).to_string(),
                path,
                url,
            });
        }
        Ok(files)
    }

    /// Drop every cached listing.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> StorageClient {
        StorageClient::new(&FirebaseConfig {
            api_key: SecretString::from("test-key"),
            project_id: "rocha-brindes".to_string(),
            storage_bucket: "rocha-brindes.firebasestorage.app".to_string(),
        })
    }

    #[test]
    fn test_download_url_encodes_path() {
        let metadata = ObjectMetadata {
            name: "produtos/canetas/1_caneta azul.webp".to_string(),
            download_tokens: Some("tok-1,tok-2".to_string()),
        };
        assert_eq!(
            client().download_url_for(&metadata).unwrap(),
            "https://firebasestorage.googleapis.com/v0/b/rocha-brindes.firebasestorage.app/o/\
             produtos%2Fcanetas%2F1_caneta%20azul.webp?alt=media&token=tok-1"
        );
    }

    #[test]
    fn test_download_url_without_token() {
        let metadata = ObjectMetadata {
            name: "assets/layout/logo/1.webp".to_string(),
            download_tokens: None,
        };
        let url = client().download_url_for(&metadata).unwrap();
        assert!(url.ends_with("assets%2Flayout%2Flogo%2F1.webp?alt=media"));
    }

    #[test]
    fn test_list_response_parses() {
        let page: ListResponse = serde_json::from_str(
            r#"{
                "prefixes": ["produtos/canetas/", "produtos/copos/"],
                "items": [{"name": "produtos/a.png", "bucket": "b"}],
                "nextPageToken": "abc"
            }"#,
        )
        .unwrap();
        assert_eq!(page.prefixes.len(), 2);
        assert_eq!(page.items[0].name, "produtos/a.png");
        assert_eq!(page.next_page_token.as_deref(), Some("abc"));

        let empty: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.items.is_empty() && empty.prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_cached_listing_is_served_without_request() {
        let client = client();
        let listing = StorageListing {
            folders: vec!["produtos/canetas/".to_string()],
            files: Vec::new(),
        };
        client
            .inner
            .cache
            .insert("produtos/".to_string(), listing.clone())
            .await;

        assert_eq!(client.list("/produtos", None).await.unwrap(), listing);
    }
}
