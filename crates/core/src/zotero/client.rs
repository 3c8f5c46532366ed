//! Zotero web API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::{SyncConfig, ZoteroCredentials};
use crate::errors::{ConfigError, RemoteRequestError};
use crate::models::{RemoteCollection, RemoteFileItem};
use crate::zotero::pagination::{collect_all_pages, next_link, Page, PageFetcher};
use crate::zotero::RemoteCatalog;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "Zotero-API-Key";
/// Header pinning the API version.
pub const API_VERSION_HEADER: &str = "Zotero-API-Version";
pub const API_VERSION: &str = "3";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroCollection {
    pub key: String,
    pub data: ZoteroCollectionData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoteroCollectionData {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoteroItem {
    pub key: String,
    pub data: ZoteroItemData,
}

/// Attachment fields of an item. Regular (non-attachment) items decode with
/// these left empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoteroItemData {
    #[serde(default)]
    pub item_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub url: String,
}

impl From<ZoteroCollection> for RemoteCollection {
    fn from(c: ZoteroCollection) -> Self {
        Self {
            key: c.key,
            name: c.data.name,
        }
    }
}

impl From<ZoteroItem> for RemoteFileItem {
    fn from(i: ZoteroItem) -> Self {
        Self {
            key: i.key,
            filename: i.data.filename,
            content_type: i.data.content_type,
            download_url: i.data.url,
        }
    }
}

/// Keep only PDF attachments that carry a download URL, in listing order.
pub fn document_files(items: Vec<ZoteroItem>) -> Vec<RemoteFileItem> {
    items
        .into_iter()
        .map(RemoteFileItem::from)
        .filter(|item| item.is_document_file())
        .filter(|item| {
            if item.download_url.is_empty() {
                warn!(
                    key = %item.key,
                    filename = %item.filename,
                    "PDF attachment has no url, skipping"
                );
                false
            } else {
                true
            }
        })
        .collect()
}

/// Asynchronous Zotero web API client scoped to one user library.
#[derive(Clone)]
pub struct ZoteroClient {
    http: reqwest::Client,
    api_url: String,
    credentials: ZoteroCredentials,
}

impl ZoteroClient {
    pub fn new(
        http: reqwest::Client,
        api_url: impl Into<String>,
        credentials: ZoteroCredentials,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        info!(api_url = %api_url, user_id = %credentials.user_id, "created ZoteroClient");
        Self {
            http,
            api_url,
            credentials,
        }
    }

    /// Build a client from resolved configuration, sharing `http`.
    pub fn from_config(http: reqwest::Client, config: &SyncConfig) -> Result<Self, ConfigError> {
        let credentials = config.zotero.credentials()?;
        Ok(Self::new(http, config.zotero.api_url.clone(), credentials))
    }

    pub fn collections_url(&self) -> String {
        format!(
            "{}/users/{}/collections",
            self.api_url, self.credentials.user_id
        )
    }

    pub fn collection_items_url(&self, collection_key: &str) -> String {
        format!(
            "{}/users/{}/collections/{}/items",
            self.api_url, self.credentials.user_id, collection_key
        )
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Page<T>, RemoteRequestError> {
        let resp = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.credentials.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await?;
        Self::check_response(url, resp.status())?;

        let next = next_link(resp.headers());
        let body = resp.bytes().await?;
        let items: Vec<T> =
            serde_json::from_slice(&body).map_err(|e| RemoteRequestError::ParseError {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        debug!(url, count = items.len(), has_next = next.is_some(), "fetched page");
        Ok(Page { items, next })
    }

    fn check_response(url: &str, status: StatusCode) -> Result<(), RemoteRequestError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RemoteRequestError::AuthenticationFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(RemoteRequestError::ApiError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<T> PageFetcher<T> for ZoteroClient
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, url: &str) -> Result<Page<T>, RemoteRequestError> {
        self.get_page(url).await
    }
}

#[async_trait]
impl RemoteCatalog for ZoteroClient {
    #[instrument(skip(self))]
    async fn list_collections(&self) -> Result<Vec<RemoteCollection>, RemoteRequestError> {
        let url = self.collections_url();
        let raw = collect_all_pages::<ZoteroCollection, _>(self, &url).await?;
        let collections: Vec<RemoteCollection> = raw.into_iter().map(Into::into).collect();
        debug!(count = collections.len(), "listed collections");
        Ok(collections)
    }

    #[instrument(skip(self))]
    async fn list_file_items(
        &self,
        collection_key: &str,
    ) -> Result<Vec<RemoteFileItem>, RemoteRequestError> {
        let url = self.collection_items_url(collection_key);
        let raw = collect_all_pages::<ZoteroItem, _>(self, &url).await?;
        let total = raw.len();
        let files = document_files(raw);
        debug!(total, pdfs = files.len(), "listed collection items");
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

    fn creds() -> ZoteroCredentials {
        ZoteroCredentials {
            user_id: "12345".into(),
            api_key: "secret".into(),
        }
    }

    fn item(key: &str, content_type: &str, filename: &str, url: &str) -> ZoteroItem {
        ZoteroItem {
            key: key.into(),
            data: ZoteroItemData {
                item_type: "attachment".into(),
                content_type: content_type.into(),
                filename: filename.into(),
                url: url.into(),
            },
        }
    }

    #[test]
    fn test_urls() {
        let client =
            ZoteroClient::new(reqwest::Client::new(), "https://api.zotero.org/", creds());
        assert_eq!(
            client.collections_url(),
            "https://api.zotero.org/users/12345/collections"
        );
        assert_eq!(
            client.collection_items_url("ABCD1234"),
            "https://api.zotero.org/users/12345/collections/ABCD1234/items"
        );
    }

    #[test]
    fn test_decode_collection_listing() {
        let json = r#"[
            {"key": "C1", "version": 4, "library": {"type": "user"},
             "data": {"key": "C1", "name": "Papers", "parentCollection": false}},
            {"key": "C2", "data": {"name": "Books"}}
        ]"#;
        let raw: Vec<ZoteroCollection> = serde_json::from_str(json).unwrap();
        let collections: Vec<RemoteCollection> = raw.into_iter().map(Into::into).collect();
        assert_eq!(
            collections,
            vec![
                RemoteCollection {
                    key: "C1".into(),
                    name: "Papers".into(),
                },
                RemoteCollection {
                    key: "C2".into(),
                    name: "Books".into(),
                },
            ]
        );
    }

    #[test]
    fn test_decode_items_with_missing_attachment_fields() {
        let json = r#"[
            {"key": "I1", "data": {"itemType": "journalArticle", "title": "On Things"}},
            {"key": "I2", "data": {
                "itemType": "attachment",
                "contentType": "application/pdf",
                "filename": "a.pdf",
                "url": "https://files.example/a.pdf"
            }}
        ]"#;
        let raw: Vec<ZoteroItem> = serde_json::from_str(json).unwrap();
        let files = document_files(raw);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, "I2");
        assert_eq!(files[0].download_url, "https://files.example/a.pdf");
    }

    #[test]
    fn test_document_files_filters_non_pdf_and_preserves_order() {
        let items = vec![
            item("1", "application/pdf", "a.pdf", "u1"),
            item("2", DOCX, "b.docx", "u2"),
            item("3", "application/pdf", "c.pdf", "u3"),
            item("4", "application/pdf", "d.pdf", ""),
        ];
        let files = document_files(items);
        let names: Vec<&str> = files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf"]);
    }

    #[test]
    fn test_check_response() {
        assert!(ZoteroClient::check_response("u", StatusCode::OK).is_ok());
        assert!(matches!(
            ZoteroClient::check_response("u", StatusCode::FORBIDDEN),
            Err(RemoteRequestError::AuthenticationFailed { status: 403, .. })
        ));
        assert!(matches!(
            ZoteroClient::check_response("u", StatusCode::UNAUTHORIZED),
            Err(RemoteRequestError::AuthenticationFailed { status: 401, .. })
        ));
        assert!(matches!(
            ZoteroClient::check_response("u", StatusCode::INTERNAL_SERVER_ERROR),
            Err(RemoteRequestError::ApiError { status: 500, .. })
        ));
    }
}
