//! Remote reference-manager catalog.

pub mod client;
pub mod pagination;

use async_trait::async_trait;

use crate::errors::RemoteRequestError;
use crate::models::{RemoteCollection, RemoteFileItem};

pub use client::ZoteroClient;
pub use pagination::{collect_all_pages, parse_link_header, Page, PageFetcher};

/// Read access to the remote collections and their file attachments.
///
/// Both listings are complete (every page followed) or fail as a whole.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<RemoteCollection>, RemoteRequestError>;

    /// PDF attachments of one collection, in listing order.
    async fn list_file_items(
        &self,
        collection_key: &str,
    ) -> Result<Vec<RemoteFileItem>, RemoteRequestError>;
}
