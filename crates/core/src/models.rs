//! Domain model types shared by the library reader, catalog client, planner,
//! and sync engine.
//!
//! Everything here is rebuilt from scratch on every sync pass; nothing is
//! persisted.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type of the attachments that are pushed to the tablet.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

// ---------------------------------------------------------------------------
// Local (tablet) side
// ---------------------------------------------------------------------------

/// A folder on the tablet (`CollectionType` record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFolder {
    /// Path of the folder's `.metadata` record.
    pub identifier: PathBuf,
    pub display_name: String,
}

/// A document on the tablet (`DocumentType` record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDocument {
    /// Path of the document's `.metadata` record.
    pub identifier: PathBuf,
    pub display_name: String,
    /// Whether `<record>.pdf` exists next to the metadata record.
    pub has_attached_file: bool,
}

/// Result of a single walk over the tablet library.
#[derive(Debug, Clone, Default)]
pub struct LibrarySnapshot {
    pub folders: Vec<LocalFolder>,
    pub documents: Vec<LocalDocument>,
}

impl LibrarySnapshot {
    /// Documents that already carry a stored PDF.
    pub fn documents_with_files(&self) -> impl Iterator<Item = &LocalDocument> {
        self.documents.iter().filter(|d| d.has_attached_file)
    }
}

/// Library-wide set of document names that already have a stored file.
///
/// The set is global rather than per folder: a document named `x.pdf`
/// anywhere on the tablet suppresses every remote `x.pdf`.
#[derive(Debug, Clone, Default)]
pub struct PresenceSet {
    names: HashSet<String>,
}

impl PresenceSet {
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a LocalDocument>,
    {
        let names = documents
            .into_iter()
            .filter(|d| d.has_attached_file)
            .map(|d| d.display_name.clone())
            .collect();
        Self { names }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Remote (Zotero) side
// ---------------------------------------------------------------------------

/// A named collection in the Zotero library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCollection {
    pub key: String,
    pub name: String,
}

/// A file attachment belonging to a Zotero collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileItem {
    pub key: String,
    pub filename: String,
    pub content_type: String,
    pub download_url: String,
}

impl RemoteFileItem {
    /// Whether the attachment is a PDF document.
    pub fn is_document_file(&self) -> bool {
        self.content_type == PDF_CONTENT_TYPE
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// A local folder joined to the remote collection of the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedPair {
    pub folder: LocalFolder,
    pub collection: RemoteCollection,
}

/// A remote file that is missing locally and must be pushed to the tablet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToTransfer {
    pub filename: String,
    pub source_url: String,
}

// ---------------------------------------------------------------------------
// Pass statistics
// ---------------------------------------------------------------------------

/// Summary of one completed sync pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassStats {
    pub folders_scanned: usize,
    pub documents_present: usize,
    pub collections_listed: usize,
    pub pairs_matched: usize,
    pub files_planned: usize,
    pub files_transferred: usize,
    pub bytes_transferred: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
