//! Parser for xochitl `.metadata` sidecar records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::errors::LocalReadError;

/// File extension of metadata records.
pub const METADATA_EXTENSION: &str = "metadata";

/// Extension of the stored PDF next to a document record.
pub const STORED_FILE_EXTENSION: &str = "pdf";

/// One xochitl metadata record.
///
/// Only `type` and `visibleName` drive classification; the remaining fields
/// are decoded so that malformed records are still detected. A field that is
/// missing or explicitly `null` takes its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub record_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub visible_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub deleted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_modified: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinned: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub synced: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: i64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Record kinds known to the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Folder,
    Document,
    Other,
}

impl MetadataRecord {
    pub fn kind(&self) -> RecordKind {
        match self.record_type.as_str() {
            "CollectionType" => RecordKind::Folder,
            "DocumentType" => RecordKind::Document,
            _ => RecordKind::Other,
        }
    }
}

/// Decode a metadata record from its raw JSON bytes.
pub fn parse_metadata(path: &Path, bytes: &[u8]) -> Result<MetadataRecord, LocalReadError> {
    let record: MetadataRecord =
        serde_json::from_slice(bytes).map_err(|source| LocalReadError::Decode {
            path: path.display().to_string(),
            source,
        })?;
    debug!(path = %path.display(), kind = ?record.kind(), "parsed metadata record");
    Ok(record)
}

/// `<record path without extension>.pdf`
pub fn stored_file_path(metadata_path: &Path) -> PathBuf {
    metadata_path.with_extension(STORED_FILE_EXTENSION)
}

/// Whether the path names a metadata record.
pub fn is_metadata_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(METADATA_EXTENSION)
}
