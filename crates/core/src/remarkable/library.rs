//! Read-only view of the tablet's document library.

use std::path::PathBuf;

use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::errors::LocalReadError;
use crate::models::{LibrarySnapshot, LocalDocument, LocalFolder};
use crate::remarkable::metadata::{is_metadata_file, parse_metadata, stored_file_path, RecordKind};

/// Source of the tablet's folders and documents.
///
/// Implementations must fail the whole listing on any read error rather than
/// returning a partial result.
pub trait LocalLibrary: Send + Sync {
    /// Classify every record in one walk.
    fn scan(&self) -> Result<LibrarySnapshot, LocalReadError>;

    fn list_folders(&self) -> Result<Vec<LocalFolder>, LocalReadError> {
        Ok(self.scan()?.folders)
    }

    fn list_documents_with_files(&self) -> Result<Vec<LocalDocument>, LocalReadError> {
        Ok(self
            .scan()?
            .documents
            .into_iter()
            .filter(|d| d.has_attached_file)
            .collect())
    }
}

/// The xochitl store: a directory of `<uuid>.metadata` JSON records, with a
/// document's PDF stored as `<uuid>.pdf` beside its record.
#[derive(Debug, Clone)]
pub struct XochitlLibrary {
    root: PathBuf,
}

impl XochitlLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// All metadata record paths under the root, in file-name order.
    fn metadata_paths(&self) -> Result<Vec<PathBuf>, LocalReadError> {
        if !self.root.is_dir() {
            return Err(LocalReadError::LibraryNotFound(
                self.root.display().to_string(),
            ));
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_metadata_file(entry.path()) {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

impl LocalLibrary for XochitlLibrary {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn scan(&self) -> Result<LibrarySnapshot, LocalReadError> {
        let mut snapshot = LibrarySnapshot::default();

        for path in self.metadata_paths()? {
            let bytes = std::fs::read(&path).map_err(|source| LocalReadError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let record = parse_metadata(&path, &bytes)?;

            match record.kind() {
                RecordKind::Folder => snapshot.folders.push(LocalFolder {
                    identifier: path,
                    display_name: record.visible_name,
                }),
                RecordKind::Document => {
                    let stored = stored_file_path(&path);
                    let has_attached_file =
                        stored.try_exists().map_err(|source| LocalReadError::Io {
                            path: stored.display().to_string(),
                            source,
                        })?;
                    debug!(
                        name = %record.visible_name,
                        has_attached_file,
                        "classified document"
                    );
                    snapshot.documents.push(LocalDocument {
                        identifier: path,
                        display_name: record.visible_name,
                        has_attached_file,
                    });
                }
                RecordKind::Other => {}
            }
        }

        info!(
            folders = snapshot.folders.len(),
            documents = snapshot.documents.len(),
            with_files = snapshot.documents_with_files().count(),
            "scanned tablet library"
        );
        Ok(snapshot)
    }
}
