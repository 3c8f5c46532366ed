//! One-way Zotero → tablet synchronization engine.
//!
//! The [`SyncEngine`] runs a single linear pass:
//!
//! 1. Scan the tablet library for folders and documents with stored PDFs.
//! 2. List the Zotero collections.
//! 3. Join folders and collections by exact name.
//! 4. For each matched pair, list the collection's PDFs and plan the missing ones.
//! 5. Download each planned file and upload it to the tablet.
//!
//! The first error aborts the pass; nothing already uploaded is rolled back
//! and the next pass starts from scratch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::errors::{ConfigError, CoreError};
use crate::matcher::match_collections;
use crate::models::{PassStats, PresenceSet};
use crate::planner::plan;
use crate::remarkable::{LocalLibrary, XochitlLibrary};
use crate::transfer::{
    http_transferor, FileSource, HttpFileSource, IngestSink, TabletUploader, Transferor,
};
use crate::zotero::{RemoteCatalog, ZoteroClient};

// ---------------------------------------------------------------------------
// Pass state machine
// ---------------------------------------------------------------------------

/// Phases of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    ReadingLocal,
    ListingCollections,
    Matching,
    Planning,
    Transferring,
    Done,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadingLocal => write!(f, "reading_local"),
            Self::ListingCollections => write!(f, "listing_collections"),
            Self::Matching => write!(f, "matching"),
            Self::Planning => write!(f, "planning"),
            Self::Transferring => write!(f, "transferring"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Something that can run one sync pass.
#[async_trait]
pub trait SyncPass: Send + Sync {
    async fn run_pass(&self) -> Result<PassStats, CoreError>;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Engine over an arbitrary library, catalog, and transfer pair.
pub struct SyncEngine<L, C, S, K> {
    library: L,
    catalog: C,
    transferor: Transferor<S, K>,
    /// Set while a pass is in flight.
    running: Arc<AtomicBool>,
}

/// The engine as deployed: xochitl on disk, Zotero and the tablet over HTTP.
pub type HttpSyncEngine =
    SyncEngine<XochitlLibrary, ZoteroClient, HttpFileSource, TabletUploader>;

impl<L, C, S, K> SyncEngine<L, C, S, K>
where
    L: LocalLibrary,
    C: RemoteCatalog,
    S: FileSource,
    K: IngestSink,
{
    pub fn new(library: L, catalog: C, transferor: Transferor<S, K>) -> Self {
        info!("initializing sync engine");
        Self {
            library,
            catalog,
            transferor,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn enter(&self, state: SyncState) {
        debug!(%state, "sync pass state");
    }

    async fn do_pass(&self, stats: &mut PassStats) -> Result<(), CoreError> {
        self.enter(SyncState::ReadingLocal);
        let snapshot = self.library.scan()?;
        let presence = PresenceSet::from_documents(&snapshot.documents);
        stats.folders_scanned = snapshot.folders.len();
        stats.documents_present = presence.len();

        self.enter(SyncState::ListingCollections);
        let collections = self.catalog.list_collections().await?;
        stats.collections_listed = collections.len();

        self.enter(SyncState::Matching);
        let pairs = match_collections(&snapshot.folders, &collections);
        stats.pairs_matched = pairs.len();
        debug!(pairs = pairs.len(), "matched folders to collections");

        for pair in &pairs {
            self.enter(SyncState::Planning);
            let items = self.catalog.list_file_items(&pair.collection.key).await?;
            let planned = plan(pair, &items, &presence);
            stats.files_planned += planned.len();

            self.enter(SyncState::Transferring);
            for file in &planned {
                let receipt = self.transferor.transfer(file).await?;
                stats.files_transferred += 1;
                stats.bytes_transferred += receipt.bytes;
            }
        }

        self.enter(SyncState::Done);
        Ok(())
    }
}

#[async_trait]
impl<L, C, S, K> SyncPass for SyncEngine<L, C, S, K>
where
    L: LocalLibrary,
    C: RemoteCatalog,
    S: FileSource,
    K: IngestSink,
{
    /// Execute one full pass, returning what it did.
    ///
    /// Fails with [`CoreError::PassInProgress`] if another pass on this
    /// engine has not finished.
    async fn run_pass(&self) -> Result<PassStats, CoreError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CoreError::PassInProgress);
        }
        let _guard = PassLockGuard(self.running.clone());

        let mut stats = PassStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };
        let result = self.do_pass(&mut stats).await;
        stats.completed_at = Some(Utc::now());

        if result.is_ok() {
            info!(
                pairs = stats.pairs_matched,
                planned = stats.files_planned,
                transferred = stats.files_transferred,
                bytes = stats.bytes_transferred,
                "sync pass complete"
            );
        }
        result.map(|()| stats)
    }
}

/// Build the HTTP-backed engine described by a resolved configuration.
pub fn build_http_engine(config: &SyncConfig) -> Result<HttpSyncEngine, ConfigError> {
    let http = config.http.build_client()?;
    let library = XochitlLibrary::new(config.tablet.library_dir.clone());
    let catalog = ZoteroClient::from_config(http.clone(), config)?;
    let transferor = http_transferor(http, config);
    Ok(SyncEngine::new(library, catalog, transferor))
}

/// Clears the run flag on drop, even if the pass panics.
struct PassLockGuard(Arc<AtomicBool>);

impl Drop for PassLockGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
