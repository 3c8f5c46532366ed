//! Computes which remote files are missing from the tablet.

use tracing::debug;

use crate::models::{FileToTransfer, MatchedPair, PresenceSet, RemoteFileItem};

/// Files of `pair`'s collection that are not present anywhere on the tablet,
/// in source order.
pub fn plan(
    pair: &MatchedPair,
    items: &[RemoteFileItem],
    presence: &PresenceSet,
) -> Vec<FileToTransfer> {
    let planned: Vec<FileToTransfer> = items
        .iter()
        .filter(|item| !presence.contains(&item.filename))
        .map(|item| FileToTransfer {
            filename: item.filename.clone(),
            source_url: item.download_url.clone(),
        })
        .collect();

    debug!(
        collection = %pair.collection.name,
        remote = items.len(),
        missing = planned.len(),
        "planned transfers"
    );
    planned
}
