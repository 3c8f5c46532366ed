//! Joins tablet folders to Zotero collections by exact display name.

use std::collections::HashMap;

use crate::models::{LocalFolder, MatchedPair, RemoteCollection};

/// Pair every remote collection with the local folder of the same name.
///
/// Names compare byte-for-byte (no case folding or trimming). When several
/// local folders share a name, the first one listed is used. Output follows
/// the order of `collections`.
pub fn match_collections(
    folders: &[LocalFolder],
    collections: &[RemoteCollection],
) -> Vec<MatchedPair> {
    let mut by_name: HashMap<&str, &LocalFolder> = HashMap::with_capacity(folders.len());
    for folder in folders {
        by_name.entry(folder.display_name.as_str()).or_insert(folder);
    }

    collections
        .iter()
        .filter_map(|collection| {
            by_name
                .get(collection.name.as_str())
                .map(|folder| MatchedPair {
                    folder: (*folder).clone(),
                    collection: collection.clone(),
                })
        })
        .collect()
}
