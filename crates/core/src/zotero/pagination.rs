//! Cursor-style pagination over the Zotero web API.
//!
//! A listing is a chain of pages; each page names its successor. The Zotero
//! API conveys the successor in the `Link` response header (`rel="next"`),
//! but [`collect_all_pages`] only sees the [`PageFetcher`] abstraction, so a
//! body-embedded cursor could be swapped in without touching callers.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK};
use tracing::debug;

use crate::errors::RemoteRequestError;

/// One page of a listing plus the URL of the next page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Fetches a single page of `T`s.
#[async_trait]
pub trait PageFetcher<T: Send>: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<Page<T>, RemoteRequestError>;
}

/// Follow `next` links from `first_url` until the chain ends, concatenating
/// items in page order.
///
/// Fails with [`RemoteRequestError::PaginationLoop`] if a page URL repeats,
/// and with the fetcher's error if any page fails.
pub async fn collect_all_pages<T, F>(
    fetcher: &F,
    first_url: &str,
) -> Result<Vec<T>, RemoteRequestError>
where
    T: Send,
    F: PageFetcher<T> + ?Sized,
{
    let mut items = Vec::new();
    let mut visited = HashSet::new();
    let mut url = first_url.to_string();
    let mut pages = 0usize;

    loop {
        if !visited.insert(url.clone()) {
            return Err(RemoteRequestError::PaginationLoop(url));
        }
        let page = fetcher.fetch_page(&url).await?;
        pages += 1;
        items.extend(page.items);
        match page.next {
            Some(next) => url = next,
            None => break,
        }
    }

    debug!(pages, count = items.len(), first_url, "collected paginated listing");
    Ok(items)
}

/// Parse an RFC 8288 `Link` header value into a relation → URL map.
///
/// Handles quoted and bare `rel` values and space-separated relation lists.
/// Commas and semicolons inside `<...>` or quoted parameter values do not
/// split entries. When a relation appears twice, the first URL wins.
pub fn parse_link_header(value: &str) -> HashMap<String, String> {
    let mut links = HashMap::new();

    for entry in split_unquoted(value, ',') {
        let entry = entry.trim();
        let Some(after) = entry.strip_prefix('<') else {
            continue;
        };
        let Some(end) = after.find('>') else {
            continue;
        };
        let url = after[..end].trim();

        for param in split_unquoted(&after[end + 1..], ';') {
            let Some((name, val)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            let val = val.trim();
            let val = val
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(val);
            for rel in val.split_whitespace() {
                links
                    .entry(rel.to_ascii_lowercase())
                    .or_insert_with(|| url.to_string());
            }
        }
    }

    links
}

/// Split `value` on `sep`, ignoring separators inside `<...>` targets and
/// double-quoted strings (with backslash escapes).
fn split_unquoted(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_target = false;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        if in_quotes {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_quotes = false,
                _ => {}
            }
            continue;
        }
        match c {
            '<' if !in_target => in_target = true,
            '>' if in_target => in_target = false,
            '"' if !in_target => in_quotes = true,
            _ if c == sep && !in_target => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

/// The `next` relation across all `Link` headers of a response.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| parse_link_header(v).remove("next"))
}
