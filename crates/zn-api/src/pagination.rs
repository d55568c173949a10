// Paginated collection of list endpoints.
//
// Zero Networks list endpoints paginate in one of three ways: a total
// `count` with client-driven `_offset`, a server-driven `nextOffset`, or an
// opaque `scrollCursor`/`nextCursor`. All three collect into a flat list in
// server order; any error aborts the walk.

use std::fmt;

use async_stream::try_stream;
use futures_util::{Stream, TryStreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::ZnClient;
use crate::error::Error;
use crate::query::Query;

pub const DEFAULT_PAGE_SIZE: usize = 400;

pub const LIMIT_PARAM: &str = "_limit";
pub const OFFSET_PARAM: &str = "_offset";
pub const WITH_COUNT_PARAM: &str = "with_count";
pub const CURSOR_PARAM: &str = "_cursor";

// ── Wire shape ───────────────────────────────────────────────────────

/// One page of a list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next_offset: Option<u64>,
    #[serde(default)]
    pub scroll_cursor: Option<Cursor>,
    #[serde(default)]
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn cursor(&self, key: CursorKey) -> Option<&Cursor> {
        match key {
            CursorKey::ScrollCursor => self.scroll_cursor.as_ref(),
            CursorKey::NextCursor => self.next_cursor.as_ref(),
        }
    }
}

/// A continuation token. Activity endpoints use epoch-millisecond integers,
/// others opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cursor {
    Int(i64),
    Text(String),
}

impl Cursor {
    /// `0` and blank strings mean "no more pages".
    pub fn is_exhausted(&self) -> bool {
        match self {
            Self::Int(n) => *n == 0,
            Self::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Which response field carries the next cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorKey {
    #[default]
    ScrollCursor,
    NextCursor,
}

// ── Strategy ─────────────────────────────────────────────────────────

/// How to walk a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStrategy {
    /// Probe `count` with `_limit=1&with_count=true`, then step `_offset`
    /// by `page_size` until `count` items are collected.
    OffsetCount { page_size: usize },
    /// Follow the server's `nextOffset`.
    NextOffset { page_size: usize },
    /// Follow a cursor until it is absent or a page comes back short.
    Cursor {
        page_size: usize,
        cursor_param: String,
        cursor_key: CursorKey,
    },
}

impl Default for PageStrategy {
    fn default() -> Self {
        Self::OffsetCount {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageStrategy {
    pub fn offset(page_size: usize) -> Self {
        Self::OffsetCount { page_size }
    }

    /// `_cursor` / `scrollCursor`, the activity endpoints' convention.
    pub fn cursor(page_size: usize) -> Self {
        Self::Cursor {
            page_size,
            cursor_param: CURSOR_PARAM.to_owned(),
            cursor_key: CursorKey::ScrollCursor,
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            Self::OffsetCount { page_size }
            | Self::NextOffset { page_size }
            | Self::Cursor { page_size, .. } => (*page_size).max(1),
        }
    }
}

// ── Collection ───────────────────────────────────────────────────────

impl ZnClient {
    /// Collect every item of a list endpoint into one `Vec`.
    ///
    /// `query` is sent unchanged on every page; the strategy owns the
    /// paging parameters.
    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        strategy: &PageStrategy,
    ) -> Result<Vec<T>, Error> {
        let page_size = strategy.page_size();
        match strategy {
            PageStrategy::OffsetCount { .. } => self.fetch_offset_count(path, query, page_size).await,
            PageStrategy::NextOffset { .. } => self.fetch_next_offset(path, query, page_size).await,
            PageStrategy::Cursor {
                cursor_param,
                cursor_key,
                ..
            } => {
                self.stream_cursor(path, query.clone(), page_size, cursor_param, *cursor_key)
                    .try_collect()
                    .await
            }
        }
    }

    async fn fetch_offset_count<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        page_size: usize,
    ) -> Result<Vec<T>, Error> {
        let probe_query = query
            .clone()
            .with(LIMIT_PARAM, 1)
            .with(OFFSET_PARAM, 0)
            .with(WITH_COUNT_PARAM, "true");
        let probe: Page<serde::de::IgnoredAny> = self.get_with_params(path, &probe_query).await?;
        let total = probe
            .count
            .map_or(probe.items.len(), |c| usize::try_from(c).unwrap_or(usize::MAX));
        debug!(path, total, page_size, "offset pagination");

        let mut all = Vec::with_capacity(total.min(10_000));
        let mut offset = 0_usize;
        while all.len() < total {
            let page_query = query
                .clone()
                .with(LIMIT_PARAM, page_size)
                .with(OFFSET_PARAM, offset);
            let page: Page<T> = self.get_with_params(path, &page_query).await?;
            if page.items.is_empty() {
                warn!(
                    path,
                    offset,
                    expected = total,
                    received = all.len(),
                    "empty page before reaching reported count"
                );
                break;
            }
            all.extend(page.items);
            offset += page_size;
        }
        Ok(all)
    }

    async fn fetch_next_offset<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Query,
        page_size: usize,
    ) -> Result<Vec<T>, Error> {
        let mut all = Vec::new();
        let mut offset = 0_u64;
        loop {
            let page_query = query
                .clone()
                .with(LIMIT_PARAM, page_size)
                .with(OFFSET_PARAM, offset);
            let page: Page<T> = self.get_with_params(path, &page_query).await?;
            let received = page.items.len();
            all.extend(page.items);

            let collected = u64::try_from(all.len()).unwrap_or(u64::MAX);
            let reached_count = page.count.is_some_and(|c| collected >= c);
            match page.next_offset {
                Some(next) if next > offset && received > 0 && !reached_count => offset = next,
                _ => break,
            }
        }
        debug!(path, total = all.len(), "next-offset pagination complete");
        Ok(all)
    }

    /// Walk a cursor-paginated endpoint, yielding items as pages arrive.
    pub fn stream_cursor<'a, T>(
        &'a self,
        path: &'a str,
        query: Query,
        page_size: usize,
        cursor_param: &'a str,
        cursor_key: CursorKey,
    ) -> impl Stream<Item = Result<T, Error>> + 'a
    where
        T: DeserializeOwned + 'a,
    {
        try_stream! {
            let page_size = page_size.max(1);
            let mut cursor: Option<Cursor> = None;
            let mut pages = 0_usize;
            loop {
                let mut page_query = query.clone().with(LIMIT_PARAM, page_size);
                if let Some(c) = &cursor {
                    page_query.set(cursor_param, c);
                }
                let page: Page<T> = self.get_with_params(path, &page_query).await?;
                pages += 1;

                let received = page.items.len();
                let next = page.cursor(cursor_key).cloned();
                for item in page.items {
                    yield item;
                }

                match next {
                    Some(c) if !c.is_exhausted() && received >= page_size => cursor = Some(c),
                    _ => {
                        debug!(path, pages, "cursor pagination complete");
                        break;
                    }
                }
            }
        }
    }
}

/// Sort by name, descending. Server names sort after workstation names in
/// most estates, so this puts servers first.
pub fn sort_by_name_desc<T, F>(items: &mut [T], name: F)
where
    F: Fn(&T) -> &str,
{
    items.sort_by(|a, b| name(b).cmp(name(a)));
}
