//! Paged access to media.
//!
//! [`MediaPagingSource`] serves forward-only `(offset, limit)` windows of one
//! album's media. [`MediaPager`] drives a source for a scrolling consumer,
//! swapping in a fresh source starting at offset 0 whenever the index
//! changes underneath it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::Result;
use crate::filters::media_query_args;
use crate::index::{ChangeSubscription, SharedIndex};
use crate::mapper::media_from_cursor;
use crate::models::{AlbumKind, ContentUri, Media};
use crate::platform::PlatformCapabilities;

/// Page sizes used by [`MediaPager`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default = "default_initial_load_size")]
    pub initial_load_size: usize,
}

fn default_page_size() -> usize {
    20
}

fn default_initial_load_size() -> usize {
    100
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            initial_load_size: default_initial_load_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadParams {
    /// Offset to start at; `None` means the beginning.
    pub key: Option<usize>,
    pub load_size: usize,
}

/// One window of media.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Page {
    pub data: Vec<Media>,
    /// Always `None`: paging only moves forward.
    pub prev_key: Option<usize>,
    /// Offset of the following page, present while more rows may exist.
    pub next_key: Option<usize>,
}

/// Pages loaded so far and where the consumer is looking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingState {
    pub pages: Vec<Page>,
    /// Index of the item at the viewport anchor, across all pages.
    pub anchor_position: Option<usize>,
}

impl PagingState {
    /// Index of the page holding `position`, or the last page past the end.
    pub fn closest_page_index(&self, position: usize) -> Option<usize> {
        if self.pages.is_empty() {
            return None;
        }
        let mut start = 0;
        for (index, page) in self.pages.iter().enumerate() {
            start += page.data.len();
            if position < start {
                return Some(index);
            }
        }
        Some(self.pages.len() - 1)
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.data.len()).sum()
    }
}

/// Serves windows of one album's media.
pub struct MediaPagingSource {
    index: SharedIndex,
    album: AlbumKind,
    capabilities: PlatformCapabilities,
    invalid: AtomicBool,
}

impl MediaPagingSource {
    pub fn new(index: SharedIndex, album: AlbumKind, capabilities: PlatformCapabilities) -> Self {
        Self {
            index,
            album,
            capabilities,
            invalid: AtomicBool::new(false),
        }
    }

    /// Load `params.load_size` items starting at `params.key`.
    ///
    /// Query failures yield an empty final page; only schema mismatches are
    /// returned as errors.
    pub async fn load(&self, params: LoadParams) -> Result<Page> {
        let offset = params.key.unwrap_or(0);
        let limit = params.load_size;

        let mut args = media_query_args(self.album, self.capabilities);
        args.limit = Some(limit);
        args.offset = Some(offset);

        let index = self.index.clone();
        let album = self.album;
        let joined = tokio::task::spawn_blocking(move || {
            let cursor = match index.query(&ContentUri::FILES, &args) {
                Ok(cursor) => cursor,
                Err(e) => {
                    tracing::warn!(album = ?album, offset, error = %e, "Page query failed");
                    None
                }
            };
            media_from_cursor(cursor.as_ref())
        })
        .await;

        let data = match joined {
            Ok(Ok(data)) => data,
            Ok(Err(e)) if e.is_fatal() => return Err(e),
            Ok(Err(e)) => {
                tracing::warn!(album = ?self.album, error = %e, "Failed to map page");
                Vec::new()
            }
            Err(e) => {
                tracing::error!(album = ?self.album, error = %e, "Page task failed");
                Vec::new()
            }
        };

        let next_key = (!data.is_empty() && data.len() >= limit).then(|| offset + data.len());
        tracing::debug!(
            album = ?self.album,
            offset,
            limit,
            size = data.len(),
            next = ?next_key,
            "Loaded page"
        );

        Ok(Page {
            data,
            prev_key: None,
            next_key,
        })
    }

    /// Key to reload from when the consumer's anchor moves.
    ///
    /// The following page's `prev_key` if any, else the preceding page's
    /// `next_key`, which is where the anchor page starts. `None` restarts
    /// from the beginning.
    pub fn refresh_key(&self, state: &PagingState) -> Option<usize> {
        let anchor = state.anchor_position?;
        let anchor_page = state.closest_page_index(anchor)?;
        state
            .pages
            .get(anchor_page + 1)
            .and_then(|p| p.prev_key)
            .or_else(|| {
                anchor_page
                    .checked_sub(1)
                    .and_then(|i| state.pages.get(i))
                    .and_then(|p| p.next_key)
            })
    }

    /// Mark this source stale; the pager replaces it on the next load.
    pub fn invalidate(&self) {
        if !self.invalid.swap(true, Ordering::SeqCst) {
            tracing::debug!(album = ?self.album, "Paging source invalidated");
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid.load(Ordering::SeqCst)
    }
}

/// What a pager load produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerEvent {
    /// First page of a fresh source; replaces everything loaded before.
    Refresh(Page),
    /// Next page of the current source.
    Append(Page),
}

impl PagerEvent {
    pub fn page(&self) -> &Page {
        match self {
            PagerEvent::Refresh(page) | PagerEvent::Append(page) => page,
        }
    }
}

/// Drives paging for one album and reacts to index changes.
pub struct MediaPager {
    index: SharedIndex,
    album: AlbumKind,
    capabilities: PlatformCapabilities,
    config: PagingConfig,
    current: Arc<Mutex<Option<Arc<MediaPagingSource>>>>,
    state: PagingState,
    generation: watch::Receiver<u64>,
    _guard: DropGuard,
}

impl MediaPager {
    /// Must be called within a Tokio runtime.
    pub fn new(
        index: SharedIndex,
        album: AlbumKind,
        capabilities: PlatformCapabilities,
        config: PagingConfig,
    ) -> Self {
        let token = CancellationToken::new();
        let current: Arc<Mutex<Option<Arc<MediaPagingSource>>>> = Arc::new(Mutex::new(None));
        let (tx, generation) = watch::channel(0);

        let subscription = index.subscribe(&ContentUri::FILES, token.clone());
        tokio::spawn(watch_invalidations(subscription, current.clone(), tx));

        Self {
            index,
            album,
            capabilities,
            config,
            current,
            state: PagingState::default(),
            generation,
            _guard: token.drop_guard(),
        }
    }

    /// Load the next page, starting over from offset 0 after an invalidation.
    ///
    /// Returns `Ok(None)` once the end is reached and nothing changed since.
    pub async fn load_next(&mut self) -> Result<Option<PagerEvent>> {
        let source = self.current_source();
        let stale = source.as_ref().map_or(true, |s| s.is_invalid());

        if stale {
            let source = Arc::new(MediaPagingSource::new(
                self.index.clone(),
                self.album,
                self.capabilities,
            ));
            *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(source.clone());
            let page = source
                .load(LoadParams {
                    key: None,
                    load_size: self.config.initial_load_size,
                })
                .await?;
            self.state.pages = vec![page.clone()];
            return Ok(Some(PagerEvent::Refresh(page)));
        }

        let Some(source) = source else {
            return Ok(None);
        };
        let Some(next_key) = self.state.pages.last().and_then(|p| p.next_key) else {
            return Ok(None);
        };
        let page = source
            .load(LoadParams {
                key: Some(next_key),
                load_size: self.config.page_size,
            })
            .await?;
        self.state.pages.push(page.clone());
        Ok(Some(PagerEvent::Append(page)))
    }

    /// Invalidate the current source so the next load starts over.
    pub fn refresh(&self) {
        if let Some(source) = self.current_source() {
            source.invalidate();
        }
    }

    pub fn set_anchor(&mut self, position: usize) {
        self.state.anchor_position = Some(position);
    }

    /// Refresh key of the current source for the loaded pages.
    pub fn refresh_key(&self) -> Option<usize> {
        self.current_source()
            .and_then(|source| source.refresh_key(&self.state))
    }

    pub fn state(&self) -> &PagingState {
        &self.state
    }

    /// Whether the current source has been invalidated since it was loaded.
    pub fn is_stale(&self) -> bool {
        self.current_source().map_or(true, |s| s.is_invalid())
    }

    /// Coalesced invalidation signal: yields the latest generation number each
    /// time the index changes after this call.
    pub fn invalidations(&self) -> WatchStream<u64> {
        WatchStream::from_changes(self.generation.clone())
    }

    fn current_source(&self) -> Option<Arc<MediaPagingSource>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

async fn watch_invalidations(
    mut subscription: ChangeSubscription,
    current: Arc<Mutex<Option<Arc<MediaPagingSource>>>>,
    generation: watch::Sender<u64>,
) {
    while subscription.changed().await {
        let source = current.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(source) = source {
            source.invalidate();
        }
        generation.send_modify(|g| *g += 1);
    }
}
