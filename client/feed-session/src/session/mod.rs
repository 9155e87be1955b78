//! Feed session controller
//!
//! A session owns one paginated list of [`ContentItem`]s, a cursor into it
//! and the filters that produced it. Filter changes refetch from the remote
//! store; cursor moves only re-index what is already loaded.
//!
//! Loads may overlap (a category tap while a search is still in flight).
//! Every load takes a monotonically increasing request id and only the most
//! recently issued one may write its result. After [`FeedSession::close`]
//! no result is applied at all.

mod engagement;

pub use engagement::LikeOutcome;

use crate::models::normalize::{Normalizer, DEFAULT_PLACEHOLDER_THUMBNAIL};
use crate::models::{Category, ContentItem, FeedSource, LoadingState, SessionState};
use crate::notify::{Notification, Notifier, Viewer};
use crate::search;
use error_types::ServiceResult;
use parking_lot::Mutex;
use remote_store::{ProfileRecord, RemoteStore, VideoOrder, VideoQuery, MAX_PAGE_SIZE};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Tunables for a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Rows per load, clamped to `1..=100`
    pub page_size: usize,
    pub placeholder_thumbnail: String,
    /// Collection variant shown before any `show_*` call
    pub source: FeedSource,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            placeholder_thumbnail: DEFAULT_PLACEHOLDER_THUMBNAIL.to_string(),
            source: FeedSource::Recent,
        }
    }
}

/// Last list loaded without a search, restored when the search is cleared
struct BrowseCache {
    category: Category,
    source: FeedSource,
    items: Vec<ContentItem>,
}

struct Shared {
    state: SessionState,
    browse: Option<BrowseCache>,
}

impl Shared {
    /// Visit every loaded copy of an item (current list and browse cache)
    fn for_each_item_mut(&mut self, id: &str, mut f: impl FnMut(&mut ContentItem)) {
        if let Some(item) = self.state.item_mut(id) {
            f(item);
        }
        if let Some(cache) = self.browse.as_mut() {
            if let Some(item) = cache.items.iter_mut().find(|item| item.id == id) {
                f(item);
            }
        }
    }
}

struct Page {
    items: Vec<ContentItem>,
    liked: HashSet<String>,
}

struct Inner {
    store: Arc<dyn RemoteStore>,
    viewer: Viewer,
    notifier: Arc<dyn Notifier>,
    normalizer: Normalizer,
    page_size: usize,
    shared: Mutex<Shared>,
    latest_request: AtomicU64,
    closed: AtomicBool,
}

/// Feed session; clones share the same session
#[derive(Clone)]
pub struct FeedSession {
    inner: Arc<Inner>,
}

impl FeedSession {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        viewer: Viewer,
        notifier: Arc<dyn Notifier>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                viewer,
                notifier,
                normalizer: Normalizer::new(options.placeholder_thumbnail),
                page_size: options.page_size.clamp(1, MAX_PAGE_SIZE),
                shared: Mutex::new(Shared {
                    state: SessionState {
                        source: options.source,
                        ..Default::default()
                    },
                    browse: None,
                }),
                latest_request: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.inner.viewer
    }

    pub fn page_size(&self) -> usize {
        self.inner.page_size
    }

    /// Snapshot of the session state
    pub fn state(&self) -> SessionState {
        self.inner.shared.lock().state.clone()
    }

    /// Item under the cursor
    pub fn current(&self) -> Option<ContentItem> {
        self.inner.shared.lock().state.current().cloned()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Unmount: results of loads still in flight are dropped
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            debug!("feed session closed");
        }
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load the first page for `category`, optionally filtered by `query`
    pub async fn load(&self, category: Category, query: Option<&str>) -> SessionState {
        {
            let mut shared = self.inner.shared.lock();
            shared.state.active_category = category;
            shared.state.search_query = query.and_then(normalize_query);
        }
        self.run_load().await
    }

    /// Change the category; an active search stays applied
    pub async fn filter_by_category(&self, category: Category) -> SessionState {
        self.inner.shared.lock().state.active_category = category;
        self.run_load().await
    }

    /// Search within the active category
    ///
    /// A blank query clears the search and puts back the last list loaded
    /// for this category without going to the network.
    pub async fn search(&self, query: &str) -> SessionState {
        match normalize_query(query) {
            Some(query) => {
                self.inner.shared.lock().state.search_query = Some(query);
                self.run_load().await
            }
            None => match self.restore_browse() {
                Some(state) => state,
                None => self.run_load().await,
            },
        }
    }

    /// Reload with the current filters
    pub async fn refresh(&self) -> SessionState {
        self.run_load().await
    }

    pub async fn show_recent(&self) -> SessionState {
        self.set_source(FeedSource::Recent).await
    }

    /// Most liked first, then most viewed
    pub async fn show_trending(&self) -> SessionState {
        self.set_source(FeedSource::Trending).await
    }

    /// One creator's items, newest first
    pub async fn show_owner(&self, owner_id: impl Into<String>) -> SessionState {
        self.set_source(FeedSource::ByOwner(owner_id.into())).await
    }

    async fn set_source(&self, source: FeedSource) -> SessionState {
        self.inner.shared.lock().state.source = source;
        self.run_load().await
    }

    /// Clear the search from the cached browse list, if it matches the current filters
    fn restore_browse(&self) -> Option<SessionState> {
        if self.is_closed() {
            return Some(self.state());
        }

        let mut shared = self.inner.shared.lock();
        let Shared { state, browse } = &mut *shared;

        let restorable = browse
            .as_ref()
            .map(|cache| cache.category == state.active_category && cache.source == state.source)
            .unwrap_or(false);

        if let Some(cache) = browse.as_ref().filter(|_| restorable) {
            // Supersedes any search still in flight
            self.inner.latest_request.fetch_add(1, Ordering::SeqCst);
            state.search_query = None;
            state.items = cache.items.clone();
            state.cursor_index = 0;
            state.loading_state = LoadingState::Loaded;
            state.error_message = None;
            debug!(items = state.items.len(), "restored browse list");
            return Some(state.clone());
        }

        if state.search_query.is_none() && state.loading_state == LoadingState::Loaded {
            // Nothing to clear
            return Some(state.clone());
        }

        state.search_query = None;
        None
    }

    fn build_query(&self, state: &SessionState) -> VideoQuery {
        let mut query = VideoQuery::new(self.inner.page_size);
        if let Some(label) = state.active_category.filter_label() {
            query = query.with_category(label);
        }
        match &state.source {
            FeedSource::Recent => {}
            FeedSource::Trending => query = query.with_order(VideoOrder::Ranking),
            FeedSource::ByOwner(owner_id) => query = query.with_owner(owner_id.clone()),
        }
        if let Some(filter) = state.search_query.as_deref().and_then(search::parse) {
            query = query.with_text(filter);
        }
        query
    }

    async fn run_load(&self) -> SessionState {
        if self.is_closed() {
            return self.state();
        }

        let request_id = self.inner.latest_request.fetch_add(1, Ordering::SeqCst) + 1;
        let query = {
            let mut shared = self.inner.shared.lock();
            shared.state.loading_state = LoadingState::Loading;
            shared.state.error_message = None;
            self.build_query(&shared.state)
        };

        debug!(request_id, ?query, "loading feed page");
        let result = self.fetch_page(&query).await;

        let mut failure = None;
        let snapshot = {
            let mut shared = self.inner.shared.lock();

            if self.is_closed() {
                debug!(request_id, "session closed, dropping feed response");
                return shared.state.clone();
            }
            if self.inner.latest_request.load(Ordering::SeqCst) != request_id {
                debug!(request_id, "superseded, dropping feed response");
                return shared.state.clone();
            }

            match result {
                Ok(page) => {
                    info!(request_id, items = page.items.len(), "feed page loaded");
                    let Shared { state, browse } = &mut *shared;

                    let page_ids: HashSet<&str> =
                        page.items.iter().map(|item| item.id.as_str()).collect();
                    state.liked.retain(|id| !page_ids.contains(id.as_str()));
                    state.liked.extend(page.liked);

                    state.items = page.items;
                    state.cursor_index = 0;
                    state.loading_state = LoadingState::Loaded;

                    if state.search_query.is_none() {
                        *browse = Some(BrowseCache {
                            category: state.active_category,
                            source: state.source.clone(),
                            items: state.items.clone(),
                        });
                    }

                    // Liked ids only for items still held by the list or the cache
                    let held: HashSet<&str> = state
                        .items
                        .iter()
                        .chain(browse.iter().flat_map(|cache| cache.items.iter()))
                        .map(|item| item.id.as_str())
                        .collect();
                    state.liked.retain(|id| held.contains(id.as_str()));
                }
                Err(err) => {
                    err.log();
                    // Previous items and cursor stay as they were
                    shared.state.loading_state = LoadingState::Failed;
                    shared.state.error_message = Some(err.user_message());
                    failure = Some(err);
                }
            }
            shared.state.clone()
        };

        if let Some(err) = failure {
            self.inner
                .notifier
                .notify(Notification::from_error("Error loading videos", &err));
        }
        snapshot
    }

    async fn fetch_page(&self, query: &VideoQuery) -> ServiceResult<Page> {
        let mut records = self.inner.store.list_videos(query).await?;
        if let Some(filter) = &query.text {
            records.retain(|record| search::matches_record(filter, record));
        }

        let owner_ids: Vec<String> = records
            .iter()
            .filter_map(|record| record.user_id.clone())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let video_ids: Vec<String> = records.iter().filter_map(|r| r.id_string()).collect();

        let (profiles, liked) = futures::join!(
            self.join_profiles(&owner_ids),
            self.hydrate_likes(&video_ids)
        );

        let items = self.inner.normalizer.content_items(records, &profiles);
        let liked = liked
            .into_iter()
            .filter(|id| items.iter().any(|item| &item.id == id))
            .collect();

        Ok(Page { items, liked })
    }

    /// Owner profiles keyed by user id; empty when the join fails
    async fn join_profiles(&self, owner_ids: &[String]) -> HashMap<String, ProfileRecord> {
        if owner_ids.is_empty() {
            return HashMap::new();
        }
        match self.inner.store.fetch_profiles(owner_ids).await {
            Ok(profiles) => profiles
                .into_iter()
                .map(|p| (p.user_id.clone(), p))
                .collect(),
            Err(err) => {
                warn!(error = %err, owners = owner_ids.len(), "profile join failed, showing un-joined items");
                HashMap::new()
            }
        }
    }

    /// Which of the ids the viewer has liked; none for guests or on failure
    async fn hydrate_likes(&self, video_ids: &[String]) -> Vec<String> {
        let Some(user_id) = self.inner.viewer.user_id() else {
            return Vec::new();
        };
        if video_ids.is_empty() {
            return Vec::new();
        }
        match self.inner.store.liked_video_ids(user_id, video_ids).await {
            Ok(ids) => ids,
            Err(err) => {
                warn!(error = %err, "liked-state lookup failed, showing none as liked");
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    /// Move to the next item; `false` at the end
    pub fn advance(&self) -> bool {
        let mut shared = self.inner.shared.lock();
        let state = &mut shared.state;
        if state.cursor_index + 1 < state.items.len() {
            state.cursor_index += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous item; `false` at the start
    pub fn retreat(&self) -> bool {
        let mut shared = self.inner.shared.lock();
        let state = &mut shared.state;
        if state.cursor_index > 0 && !state.items.is_empty() {
            state.cursor_index -= 1;
            true
        } else {
            false
        }
    }
}

/// Trimmed query, or `None` when it searches for nothing
fn normalize_query(raw: &str) -> Option<String> {
    search::parse(raw).map(|_| raw.trim().to_string())
}
