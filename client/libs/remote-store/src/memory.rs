//! In-process [`RemoteStore`] for offline runs and tests
//!
//! Follows the REST store's filtering, ordering, counter floors and
//! idempotent like rows, and adds hooks to inject failures and latency per
//! operation. Text filters are evaluated over every row here; the REST store
//! matches tag substrings only within its first
//! [`TAG_SCAN_LIMIT`](crate::query::TAG_SCAN_LIMIT) rows.

use crate::query::VideoQuery;
use crate::records::{
    CounterOp, LiveStreamRecord, NewLiveStream, NewVideoRecord, ProfileChanges, ProfileRecord,
    VideoRecord,
};
use crate::RemoteStore;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use error_types::{ServiceError, ServiceResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

/// Store operations, used to target injected failures and count calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListVideos,
    FetchProfiles,
    FetchProfile,
    UpdateProfile,
    InsertVideo,
    AdjustCounter,
    InsertLike,
    DeleteLike,
    LikedVideoIds,
    UploadObject,
    RemoveObject,
    InsertLiveStream,
    DeactivateLiveStreams,
}

impl StoreOperation {
    fn label(&self) -> &'static str {
        match self {
            StoreOperation::ListVideos => "list videos",
            StoreOperation::FetchProfiles => "load creators",
            StoreOperation::FetchProfile => "load profile",
            StoreOperation::UpdateProfile => "update your profile",
            StoreOperation::InsertVideo => "upload videos",
            StoreOperation::AdjustCounter => "update counters",
            StoreOperation::InsertLike | StoreOperation::DeleteLike => "like videos",
            StoreOperation::LikedVideoIds => "load likes",
            StoreOperation::UploadObject => "upload media",
            StoreOperation::RemoveObject => "remove media",
            StoreOperation::InsertLiveStream => "go live",
            StoreOperation::DeactivateLiveStreams => "end live streams",
        }
    }
}

/// Object held by the in-memory bucket
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Default)]
struct State {
    videos: Vec<VideoRecord>,
    profiles: HashMap<String, ProfileRecord>,
    likes: HashSet<(String, String)>,
    objects: HashMap<(String, String), StoredObject>,
    live_streams: Vec<LiveStreamRecord>,
    failing: HashSet<StoreOperation>,
    fail_next: HashSet<StoreOperation>,
    list_delays: VecDeque<Duration>,
    calls: HashMap<StoreOperation, usize>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn video_mut(&mut self, id: &str) -> Option<&mut VideoRecord> {
        self.videos
            .iter_mut()
            .find(|v| v.id_string().as_deref() == Some(id))
    }
}

pub struct InMemoryStore {
    state: Mutex<State>,
    public_base: String,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            public_base: "memory://storage".to_string(),
        }
    }

    pub fn with_videos(videos: Vec<VideoRecord>) -> Self {
        let store = Self::new();
        store.state.lock().videos = videos;
        store
    }

    pub fn add_video(&self, video: VideoRecord) {
        self.state.lock().videos.push(video);
    }

    pub fn add_profile(&self, profile: ProfileRecord) {
        self.state
            .lock()
            .profiles
            .insert(profile.user_id.clone(), profile);
    }

    pub fn add_like(&self, user_id: &str, video_id: &str) {
        self.state
            .lock()
            .likes
            .insert((user_id.to_string(), video_id.to_string()));
    }

    /// Fail every call to `op` until [`InMemoryStore::recover`]
    pub fn fail(&self, op: StoreOperation) {
        self.state.lock().failing.insert(op);
    }

    pub fn recover(&self, op: StoreOperation) {
        let mut state = self.state.lock();
        state.failing.remove(&op);
        state.fail_next.remove(&op);
    }

    /// Fail only the next call to `op`
    pub fn fail_next(&self, op: StoreOperation) {
        self.state.lock().fail_next.insert(op);
    }

    /// Delay the next list response (queued, one per call)
    pub fn delay_next_list(&self, delay: Duration) {
        self.state.lock().list_delays.push_back(delay);
    }

    pub fn call_count(&self, op: StoreOperation) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn video(&self, id: &str) -> Option<VideoRecord> {
        self.state
            .lock()
            .videos
            .iter()
            .find(|v| v.id_string().as_deref() == Some(id))
            .cloned()
    }

    pub fn profile(&self, user_id: &str) -> Option<ProfileRecord> {
        self.state.lock().profiles.get(user_id).cloned()
    }

    pub fn is_liked(&self, user_id: &str, video_id: &str) -> bool {
        self.state
            .lock()
            .likes
            .contains(&(user_id.to_string(), video_id.to_string()))
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn live_streams(&self) -> Vec<LiveStreamRecord> {
        self.state.lock().live_streams.clone()
    }

    /// Count the call and apply injected failures
    fn begin(&self, op: StoreOperation) -> ServiceResult<()> {
        let mut state = self.state.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(&op) || state.fail_next.remove(&op) {
            return Err(ServiceError::network(op.label(), "injected failure"));
        }
        Ok(())
    }

    fn run_list(&self, query: &VideoQuery) -> Vec<VideoRecord> {
        let state = self.state.lock();
        let mut rows: Vec<VideoRecord> = state
            .videos
            .iter()
            .filter(|v| match &query.category {
                Some(category) => v.category.as_deref() == Some(category.as_str()),
                None => true,
            })
            .filter(|v| match &query.owner_id {
                Some(owner) => v.user_id.as_deref() == Some(owner.as_str()),
                None => true,
            })
            .filter(|v| match &query.text {
                Some(filter) => filter.matches_record(v),
                None => true,
            })
            .cloned()
            .collect();

        query.order.sort(&mut rows);
        rows.truncate(query.limit);
        rows
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_videos(&self, query: &VideoQuery) -> ServiceResult<Vec<VideoRecord>> {
        let outcome = self
            .begin(StoreOperation::ListVideos)
            .map(|_| self.run_list(query));
        let delay = self.state.lock().list_delays.pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn fetch_profiles(&self, user_ids: &[String]) -> ServiceResult<Vec<ProfileRecord>> {
        self.begin(StoreOperation::FetchProfiles)?;
        let state = self.state.lock();
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn fetch_profile(&self, user_id: &str) -> ServiceResult<Option<ProfileRecord>> {
        self.begin(StoreOperation::FetchProfile)?;
        Ok(self.profile(user_id))
    }

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> ServiceResult<()> {
        self.begin(StoreOperation::UpdateProfile)?;
        let mut state = self.state.lock();
        if let Some(profile) = state.profiles.get_mut(user_id) {
            profile.username = Some(changes.username.clone());
            profile.display_name = Some(changes.display_name.clone());
            profile.bio = Some(changes.bio.clone());
            profile.avatar_url = changes.avatar_url.clone();
        }
        Ok(())
    }

    async fn insert_video(&self, video: &NewVideoRecord) -> ServiceResult<VideoRecord> {
        self.begin(StoreOperation::InsertVideo)?;
        let mut state = self.state.lock();
        let id = state.next_id("video");
        let record = VideoRecord {
            id: Some(Value::String(id)),
            title: Some(video.title.clone()),
            description: video.description.clone(),
            video_url: Some(video.video_url.clone()),
            thumbnail_url: Some(video.thumbnail_url.clone()),
            thumbnail: None,
            user_id: Some(video.user_id.clone()),
            category: Some(video.category.clone()),
            tags: Some(video.tags.clone()),
            view_count: Some(video.view_count),
            like_count: Some(video.like_count),
            comment_count: Some(video.comment_count),
            created_at: Some(Utc::now().to_rfc3339()),
            is_trending: Some(video.is_trending),
        };
        state.videos.push(record.clone());
        Ok(record)
    }

    async fn adjust_counter(&self, op: CounterOp, id: &str) -> ServiceResult<()> {
        self.begin(StoreOperation::AdjustCounter)?;
        let mut state = self.state.lock();

        if op == CounterOp::IncrementVideoCount {
            if let Some(profile) = state.profiles.get_mut(id) {
                profile.video_count = Some(profile.video_count.unwrap_or(0) + 1);
            }
            return Ok(());
        }

        if let Some(video) = state.video_mut(id) {
            match op {
                CounterOp::IncrementLikes => {
                    video.like_count = Some(video.like_count.unwrap_or(0) + 1)
                }
                // Counter never goes negative
                CounterOp::DecrementLikes => {
                    video.like_count = Some((video.like_count.unwrap_or(0) - 1).max(0))
                }
                CounterOp::IncrementViews => {
                    video.view_count = Some(video.view_count.unwrap_or(0) + 1)
                }
                CounterOp::IncrementVideoCount => {}
            }
        }
        Ok(())
    }

    async fn insert_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()> {
        self.begin(StoreOperation::InsertLike)?;
        self.add_like(user_id, video_id);
        Ok(())
    }

    async fn delete_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()> {
        self.begin(StoreOperation::DeleteLike)?;
        self.state
            .lock()
            .likes
            .remove(&(user_id.to_string(), video_id.to_string()));
        Ok(())
    }

    async fn liked_video_ids(
        &self,
        user_id: &str,
        video_ids: &[String],
    ) -> ServiceResult<Vec<String>> {
        self.begin(StoreOperation::LikedVideoIds)?;
        let state = self.state.lock();
        Ok(video_ids
            .iter()
            .filter(|id| state.likes.contains(&(user_id.to_string(), (*id).clone())))
            .cloned()
            .collect())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> ServiceResult<String> {
        self.begin(StoreOperation::UploadObject)?;
        let key = (bucket.to_string(), path.to_string());
        let mut state = self.state.lock();
        if !upsert && state.objects.contains_key(&key) {
            return Err(ServiceError::network("upload media", "object already exists"));
        }
        state.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!(
            "{}/object/public/{}/{}",
            self.public_base, bucket, path
        ))
    }

    async fn remove_object(&self, bucket: &str, path: &str) -> ServiceResult<()> {
        self.begin(StoreOperation::RemoveObject)?;
        self.state
            .lock()
            .objects
            .remove(&(bucket.to_string(), path.to_string()));
        Ok(())
    }

    async fn insert_live_stream(&self, stream: &NewLiveStream) -> ServiceResult<LiveStreamRecord> {
        self.begin(StoreOperation::InsertLiveStream)?;
        let mut state = self.state.lock();
        let record = LiveStreamRecord {
            id: Value::String(state.next_id("stream")),
            user_id: stream.user_id.clone(),
            title: stream.title.clone(),
            description: Some(stream.description.clone()),
            is_active: stream.is_active,
            viewer_count: stream.viewer_count,
        };
        state.live_streams.push(record.clone());
        Ok(record)
    }

    async fn deactivate_live_streams(&self, user_id: &str) -> ServiceResult<()> {
        self.begin(StoreOperation::DeactivateLiveStreams)?;
        for stream in self
            .state
            .lock()
            .live_streams
            .iter_mut()
            .filter(|s| s.user_id == user_id && s.is_active)
        {
            stream.is_active = false;
        }
        Ok(())
    }
}
