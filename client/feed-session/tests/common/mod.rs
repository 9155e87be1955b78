//! Shared fixtures for feed-session integration tests
//!
//! The remote store is the in-memory implementation, seeded per test, with
//! failures and latency injected per operation.

#![allow(dead_code)]

use feed_session::{FeedSession, NotificationQueue, ServiceContext, SessionOptions, Viewer};
use remote_store::{InMemoryStore, ProfileRecord, VideoRecord};
use serde_json::json;
use std::sync::Arc;

pub const VIEWER_ID: &str = "viewer-1";

/// Video row created on 2024-03-`day` at noon UTC
pub fn video(id: &str, category: &str, day: u32) -> VideoRecord {
    VideoRecord {
        id: Some(json!(id)),
        title: Some(format!("Video {}", id)),
        description: None,
        video_url: Some(format!("https://cdn.limey.tt/{}.mp4", id)),
        thumbnail_url: Some(format!("https://cdn.limey.tt/{}.jpg", id)),
        user_id: Some(format!("owner-{}", id)),
        category: Some(category.to_string()),
        view_count: Some(10),
        like_count: Some(3),
        comment_count: Some(0),
        created_at: Some(format!("2024-03-{:02}T12:00:00Z", day)),
        ..Default::default()
    }
}

pub fn with_description(mut record: VideoRecord, description: &str) -> VideoRecord {
    record.description = Some(description.to_string());
    record
}

pub fn profile(user_id: &str, username: &str) -> ProfileRecord {
    ProfileRecord {
        user_id: user_id.to_string(),
        username: Some(username.to_string()),
        ..Default::default()
    }
}

/// Session wired to an in-memory store and a collecting notifier
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub notifications: Arc<NotificationQueue>,
    pub session: FeedSession,
}

impl Harness {
    pub fn new(viewer: Viewer, videos: Vec<VideoRecord>) -> Self {
        let store = Arc::new(InMemoryStore::with_videos(videos));
        let notifications = Arc::new(NotificationQueue::new());
        let session = FeedSession::new(
            store.clone(),
            viewer,
            notifications.clone(),
            SessionOptions::default(),
        );
        Self {
            store,
            notifications,
            session,
        }
    }

    pub fn guest(videos: Vec<VideoRecord>) -> Self {
        Self::new(Viewer::Guest, videos)
    }

    pub fn signed_in(videos: Vec<VideoRecord>) -> Self {
        Self::new(Viewer::signed_in(VIEWER_ID), videos)
    }

    /// Service collaborators sharing this harness' store and notifier
    pub fn context(&self, viewer: Viewer) -> ServiceContext {
        ServiceContext::new(self.store.clone(), viewer, self.notifications.clone())
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.session
            .state()
            .items
            .iter()
            .map(|item| item.id.clone())
            .collect()
    }
}
