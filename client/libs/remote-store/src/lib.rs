//! Client for the Limey backend-as-a-service
//!
//! The store is an opaque collaborator: tables behind a PostgREST-style API,
//! a handful of atomic counter procedures and an object storage bucket API.
//! [`RemoteStore`] is the seam the feed session and the upload / profile
//! services talk to:
//! - [`RestStore`]: HTTP implementation over `reqwest`
//! - [`InMemoryStore`]: in-process implementation with failure injection

use async_trait::async_trait;
use bytes::Bytes;
use error_types::ServiceResult;

pub mod memory;
pub mod query;
pub mod records;
pub mod rest;

pub use memory::{InMemoryStore, StoreOperation};
pub use query::{TextFilter, VideoOrder, VideoQuery, MAX_PAGE_SIZE, TAG_SCAN_LIMIT};
pub use records::{
    CounterOp, LiveStreamRecord, NewLiveStream, NewVideoRecord, ProfileChanges, ProfileRecord,
    VideoRecord,
};
pub use rest::{RestStore, RestStoreConfig};

/// Operations the client needs from the remote store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// One page of `videos` rows, in server order
    async fn list_videos(&self, query: &VideoQuery) -> ServiceResult<Vec<VideoRecord>>;

    /// Lightweight profiles for a set of owners (missing owners are simply absent)
    async fn fetch_profiles(&self, user_ids: &[String]) -> ServiceResult<Vec<ProfileRecord>>;

    async fn fetch_profile(&self, user_id: &str) -> ServiceResult<Option<ProfileRecord>>;

    async fn update_profile(&self, user_id: &str, changes: &ProfileChanges) -> ServiceResult<()>;

    /// Insert a row and return it as stored
    async fn insert_video(&self, video: &NewVideoRecord) -> ServiceResult<VideoRecord>;

    /// Run an atomic counter procedure against a video (or owner) id
    async fn adjust_counter(&self, op: CounterOp, id: &str) -> ServiceResult<()>;

    /// Insert the (user, video) like row; inserting an existing pair succeeds
    async fn insert_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()>;

    /// Delete the (user, video) like row; deleting a missing pair succeeds
    async fn delete_like(&self, user_id: &str, video_id: &str) -> ServiceResult<()>;

    /// Subset of `video_ids` the user has liked
    async fn liked_video_ids(
        &self,
        user_id: &str,
        video_ids: &[String],
    ) -> ServiceResult<Vec<String>>;

    /// Store bytes at `bucket/path` and return the public URL
    async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Bytes,
        content_type: &str,
        upsert: bool,
    ) -> ServiceResult<String>;

    async fn remove_object(&self, bucket: &str, path: &str) -> ServiceResult<()>;

    async fn insert_live_stream(&self, stream: &NewLiveStream) -> ServiceResult<LiveStreamRecord>;

    /// Mark every active stream of the user inactive
    async fn deactivate_live_streams(&self, user_id: &str) -> ServiceResult<()>;
}
