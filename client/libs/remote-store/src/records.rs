//! Row shapes exchanged with the backend-as-a-service
//!
//! Read-side records are loose on purpose: every column is optional and the
//! legacy `thumbnail` column still shows up on old rows. Callers normalize
//! them into strict domain types at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row from the `videos` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    /// String on current rows, numeric on a few seeded ones
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub view_count: Option<i64>,
    #[serde(default)]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub comment_count: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub is_trending: Option<bool>,
}

impl VideoRecord {
    /// Record id rendered as a string, whatever its JSON type
    pub fn id_string(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Row from the `profiles` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub user_id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_creator: Option<bool>,
    #[serde(default)]
    pub video_count: Option<i64>,
}

/// Insert payload for `videos`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVideoRecord {
    pub user_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub video_url: String,
    pub thumbnail_url: String,
    pub category: String,
    pub tags: Vec<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_trending: bool,
    pub is_featured: bool,
}

/// Patch payload for `profiles`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileChanges {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    /// `None` clears the avatar
    pub avatar_url: Option<String>,
}

/// Insert payload for `live_streams`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLiveStream {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub is_active: bool,
    pub viewer_count: i64,
}

/// Row from `live_streams`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStreamRecord {
    pub id: Value,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub viewer_count: i64,
}

/// Atomic counter procedures exposed by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterOp {
    IncrementLikes,
    DecrementLikes,
    IncrementViews,
    /// Keyed by owner id rather than video id
    IncrementVideoCount,
}

impl CounterOp {
    /// Stored procedure name
    pub fn function_name(&self) -> &'static str {
        match self {
            CounterOp::IncrementLikes => "increment_like_count",
            CounterOp::DecrementLikes => "decrement_like_count",
            CounterOp::IncrementViews => "increment_view_count",
            CounterOp::IncrementVideoCount => "increment_video_count",
        }
    }

    /// Procedure argument name
    pub fn argument_name(&self) -> &'static str {
        match self {
            CounterOp::IncrementVideoCount => "user_id",
            _ => "video_id_input",
        }
    }
}
