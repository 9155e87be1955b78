//! Boundary normalization from raw store records into domain types
//!
//! Rules:
//! - thumbnail: `thumbnail_url`, else legacy `thumbnail`, else the placeholder
//! - creator: profile `username`, else `display_name`, else "Unknown"
//! - unknown or missing category becomes `All`
//! - missing or negative counters become 0
//! - title and description are cut to 100 / 500 characters
//! - rows without id, without media URL or with an unparseable `created_at`
//!   are dropped, and duplicate ids keep the first occurrence

use super::{Category, ContentItem, Counters, LiveStream, Profile};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use remote_store::{LiveStreamRecord, ProfileRecord, VideoRecord};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const BIO_MAX_CHARS: usize = 200;
pub const UNKNOWN_CREATOR: &str = "Unknown";
pub const UNTITLED: &str = "Untitled";
pub const DEFAULT_PLACEHOLDER_THUMBNAIL: &str =
    "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=400&h=600&fit=crop";

/// Converts store records into [`ContentItem`]s
#[derive(Debug, Clone)]
pub struct Normalizer {
    placeholder_thumbnail: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER_THUMBNAIL)
    }
}

impl Normalizer {
    pub fn new(placeholder_thumbnail: impl Into<String>) -> Self {
        Self {
            placeholder_thumbnail: placeholder_thumbnail.into(),
        }
    }

    pub fn placeholder_thumbnail(&self) -> &str {
        &self.placeholder_thumbnail
    }

    /// Normalize one record, `None` when it cannot be shown
    pub fn content_item(
        &self,
        record: VideoRecord,
        profiles: &HashMap<String, ProfileRecord>,
    ) -> Option<ContentItem> {
        let Some(id) = record.id_string() else {
            debug!("dropping video record without id");
            return None;
        };
        let Some(media_url) = non_blank(record.video_url) else {
            debug!(video_id = %id, "dropping video record without media URL");
            return None;
        };
        let Some(created_at) = record.created_at.as_deref().and_then(parse_timestamp) else {
            debug!(video_id = %id, created_at = ?record.created_at, "dropping video record with bad timestamp");
            return None;
        };

        let owner_id = record.user_id.unwrap_or_default();
        let creator = creator_handle(profiles.get(&owner_id));

        Some(ContentItem {
            id,
            title: non_blank(record.title)
                .map(|t| truncate_chars(&t, TITLE_MAX_CHARS))
                .unwrap_or_else(|| UNTITLED.to_string()),
            description: non_blank(record.description)
                .map(|d| truncate_chars(&d, DESCRIPTION_MAX_CHARS)),
            media_url,
            thumbnail_url: non_blank(record.thumbnail_url)
                .or_else(|| non_blank(record.thumbnail))
                .unwrap_or_else(|| self.placeholder_thumbnail.clone()),
            owner_id,
            creator,
            category: record
                .category
                .as_deref()
                .and_then(Category::from_label)
                .unwrap_or_default(),
            tags: record
                .tags
                .unwrap_or_default()
                .into_iter()
                .filter(|t| !t.trim().is_empty())
                .collect(),
            counters: Counters {
                view_count: counter(record.view_count),
                like_count: counter(record.like_count),
                comment_count: counter(record.comment_count),
            },
            created_at,
        })
    }

    /// Normalize a page, preserving server order
    pub fn content_items(
        &self,
        records: Vec<VideoRecord>,
        profiles: &HashMap<String, ProfileRecord>,
    ) -> Vec<ContentItem> {
        let total = records.len();
        let mut seen = HashSet::new();
        let items: Vec<ContentItem> = records
            .into_iter()
            .filter_map(|record| self.content_item(record, profiles))
            .filter(|item| seen.insert(item.id.clone()))
            .collect();

        if items.len() < total {
            warn!(
                dropped = total - items.len(),
                kept = items.len(),
                "dropped malformed or duplicate video records"
            );
        }
        items
    }
}

/// Display handle for an owner
pub fn creator_handle(profile: Option<&ProfileRecord>) -> String {
    profile
        .and_then(|p| {
            non_blank(p.username.clone()).or_else(|| non_blank(p.display_name.clone()))
        })
        .unwrap_or_else(|| UNKNOWN_CREATOR.to_string())
}

pub fn profile(record: ProfileRecord) -> Profile {
    Profile {
        user_id: record.user_id,
        username: non_blank(record.username),
        display_name: non_blank(record.display_name),
        bio: non_blank(record.bio).map(|b| truncate_chars(&b, BIO_MAX_CHARS)),
        avatar_url: non_blank(record.avatar_url),
        is_creator: record.is_creator.unwrap_or(false),
        video_count: counter(record.video_count),
    }
}

pub fn live_stream(record: LiveStreamRecord) -> LiveStream {
    LiveStream {
        id: value_to_id(&record.id),
        user_id: record.user_id,
        title: record.title,
        description: non_blank(record.description),
        is_active: record.is_active,
        viewer_count: counter(Some(record.viewer_count)),
    }
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// RFC 3339, or a zone-less timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Cut to at most `max` characters on a char boundary
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

fn counter(value: Option<i64>) -> u64 {
    value.filter(|n| *n > 0).map(|n| n as u64).unwrap_or(0)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
