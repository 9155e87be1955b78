//! List query description for the `videos` collection

use crate::records::VideoRecord;
use chrono::{DateTime, FixedOffset};

/// Hard cap on rows per list request
pub const MAX_PAGE_SIZE: usize = 100;

/// Rows scanned for tag matches on a free-text search
///
/// Tags are a text array the server can only match by whole element, so tag
/// substrings are matched client-side over this many rows in query order.
pub const TAG_SCAN_LIMIT: usize = 500;

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoOrder {
    /// `created_at` descending
    #[default]
    Recency,
    /// `like_count` descending, then `view_count` descending
    Ranking,
}

impl VideoOrder {
    /// Sort rows the way the server orders them
    pub fn sort(self, rows: &mut [VideoRecord]) {
        match self {
            VideoOrder::Recency => rows.sort_by(|a, b| created_at(b).cmp(&created_at(a))),
            VideoOrder::Ranking => rows.sort_by(|a, b| ranking_key(b).cmp(&ranking_key(a))),
        }
    }
}

fn created_at(video: &VideoRecord) -> Option<DateTime<FixedOffset>> {
    video
        .created_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
}

fn ranking_key(video: &VideoRecord) -> (i64, i64) {
    (
        video.like_count.unwrap_or(0),
        video.view_count.unwrap_or(0),
    )
}

/// Text predicate applied to a list query
///
/// Both variants hold the needle lowercased. `Hashtag` keeps its leading `#`
/// because it matches the literal tag text inside descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFilter {
    /// Substring of title, description, category or any tag
    Any(String),
    /// Substring of description only
    Hashtag(String),
}

impl TextFilter {
    pub fn needle(&self) -> &str {
        match self {
            TextFilter::Any(n) | TextFilter::Hashtag(n) => n,
        }
    }

    /// Case-insensitive match over the searchable fields of a video
    pub fn matches_fields(
        &self,
        title: &str,
        description: Option<&str>,
        category: Option<&str>,
        tags: &[String],
    ) -> bool {
        let contains = |haystack: &str| haystack.to_lowercase().contains(self.needle());
        match self {
            TextFilter::Any(_) => {
                contains(title)
                    || description.map(contains).unwrap_or(false)
                    || category.map(contains).unwrap_or(false)
                    || self.matches_tags(tags)
            }
            TextFilter::Hashtag(_) => description.map(contains).unwrap_or(false),
        }
    }

    /// Any tag contains the needle, ignoring case; hashtag filters never read tags
    pub fn matches_tags(&self, tags: &[String]) -> bool {
        match self {
            TextFilter::Any(needle) => tags.iter().any(|t| t.to_lowercase().contains(needle.as_str())),
            TextFilter::Hashtag(_) => false,
        }
    }

    pub fn matches_record(&self, video: &VideoRecord) -> bool {
        self.matches_fields(
            video.title.as_deref().unwrap_or(""),
            video.description.as_deref(),
            video.category.as_deref(),
            video.tags.as_deref().unwrap_or(&[]),
        )
    }
}

/// One page request against `videos`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoQuery {
    /// Exact category label; `None` means no constraint
    pub category: Option<String>,
    pub owner_id: Option<String>,
    pub text: Option<TextFilter>,
    pub order: VideoOrder,
    pub limit: usize,
}

impl VideoQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            category: None,
            owner_id: None,
            text: None,
            order: VideoOrder::Recency,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_text(mut self, text: TextFilter) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_order(mut self, order: VideoOrder) -> Self {
        self.order = order;
        self
    }
}
