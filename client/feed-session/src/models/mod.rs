//! Domain types for the feed client

pub mod normalize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Content category
///
/// `All` is the absence of a category constraint; every stored item carries
/// one of the concrete labels or is normalized to `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    All,
    Soca,
    Dancehall,
    Carnival,
    Comedy,
    Dance,
    Music,
    #[serde(rename = "Local News")]
    LocalNews,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const VALUES: [Category; 8] = [
        Category::All,
        Category::Soca,
        Category::Dancehall,
        Category::Carnival,
        Category::Comedy,
        Category::Dance,
        Category::Music,
        Category::LocalNews,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::All => "All",
            Category::Soca => "Soca",
            Category::Dancehall => "Dancehall",
            Category::Carnival => "Carnival",
            Category::Comedy => "Comedy",
            Category::Dance => "Dance",
            Category::Music => "Music",
            Category::LocalNews => "Local News",
        }
    }

    /// Case-insensitive lookup by label
    pub fn from_label(label: &str) -> Option<Category> {
        let label = label.trim();
        Self::VALUES
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(label))
    }

    /// Label to constrain a remote query with, `None` for `All`
    pub fn filter_label(&self) -> Option<&'static str> {
        match self {
            Category::All => None,
            other => Some(other.label()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Engagement counters, never negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// A feed item after boundary normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    /// At most 100 characters
    pub title: String,
    /// At most 500 characters
    pub description: Option<String>,
    pub media_url: String,
    pub thumbnail_url: String,
    pub owner_id: String,
    /// Owner's handle, "Unknown" when the profile join is unavailable
    pub creator: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub counters: Counters,
    pub created_at: DateTime<Utc>,
}

/// Which collection variant a session shows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedSource {
    /// Newest first
    #[default]
    Recent,
    /// Most liked, then most viewed
    Trending,
    /// One creator's items, newest first
    ByOwner(String),
}

impl FromStr for FeedSource {
    type Err = UnknownFeedSource;

    /// `recent`, `trending` or `owner:<id>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("recent") {
            return Ok(FeedSource::Recent);
        }
        if s.eq_ignore_ascii_case("trending") {
            return Ok(FeedSource::Trending);
        }
        match s.split_once(':') {
            Some((prefix, owner)) if prefix.eq_ignore_ascii_case("owner") && !owner.is_empty() => {
                Ok(FeedSource::ByOwner(owner.to_string()))
            }
            _ => Err(UnknownFeedSource(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown feed source: {0} (expected recent, trending or owner:<id>)")]
pub struct UnknownFeedSource(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoadingState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Snapshot of a feed session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub items: Vec<ContentItem>,
    /// Always `< items.len()` when items are present, 0 otherwise
    pub cursor_index: usize,
    pub active_category: Category,
    pub search_query: Option<String>,
    pub source: FeedSource,
    pub loading_state: LoadingState,
    /// Kept while `Failed`
    pub error_message: Option<String>,
    /// Ids of loaded items the viewer has liked
    pub liked: HashSet<String>,
}

impl SessionState {
    pub fn current(&self) -> Option<&ContentItem> {
        self.items.get(self.cursor_index)
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.liked.contains(id)
    }

    pub fn item(&self, id: &str) -> Option<&ContentItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub(crate) fn item_mut(&mut self, id: &str) -> Option<&mut ContentItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    /// At most 200 characters
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_creator: bool,
    pub video_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStream {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub viewer_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip_through_parse() {
        for category in Category::VALUES {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
        assert_eq!("local news".parse::<Category>(), Ok(Category::LocalNews));
        assert!("Calypso".parse::<Category>().is_err());
    }

    #[test]
    fn test_all_has_no_filter_label() {
        assert_eq!(Category::All.filter_label(), None);
        assert_eq!(Category::LocalNews.filter_label(), Some("Local News"));
    }

    #[test]
    fn test_category_serializes_as_label() {
        assert_eq!(
            serde_json::to_string(&Category::LocalNews).unwrap(),
            "\"Local News\""
        );
    }

    #[test]
    fn test_feed_source_parse() {
        assert_eq!("recent".parse::<FeedSource>(), Ok(FeedSource::Recent));
        assert_eq!("Trending".parse::<FeedSource>(), Ok(FeedSource::Trending));
        assert_eq!(
            "owner:u-42".parse::<FeedSource>(),
            Ok(FeedSource::ByOwner("u-42".into()))
        );
        assert!("owner:".parse::<FeedSource>().is_err());
        assert!("popular".parse::<FeedSource>().is_err());
    }

    #[test]
    fn test_empty_state_has_no_current_item() {
        let state = SessionState::default();
        assert_eq!(state.loading_state, LoadingState::Idle);
        assert!(state.current().is_none());
    }
}
