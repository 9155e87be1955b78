//! Search query parsing

use remote_store::{TextFilter, VideoRecord};

/// Parse a user-entered search query
///
/// Blank input, or a `#` with nothing after it, is no search at all. A
/// leading `#` searches descriptions for the literal hashtag; anything else
/// is a free-text search. Matching is case-insensitive either way.
pub fn parse(raw: &str) -> Option<TextFilter> {
    let query = raw.trim();
    if query.is_empty() || query == "#" {
        return None;
    }

    let needle = query.to_lowercase();
    if needle.starts_with('#') {
        Some(TextFilter::Hashtag(needle))
    } else {
        Some(TextFilter::Any(needle))
    }
}

/// Apply the filter to a raw record
pub fn matches_record(filter: &TextFilter, record: &VideoRecord) -> bool {
    filter.matches_record(record)
}
