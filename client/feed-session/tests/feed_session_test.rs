//! Feed session behavior against the in-memory store

mod common;

use common::{profile, video, with_description, Harness, VIEWER_ID};
use error_types::ErrorKind;
use feed_session::{Category, FeedSource, LoadingState, Severity};
use remote_store::StoreOperation;
use std::time::Duration;

// ============================================================================
// Cursor
// ============================================================================

#[tokio::test]
async fn test_cursor_bounds_after_load_and_moves() {
    let h = Harness::guest(vec![
        video("a", "Soca", 1),
        video("b", "Soca", 2),
        video("c", "Soca", 3),
    ]);

    let state = h.session.load(Category::All, None).await;
    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert_eq!(state.cursor_index, 0);

    assert!(h.session.advance());
    assert!(h.session.advance());
    // Last index: advance refuses and leaves the cursor
    assert!(!h.session.advance());
    assert_eq!(h.session.state().cursor_index, 2);
    assert_eq!(h.session.current().unwrap().id, "a");

    assert!(h.session.retreat());
    assert!(h.session.retreat());
    assert!(!h.session.retreat());
    assert_eq!(h.session.state().cursor_index, 0);
}

#[tokio::test]
async fn test_reload_resets_cursor() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("b", "Soca", 2)]);
    h.session.load(Category::All, None).await;
    h.session.advance();

    let state = h.session.refresh().await;
    assert_eq!(state.cursor_index, 0);
}

#[tokio::test]
async fn test_empty_result_keeps_cursor_at_zero() {
    let h = Harness::guest(vec![video("a", "Soca", 1)]);
    let state = h.session.filter_by_category(Category::Music).await;

    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert!(state.items.is_empty());
    assert_eq!(state.cursor_index, 0);
    assert!(!h.session.advance());
    assert!(!h.session.retreat());
    assert!(h.session.current().is_none());
}

// ============================================================================
// Category filter
// ============================================================================

#[tokio::test]
async fn test_filter_by_category_selects_matching_items() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("b", "Comedy", 2)]);

    let state = h.session.filter_by_category(Category::Soca).await;

    assert_eq!(h.item_ids(), vec!["a"]);
    assert_eq!(state.cursor_index, 0);
    assert_eq!(state.active_category, Category::Soca);
}

#[tokio::test]
async fn test_filter_all_clears_category_constraint() {
    let h = Harness::guest(vec![
        video("a", "Soca", 1),
        video("b", "Comedy", 2),
        video("c", "Local News", 3),
    ]);

    h.session.filter_by_category(Category::Comedy).await;
    assert_eq!(h.item_ids(), vec!["b"]);

    h.session.filter_by_category(Category::All).await;
    assert_eq!(h.item_ids(), vec!["c", "b", "a"]);
    assert_eq!(
        h.session.state().items[0].category,
        Category::LocalNews
    );
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_matches_title_description_category_and_tags() {
    let mut tagged = video("d", "Music", 4);
    tagged.tags = Some(vec!["SteelPan".into()]);

    let h = Harness::guest(vec![
        video("a", "Soca", 1),
        with_description(video("b", "Comedy", 2), "Steel pan cover"),
        video("c", "Dance", 3),
        tagged,
    ]);

    h.session.search("STEELPAN").await;
    assert_eq!(h.item_ids(), vec!["d"]);

    h.session.search("steel pan").await;
    assert_eq!(h.item_ids(), vec!["b"]);

    h.session.search("dance").await;
    assert_eq!(h.item_ids(), vec!["c"]);
}

#[tokio::test]
async fn test_search_composes_with_category() {
    let h = Harness::guest(vec![
        with_description(video("a", "Soca", 1), "jump and wave"),
        with_description(video("b", "Comedy", 2), "jump scare"),
    ]);

    h.session.filter_by_category(Category::Comedy).await;
    let state = h.session.search("jump").await;

    assert_eq!(h.item_ids(), vec!["b"]);
    assert_eq!(state.search_query.as_deref(), Some("jump"));
    assert_eq!(state.active_category, Category::Comedy);
}

#[tokio::test]
async fn test_hashtag_search_only_matches_descriptions() {
    let mut titled = video("c", "Carnival", 3);
    titled.title = Some("#carnival in the title".into());

    let h = Harness::guest(vec![
        with_description(video("a", "Soca", 1), "Road march #Carnival2024"),
        with_description(video("b", "Carnival", 2), "carnival without the hash"),
        titled,
    ]);

    h.session.search("#carnival").await;
    assert_eq!(h.item_ids(), vec!["a"]);
}

#[tokio::test]
async fn test_blank_search_restores_category_list_without_network() {
    let h = Harness::guest(vec![
        video("a", "Soca", 1),
        video("b", "Comedy", 2),
        video("c", "Soca", 3),
    ]);

    h.session.filter_by_category(Category::Soca).await;
    h.session.advance();
    h.session.search("video a").await;
    assert_eq!(h.item_ids(), vec!["a"]);
    let calls = h.store.call_count(StoreOperation::ListVideos);

    let state = h.session.search("  ").await;

    assert_eq!(h.store.call_count(StoreOperation::ListVideos), calls);
    assert_eq!(h.item_ids(), vec!["c", "a"]);
    assert_eq!(state.search_query, None);
    assert_eq!(state.cursor_index, 0);
    assert_eq!(state.loading_state, LoadingState::Loaded);
}

#[tokio::test]
async fn test_lone_hash_search_counts_as_blank() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("c", "Soca", 3)]);

    h.session.filter_by_category(Category::Soca).await;
    h.session.search("video a").await;
    let calls = h.store.call_count(StoreOperation::ListVideos);

    let state = h.session.search(" # ").await;

    assert_eq!(h.store.call_count(StoreOperation::ListVideos), calls);
    assert_eq!(h.item_ids(), vec!["c", "a"]);
    assert_eq!(state.search_query, None);
}

// ============================================================================
// Failure handling
// ============================================================================

#[tokio::test]
async fn test_failed_load_keeps_previous_items_and_cursor() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("b", "Soca", 2)]);
    h.session.load(Category::All, None).await;
    h.session.advance();

    h.store.fail(StoreOperation::ListVideos);
    let state = h.session.filter_by_category(Category::Soca).await;

    assert_eq!(state.loading_state, LoadingState::Failed);
    assert!(!state.error_message.as_deref().unwrap_or("").is_empty());
    assert_eq!(h.item_ids(), vec!["b", "a"]);
    assert_eq!(state.cursor_index, 1);

    let notifications = h.notifications.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].severity, Severity::Error);
    assert_eq!(notifications[0].title, "Error loading videos");

    // No automatic retry
    assert_eq!(h.store.call_count(StoreOperation::ListVideos), 2);

    h.store.recover(StoreOperation::ListVideos);
    let state = h.session.refresh().await;
    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert!(state.error_message.is_none());
}

#[tokio::test]
async fn test_profile_join_failure_yields_unknown_creator() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("b", "Comedy", 2)]);
    h.store.add_profile(profile("owner-a", "machel"));

    h.session.load(Category::All, None).await;
    let state = h.session.state();
    assert_eq!(state.item("a").unwrap().creator, "machel");
    assert_eq!(state.item("b").unwrap().creator, "Unknown");

    h.store.fail(StoreOperation::FetchProfiles);
    let state = h.session.refresh().await;
    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert_eq!(state.items.len(), 2);
    assert!(state.items.iter().all(|item| item.creator == "Unknown"));
    assert!(h.notifications.is_empty());
}

#[tokio::test]
async fn test_malformed_records_are_dropped() {
    let mut no_media = video("b", "Soca", 2);
    no_media.video_url = None;
    let mut bad_time = video("c", "Soca", 3);
    bad_time.created_at = Some("not a date".into());

    let h = Harness::guest(vec![video("a", "Soca", 1), no_media, bad_time]);
    let state = h.session.load(Category::All, None).await;

    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert_eq!(h.item_ids(), vec!["a"]);
}

// ============================================================================
// Sequencing
// ============================================================================

#[tokio::test]
async fn test_slow_earlier_load_does_not_overwrite_later_one() {
    let h = Harness::guest(vec![video("a", "Soca", 1), video("b", "Comedy", 2)]);
    h.store.delay_next_list(Duration::from_millis(200));

    let slow_session = h.session.clone();
    let slow = tokio::spawn(async move { slow_session.filter_by_category(Category::Soca).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let fast = h.session.filter_by_category(Category::Comedy).await;
    assert_eq!(fast.loading_state, LoadingState::Loaded);

    slow.await.unwrap();
    let state = h.session.state();
    assert_eq!(h.item_ids(), vec!["b"]);
    assert_eq!(state.active_category, Category::Comedy);
    assert_eq!(state.loading_state, LoadingState::Loaded);
}

#[tokio::test]
async fn test_results_after_close_are_ignored() {
    let h = Harness::guest(vec![video("a", "Soca", 1)]);
    h.store.delay_next_list(Duration::from_millis(100));

    let session = h.session.clone();
    let pending = tokio::spawn(async move { session.load(Category::All, None).await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    h.session.close();
    pending.await.unwrap();

    let state = h.session.state();
    assert!(state.items.is_empty());
    assert_ne!(state.loading_state, LoadingState::Loaded);
    assert_eq!(h.store.call_count(StoreOperation::ListVideos), 1);
}

// ============================================================================
// Sources
// ============================================================================

#[tokio::test]
async fn test_trending_orders_by_likes_then_views() {
    let mut popular = video("a", "Soca", 1);
    popular.like_count = Some(50);
    let mut watched = video("b", "Soca", 2);
    watched.like_count = Some(50);
    watched.view_count = Some(900);
    let recent = video("c", "Soca", 3);

    let h = Harness::guest(vec![popular, watched, recent]);

    let state = h.session.show_trending().await;
    assert_eq!(state.source, FeedSource::Trending);
    assert_eq!(h.item_ids(), vec!["b", "a", "c"]);

    h.session.show_recent().await;
    assert_eq!(h.item_ids(), vec!["c", "b", "a"]);
}

#[tokio::test]
async fn test_show_owner_lists_one_creator() {
    let mut second = video("b", "Comedy", 2);
    second.user_id = Some("owner-a".into());

    let h = Harness::guest(vec![video("a", "Soca", 1), second, video("c", "Soca", 3)]);
    let state = h.session.show_owner("owner-a").await;

    assert_eq!(state.source, FeedSource::ByOwner("owner-a".into()));
    assert_eq!(h.item_ids(), vec!["b", "a"]);
}

// ============================================================================
// Likes
// ============================================================================

#[tokio::test]
async fn test_like_unlike_like_ends_liked_with_one_more() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;
    let original = h.session.current().unwrap().counters.like_count;

    let first = h.session.toggle_like("a").await.unwrap();
    assert!(first.liked);
    assert_eq!(first.like_count, original + 1);

    let second = h.session.toggle_like("a").await.unwrap();
    assert!(!second.liked);
    assert_eq!(second.like_count, original);

    let third = h.session.toggle_like("a").await.unwrap();
    assert!(third.liked);
    assert_eq!(third.like_count, original + 1);

    let state = h.session.state();
    assert!(state.is_liked("a"));
    assert_eq!(state.item("a").unwrap().counters.like_count, original + 1);
    assert!(h.store.is_liked(VIEWER_ID, "a"));
    assert_eq!(h.store.video("a").unwrap().like_count, Some(original as i64 + 1));
}

#[tokio::test]
async fn test_guest_cannot_like() {
    let h = Harness::guest(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;

    let err = h.session.toggle_like("a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(h.store.call_count(StoreOperation::InsertLike), 0);
    assert!(!h.session.state().is_liked("a"));

    let notifications = h.notifications.drain();
    assert_eq!(notifications[0].title, "Login Required");
    assert_eq!(notifications[0].message, "Please log in to like videos");
}

#[tokio::test]
async fn test_failed_like_write_reverts_optimistic_flip() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;
    h.store.fail(StoreOperation::InsertLike);

    let err = h.session.toggle_like("a").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);

    let state = h.session.state();
    assert!(!state.is_liked("a"));
    assert_eq!(state.item("a").unwrap().counters.like_count, 3);
    assert_eq!(h.store.call_count(StoreOperation::AdjustCounter), 0);
    assert_eq!(h.notifications.drain()[0].severity, Severity::Error);
}

#[tokio::test]
async fn test_counter_failure_keeps_like() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;
    h.store.fail(StoreOperation::AdjustCounter);

    let outcome = h.session.toggle_like("a").await.unwrap();
    assert!(outcome.liked);
    assert_eq!(outcome.like_count, 4);
    assert!(h.store.is_liked(VIEWER_ID, "a"));
}

#[tokio::test]
async fn test_liked_state_is_hydrated_on_load() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1), video("b", "Soca", 2)]);
    h.store.add_like(VIEWER_ID, "b");

    let state = h.session.load(Category::All, None).await;
    assert!(state.is_liked("b"));
    assert!(!state.is_liked("a"));

    // Unliking a hydrated like deletes the row
    let outcome = h.session.toggle_like("b").await.unwrap();
    assert!(!outcome.liked);
    assert!(!h.store.is_liked(VIEWER_ID, "b"));
}

#[tokio::test]
async fn test_hydration_failure_shows_none_liked() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.store.add_like(VIEWER_ID, "a");
    h.store.fail(StoreOperation::LikedVideoIds);

    let state = h.session.load(Category::All, None).await;
    assert_eq!(state.loading_state, LoadingState::Loaded);
    assert!(state.liked.is_empty());
}

#[tokio::test]
async fn test_liked_ids_follow_loaded_items() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1), video("b", "Comedy", 2)]);
    h.store.add_like(VIEWER_ID, "a");
    h.store.add_like(VIEWER_ID, "b");

    let state = h.session.load(Category::All, None).await;
    assert_eq!(state.liked.len(), 2);

    let state = h.session.filter_by_category(Category::Comedy).await;
    assert!(state.is_liked("b"));
    assert!(!state.is_liked("a"));
    assert_eq!(state.liked.len(), 1);
}

#[tokio::test]
async fn test_like_survives_search_round_trip() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1), video("b", "Soca", 2)]);
    h.session.load(Category::All, None).await;

    h.session.search("video a").await;
    h.session.toggle_like("a").await.unwrap();
    let state = h.session.search("").await;

    let item = state.item("a").unwrap();
    assert!(state.is_liked("a"));
    assert_eq!(item.counters.like_count, 4);
}

// ============================================================================
// Views
// ============================================================================

#[tokio::test]
async fn test_record_view_bumps_counter_for_signed_in_viewer() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;

    h.session.spawn_record_view("a").await.unwrap();

    assert_eq!(h.store.video("a").unwrap().view_count, Some(11));
    assert_eq!(h.session.current().unwrap().counters.view_count, 11);
}

#[tokio::test]
async fn test_guest_views_are_not_recorded() {
    let h = Harness::guest(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;

    h.session.record_view("a").await;

    assert_eq!(h.store.call_count(StoreOperation::AdjustCounter), 0);
    assert_eq!(h.store.video("a").unwrap().view_count, Some(10));
}

#[tokio::test]
async fn test_view_failure_is_swallowed() {
    let h = Harness::signed_in(vec![video("a", "Soca", 1)]);
    h.session.load(Category::All, None).await;
    h.store.fail(StoreOperation::AdjustCounter);

    h.session.record_view("a").await;

    assert_eq!(h.session.current().unwrap().counters.view_count, 10);
    assert!(h.notifications.is_empty());
}
