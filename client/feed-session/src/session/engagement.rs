//! Likes and view counts

use super::FeedSession;
use crate::notify::Notification;
use error_types::{ServiceError, ServiceResult};
use remote_store::CounterOp;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: u64,
}

impl FeedSession {
    /// Flip the viewer's like on a loaded item
    ///
    /// The local state flips immediately. If the like row cannot be written
    /// the flip is undone, provided nothing else changed the item's like
    /// state in the meantime. The counter procedure runs after the row write
    /// and its failure is only logged.
    pub async fn toggle_like(&self, video_id: &str) -> ServiceResult<LikeOutcome> {
        let user_id = match self.inner.viewer.require("like videos") {
            Ok(user_id) => user_id.to_string(),
            Err(err) => {
                err.log();
                self.inner
                    .notifier
                    .notify(Notification::from_error("Login Required", &err));
                return Err(err);
            }
        };

        // Optimistic flip; `applied` is how far the count actually moved
        let (liked, like_count, applied) = {
            let mut shared = self.inner.shared.lock();
            let Some(item) = shared.state.item(video_id) else {
                return Err(ServiceError::NotFound {
                    resource: "video",
                    id: video_id.to_string(),
                });
            };
            let liked = !shared.state.is_liked(video_id);
            let before = item.counters.like_count;
            let after = if liked {
                before + 1
            } else {
                before.saturating_sub(1)
            };
            let applied = before.abs_diff(after);

            shared.for_each_item_mut(video_id, |item| {
                item.counters.like_count = if liked {
                    item.counters.like_count + applied
                } else {
                    item.counters.like_count.saturating_sub(applied)
                };
            });
            if liked {
                shared.state.liked.insert(video_id.to_string());
            } else {
                shared.state.liked.remove(video_id);
            }
            (liked, after, applied)
        };

        let store = &self.inner.store;
        let written = if liked {
            store.insert_like(&user_id, video_id).await
        } else {
            store.delete_like(&user_id, video_id).await
        };

        if let Err(err) = written {
            err.log();
            {
                let mut shared = self.inner.shared.lock();
                if shared.state.is_liked(video_id) == liked {
                    shared.for_each_item_mut(video_id, |item| {
                        item.counters.like_count = if liked {
                            item.counters.like_count.saturating_sub(applied)
                        } else {
                            item.counters.like_count + applied
                        };
                    });
                    if liked {
                        shared.state.liked.remove(video_id);
                    } else {
                        shared.state.liked.insert(video_id.to_string());
                    }
                    debug!(video_id, "reverted optimistic like toggle");
                }
            }
            self.inner
                .notifier
                .notify(Notification::from_error("Error", &err));
            return Err(err);
        }

        let op = if liked {
            CounterOp::IncrementLikes
        } else {
            CounterOp::DecrementLikes
        };
        if let Err(err) = store.adjust_counter(op, video_id).await {
            warn!(video_id, error = %err, counter = op.function_name(), "like counter update failed");
        }

        Ok(LikeOutcome { liked, like_count })
    }

    /// Count a view of an item
    ///
    /// Only signed-in viewers are counted. Failures are logged and swallowed.
    pub async fn record_view(&self, video_id: &str) {
        if self.inner.viewer.user_id().is_none() {
            debug!(video_id, "guest view not recorded");
            return;
        }

        match self
            .inner
            .store
            .adjust_counter(CounterOp::IncrementViews, video_id)
            .await
        {
            Ok(()) => {
                if self.is_closed() {
                    return;
                }
                self.inner
                    .shared
                    .lock()
                    .for_each_item_mut(video_id, |item| item.counters.view_count += 1);
            }
            Err(err) => {
                warn!(video_id, error = %err, "failed to record view");
            }
        }
    }

    /// Fire-and-forget [`FeedSession::record_view`]
    pub fn spawn_record_view(&self, video_id: impl Into<String>) -> JoinHandle<()> {
        let session = self.clone();
        let video_id = video_id.into();
        tokio::spawn(async move { session.record_view(&video_id).await })
    }
}
