//! Live stream intent
//!
//! Only the stream record is managed here; capture and transport live
//! elsewhere.

use super::ServiceContext;
use crate::models::normalize::{self, TITLE_MAX_CHARS};
use crate::models::LiveStream;
use crate::notify::Notification;
use error_types::validation::rules;
use error_types::{ServiceResult, ValidationError};
use remote_store::NewLiveStream;
use tracing::info;

pub struct LiveStreamService {
    ctx: ServiceContext,
}

impl LiveStreamService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record an active stream for the viewer
    pub async fn start(&self, title: &str, description: &str) -> ServiceResult<LiveStream> {
        let result = self.try_start(title, description).await;
        if let Ok(stream) = &result {
            self.ctx.notifier.notify(Notification::success(
                "Live Stream Started!",
                format!("\"{}\" is now live", stream.title),
            ));
        }
        self.ctx.report("Error", result)
    }

    async fn try_start(&self, title: &str, description: &str) -> ServiceResult<LiveStream> {
        let user_id = self.ctx.viewer.require("go live")?;
        check_title(title)?;

        let record = self
            .ctx
            .store
            .insert_live_stream(&NewLiveStream {
                user_id: user_id.to_string(),
                title: title.trim().to_string(),
                description: description.trim().to_string(),
                is_active: true,
                viewer_count: 0,
            })
            .await?;

        let stream = normalize::live_stream(record);
        info!(stream_id = %stream.id, user_id, "live stream started");
        Ok(stream)
    }

    /// Mark every active stream of the viewer inactive
    pub async fn stop(&self) -> ServiceResult<()> {
        let result = match self.ctx.viewer.require("end live streams") {
            Ok(user_id) => self.ctx.store.deactivate_live_streams(user_id).await,
            Err(err) => Err(err),
        };
        if result.is_ok() {
            info!("live stream ended");
            self.ctx.notifier.notify(Notification::info(
                "Stream Ended",
                "Your live stream has ended",
            ));
        }
        self.ctx.report("Error", result)
    }
}

fn check_title(title: &str) -> Result<(), ValidationError> {
    rules::validate_required("title", title).map_err(|_| {
        ValidationError::new("Stream rejected").add_field_error(
            "title",
            "required",
            "Please enter a title for your live stream",
        )
    })?;
    rules::validate_length("title", title.trim(), None, Some(TITLE_MAX_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_rules() {
        assert!(check_title("Panorama warmup").is_ok());

        let blank = check_title("  ").unwrap_err();
        assert_eq!(
            blank.first_message().unwrap(),
            "Please enter a title for your live stream"
        );

        let long = check_title(&"x".repeat(101)).unwrap_err();
        assert!(long.has_field_code("title", "too_long"));
    }
}
