//! Content upload

use super::{ServiceContext, DEFAULT_MEDIA_BUCKET};
use crate::models::normalize::Normalizer;
use crate::models::{Category, ContentItem};
use crate::notify::Notification;
use bytes::Bytes;
use chrono::Utc;
use error_types::validation::rules;
use error_types::{ServiceError, ServiceResult, ValidationError};
use remote_store::{CounterOp, NewVideoRecord};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};
use validator::Validate;

const ACCEPTED_MEDIA_PREFIXES: [&str; 3] = ["video/", "image/", "audio/"];

/// A file the viewer wants to publish
#[derive(Debug, Clone, Validate)]
pub struct UploadRequest {
    #[validate(length(max = 100, message = "Title must be at most 100 characters"))]
    pub title: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub category: Category,
    pub tags: Vec<String>,
    pub file_name: String,
    /// MIME type of `bytes`
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadRequest {
    /// Request titled after the file name
    pub fn from_file(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Bytes,
    ) -> Self {
        let file_name = file_name.into();
        Self {
            title: Self::title_from_file_name(&file_name),
            description: None,
            category: Category::All,
            tags: Vec::new(),
            file_name,
            content_type: content_type.into(),
            bytes,
        }
    }

    /// File stem with its first letter capitalized: `sweet pan.mp4` → `Sweet pan`
    pub fn title_from_file_name(file_name: &str) -> String {
        let base = file_name.rsplit(is_path_separator).next().unwrap_or(file_name);
        let stem = match base.rfind('.') {
            Some(idx) if idx > 0 => &base[..idx],
            _ => base,
        };
        let mut chars = stem.trim().chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Every rule the request breaks
    pub fn check(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new("Upload rejected");

        if let Err(derived) = self.validate() {
            errors = errors.merge(ValidationError::from_validator("Upload rejected", &derived));
        }
        if let Err(missing) = rules::validate_required("title", &self.title) {
            errors = errors.merge(relabel(missing, "title", "Please add a title"));
        }
        if self.file_name.trim().is_empty() || self.bytes.is_empty() {
            errors = errors.add_field_error("file", "required", "Please select a file");
        }
        if !ACCEPTED_MEDIA_PREFIXES
            .iter()
            .any(|prefix| self.content_type.starts_with(prefix))
        {
            errors = errors.add_field_error(
                "file",
                "unsupported",
                "Only video, image or audio files can be uploaded",
            );
        }

        if errors.has_errors() {
            Err(errors)
        } else {
            Ok(())
        }
    }

    /// Final path segment of the file name
    fn object_name(&self) -> &str {
        let trimmed = self.file_name.trim();
        trimmed.rsplit(is_path_separator).next().unwrap_or(trimmed)
    }

    /// Explicit tags plus `#hashtags` found in the description, first spelling wins
    fn all_tags(&self) -> Vec<String> {
        let from_description = self
            .description
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .filter_map(|word| word.strip_prefix('#'))
            .map(|tag| tag.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_'));

        let mut seen = HashSet::new();
        self.tags
            .iter()
            .map(|t| t.trim())
            .chain(from_description)
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

fn is_path_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Replace the messages recorded for `field`
fn relabel(mut errors: ValidationError, field: &str, message: &str) -> ValidationError {
    if let Some(field_errors) = errors.field_errors.get_mut(field) {
        for error in field_errors.iter_mut() {
            error.message = message.to_string();
        }
    }
    errors
}

pub struct UploadService {
    ctx: ServiceContext,
    normalizer: Normalizer,
    media_bucket: String,
}

impl UploadService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            normalizer: Normalizer::default(),
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.media_bucket = bucket.into();
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Store the file, publish the item and bump the owner's video count
    ///
    /// Guests and invalid requests are rejected before any remote call.
    pub async fn upload(&self, request: UploadRequest) -> ServiceResult<ContentItem> {
        let result = self.try_upload(request).await;
        if let Ok(item) = &result {
            self.ctx.notifier.notify(Notification::success(
                "Upload Successful!",
                format!("\"{}\" has been uploaded to Limey", item.title),
            ));
        }
        self.ctx.report("Upload Failed", result)
    }

    async fn try_upload(&self, request: UploadRequest) -> ServiceResult<ContentItem> {
        let user_id = self.ctx.viewer.require("upload videos")?.to_string();
        request.check()?;

        let path = format!(
            "{}/{}-{}",
            user_id,
            Utc::now().timestamp_millis(),
            request.object_name()
        );
        let size = request.bytes.len();
        let media_url = self
            .ctx
            .store
            .upload_object(
                &self.media_bucket,
                &path,
                request.bytes.clone(),
                &request.content_type,
                false,
            )
            .await?;

        let record = NewVideoRecord {
            user_id: user_id.clone(),
            title: request.title.trim().to_string(),
            description: request
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            video_url: media_url,
            thumbnail_url: self.normalizer.placeholder_thumbnail().to_string(),
            category: request.category.label().to_string(),
            tags: request.all_tags(),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            is_trending: false,
            is_featured: false,
        };
        let stored = match self.ctx.store.insert_video(&record).await {
            Ok(stored) => stored,
            Err(err) => {
                self.discard_object(&path).await;
                return Err(err);
            }
        };

        if let Err(err) = self
            .ctx
            .store
            .adjust_counter(CounterOp::IncrementVideoCount, &user_id)
            .await
        {
            warn!(user_id = %user_id, error = %err, "video count update failed");
        }

        let item = self
            .normalizer
            .content_item(stored, &HashMap::new())
            .ok_or_else(|| ServiceError::network("upload videos", "stored row is incomplete"))?;

        info!(video_id = %item.id, path = %path, size, "video uploaded");
        Ok(item)
    }

    /// Best-effort removal of media whose row was never written
    async fn discard_object(&self, path: &str) {
        match self.ctx.store.remove_object(&self.media_bucket, path).await {
            Ok(()) => debug!(path, "orphaned upload removed"),
            Err(err) => warn!(path, error = %err, "orphaned upload left in storage"),
        }
    }
}
