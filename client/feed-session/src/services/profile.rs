//! Profile reads, edits and avatar storage

use super::{ServiceContext, DEFAULT_AVATAR_BUCKET};
use crate::models::normalize;
use crate::models::Profile;
use crate::notify::Notification;
use bytes::Bytes;
use error_types::{ServiceError, ServiceResult, ValidationError};
use remote_store::ProfileChanges;
use tracing::info;
use validator::Validate;

const AVATAR_CONTENT_TYPE: &str = "image/jpeg";

/// Edits to the viewer's profile
#[derive(Debug, Clone, Default, Validate)]
pub struct ProfileUpdate {
    pub username: String,
    pub display_name: String,
    #[validate(length(max = 200, message = "Bio must be at most 200 characters"))]
    pub bio: String,
    /// `None` clears the avatar
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            username: self.username.trim().to_string(),
            display_name: self.display_name.trim().to_string(),
            bio: self.bio.trim().to_string(),
            avatar_url: self.avatar_url.filter(|url| !url.trim().is_empty()),
        }
    }
}

pub struct ProfileService {
    ctx: ServiceContext,
    avatar_bucket: String,
}

impl ProfileService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.avatar_bucket = bucket.into();
        self
    }

    /// Storage path of a user's avatar
    pub fn avatar_path(user_id: &str) -> String {
        format!("avatars/{}/profile.jpg", user_id)
    }

    pub async fn fetch(&self, user_id: &str) -> ServiceResult<Profile> {
        let result = match self.ctx.store.fetch_profile(user_id).await {
            Ok(Some(record)) => Ok(normalize::profile(record)),
            Ok(None) => Err(ServiceError::NotFound {
                resource: "profile",
                id: user_id.to_string(),
            }),
            Err(err) => Err(err),
        };
        self.ctx.report("Failed to load profile", result)
    }

    /// The signed-in viewer's own profile
    pub async fn fetch_own(&self) -> ServiceResult<Profile> {
        let user_id = self
            .ctx
            .report("Failed to load profile", self.ctx.viewer.require("view your profile"))?
            .to_string();
        self.fetch(&user_id).await
    }

    pub async fn update(&self, update: ProfileUpdate) -> ServiceResult<()> {
        let result = self.try_update(update).await;
        if result.is_ok() {
            self.ctx
                .notifier
                .notify(Notification::success("Profile updated!", ""));
        }
        self.ctx.report("Failed to update profile", result)
    }

    async fn try_update(&self, update: ProfileUpdate) -> ServiceResult<()> {
        let user_id = self.ctx.viewer.require("update your profile")?;
        update
            .validate()
            .map_err(|e| ValidationError::from_validator("Profile rejected", &e))?;

        self.ctx
            .store
            .update_profile(user_id, &update.into_changes())
            .await?;
        info!(user_id, "profile updated");
        Ok(())
    }

    /// Replace the avatar image and return its public URL
    pub async fn upload_avatar(&self, image: Bytes) -> ServiceResult<String> {
        let result = self.try_upload_avatar(image).await;
        if result.is_ok() {
            self.ctx
                .notifier
                .notify(Notification::success("Profile photo updated!", ""));
        }
        self.ctx.report("Failed to upload photo", result)
    }

    async fn try_upload_avatar(&self, image: Bytes) -> ServiceResult<String> {
        let user_id = self.ctx.viewer.require("change your photo")?;
        if image.is_empty() {
            return Err(ValidationError::new("Avatar rejected")
                .add_field_error("avatar", "required", "Please choose a photo")
                .into());
        }

        let url = self
            .ctx
            .store
            .upload_object(
                &self.avatar_bucket,
                &Self::avatar_path(user_id),
                image,
                AVATAR_CONTENT_TYPE,
                true,
            )
            .await?;
        info!(user_id, "avatar uploaded");
        Ok(url)
    }

    pub async fn remove_avatar(&self) -> ServiceResult<()> {
        let result = match self.ctx.viewer.require("change your photo") {
            Ok(user_id) => {
                self.ctx
                    .store
                    .remove_object(&self.avatar_bucket, &Self::avatar_path(user_id))
                    .await
            }
            Err(err) => Err(err),
        };
        if result.is_ok() {
            self.ctx
                .notifier
                .notify(Notification::success("Profile photo removed", ""));
        }
        self.ctx.report("Failed to remove photo", result)
    }
}
