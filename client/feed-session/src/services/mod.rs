//! Write-side services: upload, profile editing and live streams
//!
//! Every service works on behalf of the injected [`Viewer`] and reports
//! outcomes through the injected [`Notifier`].

pub mod live;
pub mod profile;
pub mod upload;

pub use live::LiveStreamService;
pub use profile::{ProfileService, ProfileUpdate};
pub use upload::{UploadRequest, UploadService};

use crate::notify::{Notification, Notifier, Viewer};
use error_types::ServiceResult;
use remote_store::RemoteStore;
use std::sync::Arc;

pub const DEFAULT_MEDIA_BUCKET: &str = "limey-db";
pub const DEFAULT_AVATAR_BUCKET: &str = "limeytt-uploads";

/// Collaborators shared by the services
#[derive(Clone)]
pub struct ServiceContext {
    pub store: Arc<dyn RemoteStore>,
    pub viewer: Viewer,
    pub notifier: Arc<dyn Notifier>,
}

impl ServiceContext {
    pub fn new(store: Arc<dyn RemoteStore>, viewer: Viewer, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            viewer,
            notifier,
        }
    }

    /// Log and notify a failed outcome, passing the result through
    pub(crate) fn report<T>(&self, title: &str, result: ServiceResult<T>) -> ServiceResult<T> {
        if let Err(err) = &result {
            err.log();
            self.notifier.notify(Notification::from_error(title, err));
        }
        result
    }
}
