pub mod config;
pub mod models;
pub mod notify;
pub mod search;
pub mod services;
pub mod session;

pub use config::Config;
pub use models::{
    Category, ContentItem, Counters, FeedSource, LiveStream, LoadingState, Profile, SessionState,
};
pub use notify::{Notification, NotificationQueue, Notifier, Severity, TracingNotifier, Viewer};
pub use services::{
    LiveStreamService, ProfileService, ProfileUpdate, ServiceContext, UploadRequest, UploadService,
};
pub use session::{FeedSession, LikeOutcome, SessionOptions};
