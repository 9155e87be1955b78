//! Injected collaborators: the current viewer and the notification sink

use error_types::{ServiceError, ServiceResult};
use parking_lot::Mutex;
use tracing::{error, info};

/// Who is using the session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Guest,
    SignedIn { user_id: String },
}

impl Viewer {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Viewer::SignedIn {
            user_id: user_id.into(),
        }
    }

    /// `LIMEY_USER_ID`-style optional id; blank means guest
    pub fn from_user_id(user_id: Option<String>) -> Self {
        match user_id {
            Some(id) if !id.trim().is_empty() => Viewer::signed_in(id.trim()),
            _ => Viewer::Guest,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Viewer::Guest => None,
            Viewer::SignedIn { user_id } => Some(user_id),
        }
    }

    /// Signed-in user id, or `PermissionDenied` for `action`
    pub fn require(&self, action: &str) -> ServiceResult<&str> {
        self.user_id().ok_or_else(|| ServiceError::PermissionDenied {
            action: action.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Transient message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            title: title.into(),
            message: message.into(),
        }
    }

    /// Error notification carrying the error's user-facing message
    ///
    /// Permission failures are informational ("Login Required") rather than
    /// errors.
    pub fn from_error(title: impl Into<String>, err: &ServiceError) -> Self {
        match err {
            ServiceError::PermissionDenied { .. } => {
                Self::info("Login Required", err.user_message())
            }
            _ => Self::error(title, err.user_message()),
        }
    }
}

/// Notification dispatcher
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log; used by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Error => error!(
                title = %notification.title,
                message = %notification.message,
                "notification"
            ),
            _ => info!(
                title = %notification.title,
                message = %notification.message,
                severity = ?notification.severity,
                "notification"
            ),
        }
    }
}

/// Collects notifications for later inspection
#[derive(Debug, Default)]
pub struct NotificationQueue {
    pending: Mutex<Vec<Notification>>,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Notification> {
        self.pending.lock().clone()
    }

    /// Take every pending notification
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl Notifier for NotificationQueue {
    fn notify(&self, notification: Notification) {
        self.pending.lock().push(notification);
    }
}
