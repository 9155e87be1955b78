//! Unified error types for the Limey client crates
//!
//! Every failure a feed session, upload or profile edit can hit is one of a
//! small set of kinds. Each error knows:
//!
//! 1. **What to tell the user**: a short transient notification message
//! 2. **How loud to log**: client mistakes at debug, dependency trouble at warn
//! 3. **No PII in messages**: identifiers stay out of `Display`

use std::fmt;
use thiserror::Error;

pub mod validation;

pub use validation::{FieldError, ValidationError};

/// Coarse failure classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure, non-success response or undecodable payload
    Network,
    /// Input rejected before any remote call
    Validation,
    /// Mutation attempted without a signed-in user
    Permission,
    /// Missing profile or record
    NotFound,
    /// Anything else
    Internal,
}

/// Core error type shared by the client crates
///
/// # Example
/// ```rust
/// use error_types::ServiceError;
///
/// fn require_user(user_id: Option<&str>) -> Result<&str, ServiceError> {
///     user_id.ok_or_else(|| ServiceError::PermissionDenied {
///         action: "like videos".to_string(),
///     })
/// }
///
/// assert!(require_user(None).is_err());
/// ```
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Remote call failed
    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },

    /// Validation failed
    #[error("Validation failed")]
    Validation {
        #[from]
        source: ValidationError,
    },

    /// Signed-in user required
    #[error("Sign in required to {action}")]
    PermissionDenied { action: String },

    /// Resource not found
    #[error("Resource not found: {resource}")]
    NotFound { resource: &'static str, id: String },

    /// Timeout
    #[error("Operation timed out")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Internal error (catch-all)
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl ServiceError {
    /// Build a network error for a named remote operation
    pub fn network(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Create internal error from any error type
    pub fn internal<E: Into<anyhow::Error>>(error: E) -> Self {
        Self::Internal {
            source: error.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => ErrorKind::Network,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::PermissionDenied { .. } => ErrorKind::Permission,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Message suitable for a transient notification
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => "Network problem. Please try again.".to_string(),
            Self::Validation { source } => source
                .first_message()
                .unwrap_or_else(|| source.message.clone()),
            Self::PermissionDenied { action } => format!("Please log in to {}", action),
            Self::NotFound { resource, .. } => format!("{} not found", capitalize(resource)),
            Self::Timeout { .. } => "The request took too long. Please try again.".to_string(),
            Self::Internal { .. } => "Something went wrong".to_string(),
        }
    }

    /// Log error with appropriate level and context
    pub fn log(&self) {
        match self {
            Self::Validation { .. } | Self::NotFound { .. } => {
                tracing::debug!(error = ?self, "Client error");
            }
            Self::PermissionDenied { .. } => {
                tracing::warn!(error = ?self, "Authorization failure");
            }
            Self::Network { .. } | Self::Timeout { .. } => {
                tracing::warn!(error = ?self, "Dependency issue");
            }
            Self::Internal { .. } => {
                tracing::error!(error = ?self, "Internal error");
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Result type alias for client operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Attach context to foreign errors, turning them into [`ServiceError::Internal`]
pub trait ErrorContext<T> {
    fn context<C>(self, context: C) -> ServiceResult<T>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Lazy variant, only evaluated on error
    fn with_context<C, F>(self, f: F) -> ServiceResult<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> ServiceResult<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| ServiceError::internal(anyhow::Error::new(e).context(context)))
    }

    fn with_context<C, F>(self, f: F) -> ServiceResult<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| ServiceError::internal(anyhow::Error::new(e).context(f())))
    }
}
