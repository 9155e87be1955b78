//! Deadline for a single remote call

use std::future::Future;
use std::time::Duration;

/// Deadline applied to one kind of remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    pub duration: Duration,
}

impl TimeoutConfig {
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError<E> {
    /// No response before the deadline; the call was abandoned
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Elapsed { operation: String, after: Duration },
    /// The call finished in time but failed
    #[error("{operation} failed: {error}")]
    Failed { operation: String, error: E },
}

impl<E> TimeoutError<E> {
    pub fn operation(&self) -> &str {
        match self {
            Self::Elapsed { operation, .. } | Self::Failed { operation, .. } => operation,
        }
    }
}

/// Run `future` for `operation`, abandoning it once `deadline` passes
pub async fn with_timeout_result<F, T, E>(
    operation: &str,
    deadline: Duration,
    future: F,
) -> Result<T, TimeoutError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(TimeoutError::Failed {
            operation: operation.to_string(),
            error,
        }),
        Err(_) => {
            tracing::debug!(
                operation,
                timeout_ms = deadline.as_millis() as u64,
                "remote call timed out"
            );
            Err(TimeoutError::Elapsed {
                operation: operation.to_string(),
                after: deadline,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_value_passes_through() {
        let result = with_timeout_result("list videos", Duration::from_secs(1), async {
            Ok::<_, String>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_slow_call_is_abandoned() {
        let result = with_timeout_result("upload media", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, String>(())
        })
        .await;

        match result {
            Err(err @ TimeoutError::Elapsed { .. }) => {
                assert_eq!(err.operation(), "upload media");
                assert_eq!(err.to_string(), "upload media timed out after 10ms");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inner_error_kept() {
        let result = with_timeout_result("like video", Duration::from_secs(1), async {
            Err::<(), _>("connection reset".to_string())
        })
        .await;

        match result {
            Err(TimeoutError::Failed { operation, error }) => {
                assert_eq!(operation, "like video");
                assert_eq!(error, "connection reset");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_runs_on_blocking_executor() {
        let result = tokio_test::block_on(with_timeout_result(
            "view",
            Duration::from_secs(1),
            async { Ok::<_, ()>("ok") },
        ));
        assert_eq!(result.unwrap(), "ok");
    }
}
