/// Resilience patterns for remote calls made by the client
///
/// Every call to the backend-as-a-service goes through a timeout. There is
/// no retry or circuit breaker layer: a failed call surfaces to the user once
/// and leaves local state unchanged.
///
/// # Example: Table Query with Timeout
///
/// ```rust,no_run
/// use resilience::{presets, timeout::with_timeout_result};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::table_query_config();
///
///     let result = with_timeout_result(
///         "list videos",
///         config.duration,
///         async {
///             // Your list query
///             Ok::<_, String>(())
///         }
///     ).await;
/// }
/// ```

pub mod presets;
pub mod timeout;

pub use presets::{object_storage_config, rpc_config, table_query_config};
pub use timeout::{with_timeout_result, TimeoutConfig, TimeoutError};
