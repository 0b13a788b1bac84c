//! The directory gateway capability.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{DirectoryError, Result};
use crate::types::{ComputerRecord, ManagedSecret, UserProfile};

/// Capability interface to the directory service.
///
/// All methods are asynchronous. Lookups that find nothing resolve to
/// `Ok(None)` or `Ok(false)`; only transport failures produce an error.
#[allow(async_fn_in_trait)]
pub trait DirectoryGateway: Send + Sync + 'static {
    /// Resolves a hostname to a machine object, if one exists.
    fn find_computer(
        &self,
        hostname: &str,
    ) -> impl Future<Output = Result<Option<ComputerRecord>>> + Send;

    /// Retrieves the managed local administrator secret for a machine.
    fn get_managed_secret(
        &self,
        hostname: &str,
    ) -> impl Future<Output = Result<Option<ManagedSecret>>> + Send;

    /// Verifies credentials, returning the profile on success.
    fn authenticate(
        &self,
        user_id: &str,
        password: &str,
    ) -> impl Future<Output = Result<Option<UserProfile>>> + Send;

    /// Checks membership of the administrative group.
    fn is_member_of_admin_group(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Runs a gateway call under a deadline.
///
/// A slow or unreachable directory must never stall an approval; deadline
/// expiry surfaces as [`DirectoryError::Timeout`].
///
/// # Errors
///
/// Returns the inner call's error, or `Timeout` when the deadline elapses.
pub async fn with_timeout<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(deadline_ms = deadline.as_millis() as u64, "directory call timed out");
            Err(DirectoryError::Timeout {
                millis: deadline.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_timeout_passes_fast_results() {
        let result = with_timeout(Duration::from_secs(1), async { Ok(42) }).await;
        assert_eq!(result.expect("ok"), 42);
    }

    #[tokio::test]
    async fn with_timeout_propagates_inner_error() {
        let result: Result<()> = with_timeout(Duration::from_secs(1), async {
            Err(DirectoryError::Transport {
                reason: "connection refused".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(DirectoryError::Transport { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn with_timeout_cuts_off_slow_calls() {
        let result: Result<()> = with_timeout(Duration::from_millis(100), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(DirectoryError::Timeout { millis: 100 })));
    }
}
