//! Cancellation plumbing shared by repositories and the unit of work.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::DomainError;

/// Runs `future` unless `token` is cancelled first.
///
/// An already-cancelled token wins over a ready future, so a cancelled
/// request never starts new I/O.
///
/// # Errors
///
/// Returns `DomainError::Cancelled` if the token fires first, otherwise
/// whatever `future` returns.
pub async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, DomainError>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(DomainError::Cancelled),
        result = future => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cancellable_returns_future_result_when_not_cancelled() {
        let token = CancellationToken::new();

        let result = cancellable(&token, async { Ok::<_, DomainError>(7) }).await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancellable_prefers_cancellation_over_ready_future() {
        let token = CancellationToken::new();
        token.cancel();

        let result = cancellable(&token, async { Ok::<_, DomainError>(7) }).await;

        assert!(matches!(result, Err(DomainError::Cancelled)));
    }
}
