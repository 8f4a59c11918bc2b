/// Timeout wrapper for store fetches
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, thiserror::Error)]
pub enum TimeoutError {
    #[error("{operation} timed out after {elapsed:?}")]
    Elapsed {
        operation: &'static str,
        elapsed: Duration,
    },
}

/// Execute a future with timeout. The inner result is passed through untouched.
pub async fn with_timeout<F, T>(
    operation: &'static str,
    duration: Duration,
    future: F,
) -> Result<T, TimeoutError>
where
    F: Future<Output = T>,
{
    timeout(duration, future).await.map_err(|_| {
        tracing::warn!(operation, timeout_ms = duration.as_millis() as u64, "store fetch timed out");
        TimeoutError::Elapsed {
            operation,
            elapsed: duration,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_success() {
        let result = with_timeout("answer", Duration::from_secs(1), async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_timeout_elapsed() {
        let result = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            42
        })
        .await;

        match result {
            Err(TimeoutError::Elapsed { operation, .. }) => assert_eq!(operation, "slow"),
            Ok(_) => panic!("expected timeout"),
        }
    }
}
