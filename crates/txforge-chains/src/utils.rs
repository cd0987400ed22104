//! Shared helpers for chain client implementations.

use crate::ChainError;
use std::future::Future;
use std::time::Duration;

/// Bounds an RPC call by `limit`, reporting expiry as a retryable
/// [`ChainError::Timeout`] instead of hanging the request.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ChainError>
where
	F: Future<Output = Result<T, ChainError>>,
{
	match tokio::time::timeout(limit, call).await {
		Ok(result) => result,
		Err(_) => Err(ChainError::Timeout(limit)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn passes_through_fast_calls() {
		let result = with_timeout(Duration::from_secs(1), async { Ok::<_, ChainError>(7) }).await;
		assert_eq!(result.unwrap(), 7);
	}

	#[tokio::test]
	async fn reports_expiry_as_timeout() {
		let result = with_timeout(Duration::from_millis(5), async {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Ok::<_, ChainError>(7)
		})
		.await;
		assert!(matches!(result, Err(ChainError::Timeout(_))));
	}

	#[tokio::test]
	async fn inner_errors_are_preserved() {
		let result: Result<u8, _> = with_timeout(Duration::from_secs(1), async {
			Err(ChainError::Transport("boom".into()))
		})
		.await;
		assert!(matches!(result, Err(ChainError::Transport(_))));
	}
}
