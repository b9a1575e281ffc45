//! Per-request deadline and cancellation for store calls.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;

use crate::error::{GeocodeError, Result};
use crate::store::StoreResult;

/// Bounds every store call a request makes.
///
/// A call that outlives the timeout, or is still running when the cancel
/// signal flips to `true`, is dropped and the request fails as a whole.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    timeout: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is signalled; never if there is no signal
    /// or its sender went away.
    async fn cancelled(&self) {
        if let Some(rx) = &self.cancel {
            let mut rx = rx.clone();
            if rx.wait_for(|c| *c).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }

    /// Run one store call under this context
    pub async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.is_cancelled() {
            return Err(GeocodeError::Cancelled);
        }

        let guarded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(GeocodeError::from),
                    Err(_) => Err(GeocodeError::Timeout(limit.as_millis() as u64)),
                },
                None => call.await.map_err(GeocodeError::from),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(GeocodeError::Cancelled),
            result = guarded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[tokio::test]
    async fn test_passes_result_through() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
        let out = ctx.run(async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(out, 7);

        let err = ctx
            .run(async { Err::<(), _>(StoreError::Unavailable("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::StoreUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_abandons_call() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let err = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, StoreError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_cancel_signal() {
        let (tx, rx) = watch::channel(false);
        let ctx = RequestContext::new().with_cancel(rx);

        let pending = ctx.run(async {
            std::future::pending::<()>().await;
            Ok::<_, StoreError>(())
        });
        let cancel = async {
            tokio::task::yield_now().await;
            tx.send(true).ok();
        };
        let (result, _) = tokio::join!(pending, cancel);
        assert!(matches!(result, Err(GeocodeError::Cancelled)));

        // already cancelled: the call is never started
        let err = ctx.run(async { Ok::<_, StoreError>(1) }).await.unwrap_err();
        assert!(matches!(err, GeocodeError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_sender_never_cancels() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        let ctx = RequestContext::new().with_cancel(rx);
        assert_eq!(ctx.run(async { Ok::<_, StoreError>(3) }).await.unwrap(), 3);
    }
}
