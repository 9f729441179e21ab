//! Call deadlines and cancellation.
//!
//! Every suspension point of a call (transport exchange, backoff sleep,
//! poll interval) is raced against the call's deadline and the owning
//! client's shutdown signal.

use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Why a guarded await did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    Expired,
    Shutdown,
}

/// Deadline and shutdown subscription for one logical call.
#[derive(Debug)]
pub struct Deadline {
    expires_at: Option<Instant>,
    shutdown: Option<broadcast::Receiver<()>>,
}

impl Deadline {
    pub fn new(timeout: Option<Duration>, shutdown: Option<broadcast::Receiver<()>>) -> Self {
        Self {
            expires_at: timeout.map(|t| Instant::now() + t),
            shutdown,
        }
    }

    /// A deadline that never fires.
    pub fn unbounded() -> Self {
        Self::new(None, None)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Drive `future` to completion unless the deadline or shutdown fires first.
    ///
    /// An interrupted future is dropped, which aborts any in-flight I/O it owns.
    pub async fn run<F: Future>(&mut self, future: F) -> Result<F::Output, Interrupted> {
        let expires_at = self.expires_at;
        let expiry = async move {
            match expires_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        let shutdown = async {
            match self.shutdown.as_mut() {
                // A closed channel means the owner is gone; treat it as shutdown.
                Some(rx) => {
                    let _ = rx.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = shutdown => Err(Interrupted::Shutdown),
            _ = expiry => Err(Interrupted::Expired),
            output = future => Ok(output),
        }
    }

    pub async fn sleep(&mut self, duration: Duration) -> Result<(), Interrupted> {
        if duration.is_zero() {
            return Ok(());
        }
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unbounded_runs_to_completion() {
        let mut deadline = Deadline::unbounded();
        assert_eq!(deadline.run(async { 7 }).await, Ok(7));
        assert!(!deadline.is_expired());
    }

    #[tokio::test]
    async fn test_expiry_interrupts_slow_future() {
        let mut deadline = Deadline::new(Some(Duration::from_millis(20)), None);
        let result = deadline.run(tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(Interrupted::Expired));
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_sleep() {
        let (tx, rx) = broadcast::channel(1);
        let mut deadline = Deadline::new(None, Some(rx));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(());
        });
        let result = deadline.sleep(Duration::from_secs(5)).await;
        assert_eq!(result, Err(Interrupted::Shutdown));
    }
}
