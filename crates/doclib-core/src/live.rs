//! Live query handles.
//!
//! A [`LiveQuery`] is the consumer side of a subscribed query: it yields an
//! initial snapshot, then one fresh snapshot per committed write that touches
//! the query's dependency set, until cancelled or dropped.

use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::Result;

/// A live result sequence backed by a recompute worker in the store.
///
/// Recompute failures are delivered as `Err` emissions; the subscription
/// stays alive and recovers on the next successful recompute.
pub struct LiveQuery<T> {
    rx: mpsc::UnboundedReceiver<Result<T>>,
    worker: Option<AbortHandle>,
    cancelled: bool,
}

impl<T> LiveQuery<T> {
    /// Wire a handle to its delivery channel and recompute worker.
    pub fn new(rx: mpsc::UnboundedReceiver<Result<T>>, worker: AbortHandle) -> Self {
        Self {
            rx,
            worker: Some(worker),
            cancelled: false,
        }
    }

    /// Await the next emission. Returns `None` once the subscription has
    /// been cancelled.
    pub async fn next(&mut self) -> Option<Result<T>> {
        if self.cancelled {
            return None;
        }
        self.rx.recv().await
    }

    /// Non-blocking poll for an already-delivered emission.
    pub fn try_next(&mut self) -> Option<Result<T>> {
        if self.cancelled {
            return None;
        }
        self.rx.try_recv().ok()
    }

    /// Stop the subscription. Idempotent; nothing is delivered afterwards,
    /// including results of recomputes already in flight.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.rx.close();
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_noop_worker() -> AbortHandle {
        tokio::spawn(async {
            std::future::pending::<()>().await;
        })
        .abort_handle()
    }

    #[tokio::test]
    async fn test_delivery_and_cancel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut query: LiveQuery<u32> = LiveQuery::new(rx, spawn_noop_worker());

        tx.send(Ok(1)).unwrap();
        assert_eq!(query.next().await.unwrap().unwrap(), 1);

        tx.send(Ok(2)).unwrap();
        query.cancel();

        // Buffered emissions are not delivered after cancellation.
        assert!(query.next().await.is_none());

        // Cancel is idempotent, and the sender sees the channel closed.
        query.cancel();
        assert!(tx.send(Ok(3)).is_err());
    }

    #[tokio::test]
    async fn test_try_next() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut query: LiveQuery<u32> = LiveQuery::new(rx, spawn_noop_worker());

        assert!(query.try_next().is_none());
        tx.send(Ok(7)).unwrap();
        assert_eq!(query.try_next().unwrap().unwrap(), 7);
    }
}
