//! Table-change broker.
//!
//! An explicit observer registry decoupled from SQLite's own notification
//! hooks: each live query registers the set of tables it reads, and every
//! committed write publishes the set of tables it touched. Publication
//! happens inside the writer's critical section, so tick order equals
//! commit order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::debug;

use doclib_core::TableSet;

struct Subscription {
    id: u64,
    deps: TableSet,
    ticks: mpsc::UnboundedSender<TableSet>,
}

/// Registry of active subscriptions, keyed by the tables they depend on.
#[derive(Default)]
pub struct ChangeBroker {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl ChangeBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription over `deps`. The receiver gets one tick per
    /// committed write whose touched set intersects `deps`.
    pub fn subscribe(&self, deps: TableSet) -> (u64, mpsc::UnboundedReceiver<TableSet>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.push(Subscription {
            id,
            deps,
            ticks: tx,
        });

        debug!("Registered subscription {} over {}", id, deps);
        (id, rx)
    }

    /// Release a subscription registration. Idempotent.
    pub fn unsubscribe(&self, id: u64) {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.retain(|s| s.id != id);
    }

    /// Fan a committed write's touched set out to every intersecting
    /// subscription. Subscriptions whose receiver is gone are pruned.
    pub fn publish(&self, touched: TableSet) {
        if touched.is_empty() {
            return;
        }

        let mut subscriptions = self.subscriptions.lock().unwrap();
        subscriptions.retain(|s| {
            if !s.deps.intersects(touched) {
                return true;
            }
            s.ticks.send(touched).is_ok()
        });
    }

    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doclib_core::Table;

    #[tokio::test]
    async fn test_publish_reaches_intersecting_subscribers() {
        let broker = ChangeBroker::new();
        let (_a, mut favorites) = broker.subscribe(TableSet::of(Table::Favorites));
        let (_b, mut notes) = broker.subscribe(TableSet::of(Table::Notes));

        broker.publish(TableSet::of(Table::Favorites));

        assert_eq!(favorites.recv().await.unwrap(), TableSet::of(Table::Favorites));
        assert!(notes.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_ticks() {
        let broker = ChangeBroker::new();
        let (id, mut rx) = broker.subscribe(TableSet::of(Table::Notes));

        broker.unsubscribe(id);
        broker.unsubscribe(id); // idempotent
        broker.publish(TableSet::of(Table::Notes));

        assert!(rx.try_recv().is_err());
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_receivers_are_pruned() {
        let broker = ChangeBroker::new();
        let (_id, rx) = broker.subscribe(TableSet::of(Table::SearchIndex));
        drop(rx);

        broker.publish(TableSet::of(Table::SearchIndex));
        assert_eq!(broker.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_one_tick_per_publish() {
        let broker = ChangeBroker::new();
        let deps = TableSet::of(Table::Favorites).with(Table::RecentFiles);
        let (_id, mut rx) = broker.subscribe(deps);

        broker.publish(TableSet::of(Table::Favorites));
        broker.publish(TableSet::of(Table::RecentFiles));
        broker.publish(TableSet::of(Table::Notes));

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }
}
