// ── Store subscriptions ──
//
// Subscription handle for consuming state changes from the StateStore.

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::state_store::StoreSnapshot;

/// A subscription to the store's full snapshot.
///
/// Provides both point-in-time access and reactive change notification.
/// Readers never observe a half-applied push message: the store rebuilds
/// the snapshot once per message.
pub struct StoreStream {
    current: StoreSnapshot,
    receiver: watch::Receiver<StoreSnapshot>,
}

impl StoreStream {
    pub(crate) fn new(receiver: watch::Receiver<StoreSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation time (or the last `changed()`).
    pub fn current(&self) -> &StoreSnapshot {
        &self.current
    }

    /// The latest snapshot (may have changed since `current`).
    pub fn latest(&self) -> StoreSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` if the store has been dropped.
    pub async fn changed(&mut self) -> Option<StoreSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Adapt into a `futures`-style `Stream` of snapshots, for consumers
    /// that combine sources.
    pub fn into_stream(self) -> WatchStream<StoreSnapshot> {
        WatchStream::new(self.receiver)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::{Map, Value, json};
    use tokio_stream::StreamExt;

    use crate::model::EntityId;
    use crate::store::StateStore;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("fixtures must be objects"),
        }
    }

    #[tokio::test]
    async fn changed_delivers_whole_message_snapshots() {
        let store = StateStore::new();
        let mut stream = store.subscribe();
        assert!(stream.current().is_empty());

        // Both entities arrive in one message; a subscriber must never see
        // a snapshot containing only one of them.
        store.apply_update(vec![
            (EntityId::new("switch-1"), fields(json!({ "is_on": true }))),
            (
                EntityId::new("motion-1"),
                fields(json!({ "motion_detected": false })),
            ),
        ]);

        let snap = stream.changed().await.unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(stream.current().len(), 2);
    }

    #[tokio::test]
    async fn latest_reflects_updates_without_awaiting() {
        let store = StateStore::new();
        let stream = store.subscribe();

        store.apply_update(vec![(EntityId::new("a"), fields(json!({ "x": 1 })))]);

        assert!(stream.current().is_empty(), "current is the capture point");
        assert_eq!(stream.latest().len(), 1);
    }

    #[tokio::test]
    async fn into_stream_yields_snapshots() {
        let store = StateStore::new();
        let mut snapshots = store.subscribe().into_stream();

        // WatchStream yields the value held at subscription first.
        let first = snapshots.next().await.unwrap();
        assert!(first.is_empty());

        store.apply_update(vec![(EntityId::new("a"), fields(json!({ "x": 1 })))]);
        let second = snapshots.next().await.unwrap();
        assert_eq!(second.len(), 1);
    }
}
