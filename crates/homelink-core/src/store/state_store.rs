// ── Central reactive state store ──
//
// Thread-safe storage for the last-known snapshot of every tracked entity.
// Mutations are broadcast to subscribers via a `watch` channel carrying a
// sorted full snapshot, rebuilt once per applied message so each push
// message lands atomically.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::stream::StoreStream;
use crate::model::{EntityId, EntitySnapshot};

/// One full-store snapshot: `(id, entity snapshot)` pairs sorted by id.
pub type StoreSnapshot = Arc<Vec<(EntityId, Arc<EntitySnapshot>)>>;

/// Last-known state of every tracked entity.
///
/// Invariants:
/// - at most one [`EntitySnapshot`] per [`EntityId`];
/// - merges overlay only the fields present in the incoming update
///   (last-write-per-field) -- absent fields are never cleared;
/// - all entities in one update are applied before subscribers see any of
///   them (one snapshot rebuild per update).
pub struct StateStore {
    entities: DashMap<EntityId, Arc<EntitySnapshot>>,

    /// Version counter, bumped once per applied update.
    version: watch::Sender<u64>,

    /// Full sorted snapshot, rebuilt on mutation for cheap subscription.
    snapshot: watch::Sender<StoreSnapshot>,
}

impl StateStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            entities: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Apply one update (all entities of one push message) atomically.
    ///
    /// Each entry overlays only the fields it carries onto the entity's
    /// existing snapshot. Returns the ids whose stored state actually
    /// changed -- re-applying an identical update returns an empty set,
    /// which is what makes redelivery idempotent and lets renderers redraw
    /// incrementally.
    pub fn apply_update(&self, updates: Vec<(EntityId, Map<String, Value>)>) -> Vec<EntityId> {
        let mut changed = Vec::new();

        for (id, fields) in updates {
            let merged = match self.entities.get(&id) {
                Some(existing) => {
                    let mut snap = (**existing).clone();
                    let mut any_change = false;
                    for (field, value) in fields {
                        any_change |= snap.set(field, value);
                    }
                    if !any_change {
                        continue;
                    }
                    snap
                }
                None => EntitySnapshot::from(fields),
            };

            self.entities.insert(id.clone(), Arc::new(merged));
            changed.push(id);
        }

        if !changed.is_empty() {
            self.rebuild_snapshot();
            self.version.send_modify(|v| *v += 1);
        }

        changed
    }

    /// Look up one entity's current snapshot.
    pub fn get(&self, id: &EntityId) -> Option<Arc<EntitySnapshot>> {
        self.entities.get(id).map(|r| Arc::clone(r.value()))
    }

    /// Current full snapshot (cheap `Arc` clone), sorted by entity id.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> StoreStream {
        StoreStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Current version counter value.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(EntityId, Arc<EntitySnapshot>)> = self
            .entities
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(entries));
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("fixtures must be objects"),
        }
    }

    #[test]
    fn merge_overlays_only_present_fields() {
        let store = StateStore::new();
        let id = EntityId::new("switch-1");

        store.apply_update(vec![(
            id.clone(),
            fields(json!({ "power": 5, "mode": "auto" })),
        )]);
        store.apply_update(vec![(id.clone(), fields(json!({ "power": 5 })))]);

        let snap = store.get(&id).unwrap();
        assert_eq!(snap.text("mode"), Some("auto"));
        assert_eq!(snap.integer("power"), Some(5));
    }

    #[test]
    fn merge_is_idempotent() {
        let store = StateStore::new();
        let id = EntityId::new("switch-1");
        let update = fields(json!({ "is_on": true, "brightness": 70 }));

        let first = store.apply_update(vec![(id.clone(), update.clone())]);
        let before = store.get(&id).unwrap();
        let second = store.apply_update(vec![(id.clone(), update)]);
        let after = store.get(&id).unwrap();

        assert_eq!(first, vec![id]);
        assert!(second.is_empty(), "identical redelivery must change nothing");
        assert_eq!(*before, *after);
    }

    #[test]
    fn initial_load_then_partial_push() {
        let store = StateStore::new();
        let id = EntityId::new("switch-1");

        store.apply_update(vec![(
            id.clone(),
            fields(json!({ "is_on": false, "brightness": 40 })),
        )]);
        store.apply_update(vec![(id.clone(), fields(json!({ "is_on": true })))]);

        let snap = store.get(&id).unwrap();
        assert_eq!(snap.flag("is_on"), Some(true));
        assert_eq!(snap.integer("brightness"), Some(40));
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let store = StateStore::new();
        store.apply_update(vec![
            (EntityId::new("switch-2"), fields(json!({ "is_on": true }))),
            (
                EntityId::new("motion-1"),
                fields(json!({ "motion_detected": false })),
            ),
        ]);

        let snap = store.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].0.as_str(), "motion-1");
        assert_eq!(snap[1].0.as_str(), "switch-2");
    }

    #[test]
    fn one_message_bumps_version_once() {
        let store = StateStore::new();
        assert_eq!(store.version(), 0);

        store.apply_update(vec![
            (EntityId::new("a"), fields(json!({ "x": 1 }))),
            (EntityId::new("b"), fields(json!({ "y": 2 }))),
        ]);

        assert_eq!(store.version(), 1);
    }

    #[test]
    fn no_op_update_does_not_notify() {
        let store = StateStore::new();
        let id = EntityId::new("a");
        store.apply_update(vec![(id.clone(), fields(json!({ "x": 1 })))]);

        let v = store.version();
        store.apply_update(vec![(id, fields(json!({ "x": 1 })))]);
        assert_eq!(store.version(), v);
    }
}
