// ── Push message reconciliation ──
//
// Turns raw push frames into store merges. A frame is a JSON object keyed
// by entity id, each value a partial field map. Unparsable frames are
// dropped whole: prior state is retained, a counter increments, nothing
// crashes. Frames are processed strictly in delivery order by the session's
// pump task; this type itself is synchronous.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::CoreError;
use crate::model::EntityId;
use crate::store::StateStore;

/// The set of entities changed by one push message.
///
/// Empty when a redelivered message carried nothing new -- renderers can
/// use this for incremental redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub changed: Vec<EntityId>,
}

/// Merges raw push messages into the [`StateStore`].
///
/// Cheaply cloneable; all clones share the same store and counters.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<StateStore>,
    motion_edges: Arc<AtomicU64>,
    malformed: Arc<AtomicU64>,
}

impl Reconciler {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            motion_edges: Arc::new(AtomicU64::new(0)),
            malformed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Parse and merge one raw push frame.
    ///
    /// On parse failure the frame is dropped, the malformed counter is
    /// bumped, and [`CoreError::MalformedPayload`] is returned -- the
    /// caller logs and moves on; the store is untouched.
    ///
    /// Merging is idempotent: redelivering an identical frame yields an
    /// empty change set and does not bump the motion counter.
    pub fn on_message(&self, raw: &str) -> Result<MergeOutcome, CoreError> {
        let parsed: Map<String, Value> = match serde_json::from_str(raw) {
            Ok(map) => map,
            Err(e) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(CoreError::MalformedPayload {
                    reason: e.to_string(),
                });
            }
        };

        let mut updates: Vec<(EntityId, Map<String, Value>)> = Vec::with_capacity(parsed.len());
        for (raw_id, value) in parsed {
            let Value::Object(fields) = value else {
                // A non-object entity entry means the whole frame is suspect.
                self.malformed.fetch_add(1, Ordering::Relaxed);
                return Err(CoreError::MalformedPayload {
                    reason: format!("entity '{raw_id}' is not an object"),
                });
            };

            let id = EntityId::from(raw_id);
            self.count_motion_edge(&id, &fields);
            updates.push((id, fields));
        }

        let changed = self.store.apply_update(updates);
        trace!(changed = changed.len(), "push frame merged");
        Ok(MergeOutcome { changed })
    }

    /// Seed the store from the initial REST snapshot, through the same
    /// merge path as push frames (including motion edges).
    pub fn seed(&self, initial: impl IntoIterator<Item = (EntityId, Map<String, Value>)>) -> MergeOutcome {
        let mut updates = Vec::new();
        for (id, fields) in initial {
            self.count_motion_edge(&id, &fields);
            updates.push((id, fields));
        }
        MergeOutcome {
            changed: self.store.apply_update(updates),
        }
    }

    /// Count of `motion_detected` false→true edges observed this session.
    ///
    /// Edge-triggered, not level-triggered: a frame that merely repeats
    /// `true` does not count. Prior absence counts as not-detected, so the
    /// first ever `true` is an edge.
    pub fn motion_edges(&self) -> u64 {
        self.motion_edges.load(Ordering::Relaxed)
    }

    /// Count of dropped unparsable frames this session.
    pub fn malformed_payloads(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    fn count_motion_edge(&self, id: &EntityId, fields: &Map<String, Value>) {
        if fields.get("motion_detected").and_then(Value::as_bool) != Some(true) {
            return;
        }
        let previously = self
            .store
            .get(id)
            .and_then(|snap| snap.flag("motion_detected"))
            .unwrap_or(false);
        if !previously {
            self.motion_edges.fetch_add(1, Ordering::Relaxed);
        }
    }
}
