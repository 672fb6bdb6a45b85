// ── Domain model ──
//
// EntityId and EntitySnapshot are the two primitives everything else is
// built from: an opaque key and a partial field map.

mod entity_id;
mod snapshot;

pub use entity_id::EntityId;
pub use snapshot::EntitySnapshot;
