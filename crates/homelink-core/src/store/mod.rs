// ── Reactive state storage ──

mod state_store;
mod stream;

pub use state_store::{StateStore, StoreSnapshot};
pub use stream::StoreStream;
