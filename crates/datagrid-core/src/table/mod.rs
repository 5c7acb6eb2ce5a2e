//! Table orchestrator (UI-agnostic).
//!
//! Raw rows flow through filtering, sorting and formula evaluation into the
//! processed view, which either pagination or the virtualizer narrows to the
//! rows to render. Selection and column settings sit beside the pipeline.

mod io;
mod ops;
mod process;
mod snapshot;
mod state;

pub use snapshot::{SnapshotListener, SubscriptionId, TableSnapshot, TableStats};
pub use state::{DataTable, Features, TableConfig};
