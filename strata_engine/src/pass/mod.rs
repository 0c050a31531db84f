//! Pass module
//!
//! Static pass table, render pass registry and the per-frame semaphore
//! chain that orders submissions.

mod pass_kind;
mod pass_table;
mod pass_registry;
mod sync_chain;

pub use pass_kind::PassKind;
pub use pass_table::{PassTable, PassDescriptor, DrawFilter};
pub use pass_registry::PassRegistry;
pub use sync_chain::{SyncChain, PassState};
