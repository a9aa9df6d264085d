//! Audit trail: persistence boundary and the fire-and-forget recorder.

mod recorder;
mod store;

pub use recorder::{AuditRecorder, AuditWriterHandle, AuditWriterStats};
pub use store::{AuditStore, AuditStoreError, InMemoryAuditStore};
