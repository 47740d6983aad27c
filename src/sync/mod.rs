//! Product synchronization state machine.
//!
//! Decides, for every local mutation, whether the remote platform needs a
//! create, an update, or nothing, and commits the outcome back into the
//! local row. The local store is the system of record: a failed remote
//! call never rolls back or blocks the local mutation, it only marks the
//! product `sync_failed` so a later explicit sync can retry.

mod engine;

pub use engine::{SyncEngine, SyncEngineError, SyncOutcome};
