// Document sync: one live buffer kept consistent with disk while an external
// process may rewrite the same file.

pub mod debounce;
pub mod engine;
pub mod state;

pub use debounce::SaveDebouncer;
pub use engine::{run_document_loop, DocumentCommand, DocumentSyncEngine, DocumentView, SyncError};
pub use state::{
    DocumentBuffer, ExternalDecision, ExternalOutcome, IgnoreReason, PendingWrite, SyncPhase,
    SyncTimings,
};
