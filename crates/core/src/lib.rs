//! Core domain logic for the classroom assistant.
//!
//! Everything in this crate is side-effect free: value records for knowledge
//! bases and documents, the entry wire codec and its fingerprint, the
//! name-keyed entity cache, the pending-operation tracker, and the
//! reconciliation engine that merges remote and pending state into one
//! render-ready dashboard view. Network and UI concerns live in the
//! `classbot-knowledge` and `classbot-slack` crates.

pub mod cache;
pub mod config;
pub mod domain;
pub mod pending;
pub mod reconcile;
pub mod responses;

pub use cache::EntityCache;
pub use domain::document::{
    classify, DocumentClass, DocumentContent, DocumentId, DocumentRecord, KnowledgeType,
};
pub use domain::entry::{name_carries_fingerprint, EntryDecodeError, QaEntry};
pub use domain::knowledge_base::{KnowledgeBaseId, KnowledgeBaseRecord, WorkspaceId};
pub use pending::{PendingEntryUpload, PendingKind, PendingOperations, PendingPayload, PendingView};
pub use reconcile::{assemble, is_duplicate_entry, is_duplicate_file, DashboardState};
