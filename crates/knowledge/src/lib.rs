//! Knowledge service adapter.
//!
//! The remote knowledge-base service is an external collaborator reached
//! through the [`backend::KnowledgeBackend`] trait. [`service::KnowledgeService`]
//! wraps any backend with the name-keyed entity caches and the cache
//! consistency discipline: every mutating call updates the caches
//! synchronously, and every destructive call resolves its target into a full
//! entity first so no separate invalidation channel is needed.

pub mod backend;
pub mod memory;
pub mod query;
pub mod service;

pub use backend::{BackendError, DocumentSpec, KnowledgeBackend};
pub use memory::InMemoryKnowledgeBackend;
pub use query::{ConfidenceLevel, KnowledgeAnswer};
pub use service::KnowledgeService;
