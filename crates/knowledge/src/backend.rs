use async_trait::async_trait;
use thiserror::Error;

use classbot_core::{
    DocumentContent, DocumentId, DocumentRecord, KnowledgeBaseId, KnowledgeBaseRecord,
    KnowledgeType,
};

use crate::query::KnowledgeAnswer;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("remote knowledge service call failed: {0}")]
    Unavailable(String),
    #[error("entity not found: {0}")]
    NotFound(String),
    #[error("entity already exists: {0}")]
    AlreadyExists(String),
}

/// Everything needed to create one remote document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentSpec {
    pub display_name: String,
    pub mime_type: String,
    pub knowledge_type: KnowledgeType,
    pub content: DocumentContent,
}

/// Remote capability contract, one method per remote operation. Implemented
/// by the real transport and by [`crate::memory::InMemoryKnowledgeBackend`].
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    async fn create_knowledge_base(
        &self,
        display_name: &str,
    ) -> Result<KnowledgeBaseRecord, BackendError>;

    async fn get_knowledge_base(
        &self,
        id: &KnowledgeBaseId,
    ) -> Result<KnowledgeBaseRecord, BackendError>;

    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseRecord>, BackendError>;

    /// `force` removes a non-empty knowledge base and its documents in one
    /// call.
    async fn delete_knowledge_base(
        &self,
        id: &KnowledgeBaseId,
        force: bool,
    ) -> Result<(), BackendError>;

    async fn create_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        spec: DocumentSpec,
    ) -> Result<DocumentRecord, BackendError>;

    async fn get_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<DocumentRecord, BackendError>;

    async fn list_documents(
        &self,
        knowledge_base: &KnowledgeBaseId,
    ) -> Result<Vec<DocumentRecord>, BackendError>;

    async fn delete_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<(), BackendError>;

    /// Confidence-scored answers for a free-text question, best first.
    async fn query(
        &self,
        session_key: &str,
        knowledge_base: &KnowledgeBaseId,
        text: &str,
    ) -> Result<Vec<KnowledgeAnswer>, BackendError>;
}
