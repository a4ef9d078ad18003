use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use classbot_core::{
    DocumentContent, DocumentId, DocumentRecord, EntityCache, KnowledgeBaseId,
    KnowledgeBaseRecord, KnowledgeType, WorkspaceId,
};

use crate::backend::{BackendError, DocumentSpec, KnowledgeBackend};
use crate::query::KnowledgeAnswer;

/// Cache-maintaining wrapper around a [`KnowledgeBackend`].
///
/// Knowledge bases are cached under the project scope keyed by display name
/// (the workspace id); documents under their knowledge base keyed by display
/// name. Lookups are cache-first with a single full-listing refresh on miss;
/// a second miss is genuine absence. Every destructive call resolves its
/// target into a full entity first so the eviction can happen by name.
pub struct KnowledgeService {
    backend: Arc<dyn KnowledgeBackend>,
    project_id: String,
    knowledge_bases: Mutex<EntityCache<KnowledgeBaseRecord>>,
    documents: Mutex<EntityCache<DocumentRecord>>,
}

impl KnowledgeService {
    pub fn new(project_id: impl Into<String>, backend: Arc<dyn KnowledgeBackend>) -> Self {
        Self {
            backend,
            project_id: project_id.into(),
            knowledge_bases: Mutex::new(EntityCache::new()),
            documents: Mutex::new(EntityCache::new()),
        }
    }

    pub async fn create_knowledge_base(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<KnowledgeBaseRecord, BackendError> {
        let record = self.backend.create_knowledge_base(workspace.as_str()).await?;
        self.knowledge_bases
            .lock()
            .await
            .put(&self.project_id, &record.display_name, record.clone());
        Ok(record)
    }

    /// Cache-first lookup by workspace name with one listing refresh on miss.
    pub async fn knowledge_base_by_name(
        &self,
        workspace: &WorkspaceId,
    ) -> Option<KnowledgeBaseRecord> {
        if let Some(record) =
            self.knowledge_bases.lock().await.get(&self.project_id, workspace.as_str())
        {
            return Some(record);
        }

        match self.backend.list_knowledge_bases().await {
            Ok(listing) => {
                self.knowledge_bases.lock().await.refresh_scope(
                    &self.project_id,
                    listing.into_iter().map(|record| (record.display_name.clone(), record)),
                );
            }
            Err(error) => {
                warn!(error = %error, "knowledge base listing failed; keeping cached view");
            }
        }

        self.knowledge_bases.lock().await.get(&self.project_id, workspace.as_str())
    }

    /// Cascading delete: evicts every owned document and the knowledge base
    /// itself from the caches, then removes the remote entity with force so
    /// non-empty knowledge bases go in one call. Fails loudly when the
    /// knowledge base is already absent.
    pub async fn delete_knowledge_base(&self, id: &KnowledgeBaseId) -> Result<(), BackendError> {
        let record = self.backend.get_knowledge_base(id).await?;

        let owned = self.list_documents(id).await;
        {
            let mut documents = self.documents.lock().await;
            for document in &owned {
                documents.remove(id.as_str(), &document.display_name);
            }
        }
        self.knowledge_bases.lock().await.remove(&self.project_id, &record.display_name);

        self.backend.delete_knowledge_base(id, true).await
    }

    /// `source = None` is a caller error, answered with `Ok(None)` rather
    /// than a service failure.
    pub async fn create_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        display_name: impl Into<String>,
        mime_type: impl Into<String>,
        knowledge_type: KnowledgeType,
        source: Option<DocumentContent>,
    ) -> Result<Option<DocumentRecord>, BackendError> {
        let Some(content) = source else {
            return Ok(None);
        };

        let spec = DocumentSpec {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            knowledge_type,
            content,
        };
        let record = self.backend.create_document(knowledge_base, spec).await?;
        self.documents
            .lock()
            .await
            .put(knowledge_base.as_str(), &record.display_name, record.clone());
        Ok(Some(record))
    }

    /// Best-effort listing: refreshes the document cache scope on success and
    /// degrades to an empty sequence on failure (a stale or empty view beats
    /// a crashed render).
    pub async fn list_documents(&self, knowledge_base: &KnowledgeBaseId) -> Vec<DocumentRecord> {
        match self.backend.list_documents(knowledge_base).await {
            Ok(listing) => {
                self.documents.lock().await.refresh_scope(
                    knowledge_base.as_str(),
                    listing.iter().map(|record| (record.display_name.clone(), record.clone())),
                );
                listing
            }
            Err(error) => {
                warn!(
                    knowledge_base = knowledge_base.as_str(),
                    error = %error,
                    "document listing failed; degrading to empty view"
                );
                Vec::new()
            }
        }
    }

    /// Cache-first lookup with one listing refresh on miss.
    pub async fn document_by_name(
        &self,
        knowledge_base: &KnowledgeBaseId,
        display_name: &str,
    ) -> Option<DocumentRecord> {
        if let Some(record) = self.documents.lock().await.get(knowledge_base.as_str(), display_name)
        {
            return Some(record);
        }

        self.list_documents(knowledge_base).await;

        self.documents.lock().await.get(knowledge_base.as_str(), display_name)
    }

    pub async fn document_by_id(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<DocumentRecord, BackendError> {
        self.backend.get_document(knowledge_base, id).await
    }

    /// The remote delete is id-keyed but the cache is name-keyed, so the
    /// document is fetched first to learn its name. Fails when absent.
    pub async fn delete_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<(), BackendError> {
        let record = self.backend.get_document(knowledge_base, id).await?;
        self.documents.lock().await.remove(knowledge_base.as_str(), &record.display_name);
        self.backend.delete_document(knowledge_base, id).await
    }

    pub async fn query(
        &self,
        session_key: &str,
        knowledge_base: &KnowledgeBaseId,
        text: &str,
    ) -> Result<Vec<KnowledgeAnswer>, BackendError> {
        self.backend.query(session_key, knowledge_base, text).await
    }

    /// Cache introspection, used by teardown assertions.
    pub async fn cached_document_count(&self, knowledge_base: &KnowledgeBaseId) -> usize {
        self.documents.lock().await.scope_len(knowledge_base.as_str())
    }

    pub async fn cached_knowledge_base_count(&self) -> usize {
        self.knowledge_bases.lock().await.scope_len(&self.project_id)
    }
}
