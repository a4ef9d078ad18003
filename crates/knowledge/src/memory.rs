use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use classbot_core::{DocumentId, DocumentRecord, KnowledgeBaseId, KnowledgeBaseRecord};

use crate::backend::{BackendError, DocumentSpec, KnowledgeBackend};
use crate::query::KnowledgeAnswer;

/// HashMap-backed backend for tests and offline runs. Mints uuid ids,
/// enforces the same uniqueness rules as the remote service, and supports
/// scripted query answers plus failure toggles.
#[derive(Default)]
pub struct InMemoryKnowledgeBackend {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    knowledge_bases: HashMap<String, KnowledgeBaseRecord>,
    documents: HashMap<String, Vec<DocumentRecord>>,
    scripted_answers: HashMap<String, Vec<KnowledgeAnswer>>,
    fail_listing: bool,
    fail_document_creation: bool,
}

impl InMemoryKnowledgeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the answers returned for an exact question text.
    pub async fn script_answers(&self, question: &str, answers: Vec<KnowledgeAnswer>) {
        self.state.lock().await.scripted_answers.insert(question.to_owned(), answers);
    }

    pub async fn set_listing_failure(&self, fail: bool) {
        self.state.lock().await.fail_listing = fail;
    }

    pub async fn set_document_creation_failure(&self, fail: bool) {
        self.state.lock().await.fail_document_creation = fail;
    }

    pub async fn document_count(&self, knowledge_base: &KnowledgeBaseId) -> usize {
        self.state
            .lock()
            .await
            .documents
            .get(knowledge_base.as_str())
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl KnowledgeBackend for InMemoryKnowledgeBackend {
    async fn create_knowledge_base(
        &self,
        display_name: &str,
    ) -> Result<KnowledgeBaseRecord, BackendError> {
        let mut state = self.state.lock().await;
        if state.knowledge_bases.values().any(|record| record.display_name == display_name) {
            return Err(BackendError::AlreadyExists(display_name.to_owned()));
        }

        let id = KnowledgeBaseId(Uuid::new_v4().to_string());
        let record = KnowledgeBaseRecord { id: id.clone(), display_name: display_name.to_owned() };
        state.knowledge_bases.insert(id.0.clone(), record.clone());
        state.documents.insert(id.0, Vec::new());
        Ok(record)
    }

    async fn get_knowledge_base(
        &self,
        id: &KnowledgeBaseId,
    ) -> Result<KnowledgeBaseRecord, BackendError> {
        self.state
            .lock()
            .await
            .knowledge_bases
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("knowledge base {}", id.as_str())))
    }

    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBaseRecord>, BackendError> {
        let state = self.state.lock().await;
        if state.fail_listing {
            return Err(BackendError::Unavailable("scripted listing failure".to_owned()));
        }
        Ok(state.knowledge_bases.values().cloned().collect())
    }

    async fn delete_knowledge_base(
        &self,
        id: &KnowledgeBaseId,
        force: bool,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let owned = state.documents.get(id.as_str()).map(Vec::len).unwrap_or(0);
        if owned > 0 && !force {
            return Err(BackendError::Unavailable(format!(
                "knowledge base {} is not empty",
                id.as_str()
            )));
        }

        state
            .knowledge_bases
            .remove(id.as_str())
            .ok_or_else(|| BackendError::NotFound(format!("knowledge base {}", id.as_str())))?;
        state.documents.remove(id.as_str());
        Ok(())
    }

    async fn create_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        spec: DocumentSpec,
    ) -> Result<DocumentRecord, BackendError> {
        let mut state = self.state.lock().await;
        if state.fail_document_creation {
            return Err(BackendError::Unavailable("scripted creation failure".to_owned()));
        }
        if !state.knowledge_bases.contains_key(knowledge_base.as_str()) {
            return Err(BackendError::NotFound(format!(
                "knowledge base {}",
                knowledge_base.as_str()
            )));
        }

        let documents = state.documents.entry(knowledge_base.as_str().to_owned()).or_default();
        if documents.iter().any(|record| record.display_name == spec.display_name) {
            return Err(BackendError::AlreadyExists(spec.display_name));
        }

        let record = DocumentRecord {
            id: DocumentId(Uuid::new_v4().to_string()),
            display_name: spec.display_name,
            mime_type: spec.mime_type,
            content: spec.content,
        };
        documents.push(record.clone());
        Ok(record)
    }

    async fn get_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<DocumentRecord, BackendError> {
        self.state
            .lock()
            .await
            .documents
            .get(knowledge_base.as_str())
            .and_then(|documents| documents.iter().find(|record| &record.id == id))
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("document {}", id.as_str())))
    }

    async fn list_documents(
        &self,
        knowledge_base: &KnowledgeBaseId,
    ) -> Result<Vec<DocumentRecord>, BackendError> {
        let state = self.state.lock().await;
        if state.fail_listing {
            return Err(BackendError::Unavailable("scripted listing failure".to_owned()));
        }
        state
            .documents
            .get(knowledge_base.as_str())
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("knowledge base {}", knowledge_base.as_str())))
    }

    async fn delete_document(
        &self,
        knowledge_base: &KnowledgeBaseId,
        id: &DocumentId,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let documents = state
            .documents
            .get_mut(knowledge_base.as_str())
            .ok_or_else(|| BackendError::NotFound(format!("knowledge base {}", knowledge_base.as_str())))?;

        let position = documents
            .iter()
            .position(|record| &record.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("document {}", id.as_str())))?;
        documents.remove(position);
        Ok(())
    }

    async fn query(
        &self,
        _session_key: &str,
        knowledge_base: &KnowledgeBaseId,
        text: &str,
    ) -> Result<Vec<KnowledgeAnswer>, BackendError> {
        let state = self.state.lock().await;
        if !state.knowledge_bases.contains_key(knowledge_base.as_str()) {
            return Err(BackendError::NotFound(format!(
                "knowledge base {}",
                knowledge_base.as_str()
            )));
        }
        Ok(state.scripted_answers.get(text).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use classbot_core::{DocumentContent, KnowledgeType};

    use super::InMemoryKnowledgeBackend;
    use crate::backend::{BackendError, DocumentSpec, KnowledgeBackend};

    fn csv_spec(name: &str) -> DocumentSpec {
        DocumentSpec {
            display_name: name.to_owned(),
            mime_type: "text/csv".to_owned(),
            knowledge_type: KnowledgeType::Faq,
            content: DocumentContent::Inline(b"\"q\",\"|a\"".to_vec()),
        }
    }

    #[tokio::test]
    async fn knowledge_base_names_are_unique() {
        let backend = InMemoryKnowledgeBackend::new();
        backend.create_knowledge_base("T1").await.expect("first");

        let error = backend.create_knowledge_base("T1").await.expect_err("second");
        assert!(matches!(error, BackendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn document_names_are_unique_within_a_knowledge_base() {
        let backend = InMemoryKnowledgeBackend::new();
        let kb = backend.create_knowledge_base("T1").await.expect("kb");
        backend.create_document(&kb.id, csv_spec("faq.csv")).await.expect("first");

        let error = backend.create_document(&kb.id, csv_spec("faq.csv")).await.expect_err("dup");
        assert!(matches!(error, BackendError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn force_delete_removes_non_empty_knowledge_base() {
        let backend = InMemoryKnowledgeBackend::new();
        let kb = backend.create_knowledge_base("T1").await.expect("kb");
        backend.create_document(&kb.id, csv_spec("faq.csv")).await.expect("doc");

        let error = backend.delete_knowledge_base(&kb.id, false).await.expect_err("unforced");
        assert!(matches!(error, BackendError::Unavailable(_)));

        backend.delete_knowledge_base(&kb.id, true).await.expect("forced");
        assert!(backend.get_knowledge_base(&kb.id).await.is_err());
    }
}
