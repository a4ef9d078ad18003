//! Orchestrates the whole entry/file lifecycle: permission gating,
//! duplicate detection, optimistic dashboard publishes around every remote
//! mutation, question answering, and instructor-answer learning.
//!
//! All collaborators sit behind traits so tests can run against the
//! in-memory backend with recording doubles. Mutations for one workspace are
//! serialized through a per-workspace lock; the duplicate check, the pending
//! registration, and the remote call happen under it, which is what makes
//! two near-simultaneous identical submissions resolve to one accept and one
//! reject.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use classbot_core::responses::{context_footer, not_set_up_response, unknown_answer_response};
use classbot_core::{
    assemble, is_duplicate_entry, is_duplicate_file, DocumentClass, DocumentContent, KnowledgeType,
    PendingEntryUpload, PendingKind, PendingOperations, PendingPayload, QaEntry, WorkspaceId,
};
use classbot_knowledge::{BackendError, ConfidenceLevel, KnowledgeService};

use crate::blocks::HomeView;
use crate::capture::{self, AnswerCapture};
use crate::events::MessageEvent;
use crate::home::{
    no_permission_home, render_home, setting_up_home, BLOCK_ENTRY_ANSWER, BLOCK_ENTRY_QUESTION,
    BLOCK_FILE_URL,
};

const ENTRY_MIME: &str = "text/csv";
const LEARN_REACTION: &str = "brain";

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("chat surface call failed: {0}")]
    Api(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("file could not be retrieved: {0}")]
    Unavailable(String),
}

/// Answers "may this user manage the knowledge base".
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn is_admin(&self, workspace: &WorkspaceId, user_id: &str) -> Result<bool, SurfaceError>;
}

/// Looks up the text of an existing message, used to resolve the question
/// half of a captured answer.
#[async_trait]
pub trait ChatHistory: Send + Sync {
    async fn message_text(&self, channel: &str, ts: &str)
        -> Result<Option<String>, SurfaceError>;
}

#[async_trait]
pub trait ChatReactions: Send + Sync {
    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), SurfaceError>;
}

/// Publishes a rendered home view for one user.
#[async_trait]
pub trait HomeSink: Send + Sync {
    async fn publish(
        &self,
        workspace: &WorkspaceId,
        user_id: &str,
        view: HomeView,
    ) -> Result<(), SurfaceError>;
}

/// Installation credential store, only consulted on uninstall.
#[async_trait]
pub trait InstallationStore: Send + Sync {
    async fn delete_all(&self, workspace: &WorkspaceId) -> Result<(), SurfaceError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllDirectory;

#[async_trait]
impl UserDirectory for AllowAllDirectory {
    async fn is_admin(&self, _: &WorkspaceId, _: &str) -> Result<bool, SurfaceError> {
        Ok(true)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopChatHistory;

#[async_trait]
impl ChatHistory for NoopChatHistory {
    async fn message_text(&self, _: &str, _: &str) -> Result<Option<String>, SurfaceError> {
        Ok(None)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopChatReactions;

#[async_trait]
impl ChatReactions for NoopChatReactions {
    async fn add_reaction(&self, _: &str, _: &str, _: &str) -> Result<(), SurfaceError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHomeSink;

#[async_trait]
impl HomeSink for NoopHomeSink {
    async fn publish(&self, _: &WorkspaceId, _: &str, _: HomeView) -> Result<(), SurfaceError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopInstallationStore;

#[async_trait]
impl InstallationStore for NoopInstallationStore {
    async fn delete_all(&self, _: &WorkspaceId) -> Result<(), SurfaceError> {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoFileFetcher;

#[async_trait]
impl FileFetcher for NoFileFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        Err(FetchError::Unavailable(format!("no file fetcher configured for {url}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub block_id: String,
    pub message: String,
}

impl FieldError {
    pub fn new(block_id: &str, message: &str) -> Self {
        Self { block_id: block_id.to_owned(), message: message.to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    FieldErrors(Vec<FieldError>),
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalKind {
    File,
    Entry,
}

impl RemovalKind {
    fn pending_kind(self) -> PendingKind {
        match self {
            Self::File => PendingKind::RemoveFile,
            Self::Entry => PendingKind::RemoveEntry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    Accepted,
    /// Target already gone; nothing to do.
    Ignored,
    Failed(String),
}

pub struct AssistantService {
    knowledge: Arc<KnowledgeService>,
    pending: Mutex<PendingOperations>,
    workspace_locks: Mutex<HashMap<WorkspaceId, Arc<Mutex<()>>>>,
    directory: Arc<dyn UserDirectory>,
    history: Arc<dyn ChatHistory>,
    reactions: Arc<dyn ChatReactions>,
    home_sink: Arc<dyn HomeSink>,
    installations: Arc<dyn InstallationStore>,
    fetcher: Arc<dyn FileFetcher>,
}

impl AssistantService {
    pub fn new(knowledge: Arc<KnowledgeService>) -> Self {
        Self {
            knowledge,
            pending: Mutex::new(PendingOperations::new()),
            workspace_locks: Mutex::new(HashMap::new()),
            directory: Arc::new(AllowAllDirectory),
            history: Arc::new(NoopChatHistory),
            reactions: Arc::new(NoopChatReactions),
            home_sink: Arc::new(NoopHomeSink),
            installations: Arc::new(NoopInstallationStore),
            fetcher: Arc::new(NoFileFetcher),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn ChatHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn with_reactions(mut self, reactions: Arc<dyn ChatReactions>) -> Self {
        self.reactions = reactions;
        self
    }

    pub fn with_home_sink(mut self, home_sink: Arc<dyn HomeSink>) -> Self {
        self.home_sink = home_sink;
        self
    }

    pub fn with_installations(mut self, installations: Arc<dyn InstallationStore>) -> Self {
        self.installations = installations;
        self
    }

    pub fn with_file_fetcher(mut self, fetcher: Arc<dyn FileFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub async fn is_admin(&self, workspace: &WorkspaceId, user_id: &str) -> bool {
        match self.directory.is_admin(workspace, user_id).await {
            Ok(admin) => admin,
            Err(error) => {
                warn!(workspace = workspace.as_str(), user_id, error = %error,
                    "admin lookup failed; denying");
                false
            }
        }
    }

    /// Renders the dashboard for one user from the reconciled remote and
    /// pending state.
    pub async fn render_dashboard(&self, workspace: &WorkspaceId, user_id: &str) -> HomeView {
        if !self.is_admin(workspace, user_id).await {
            return no_permission_home();
        }
        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return setting_up_home();
        };

        let remote = self.knowledge.list_documents(&kb.id).await;
        let pending = self.pending.lock().await.snapshot(workspace);
        render_home(&assemble(&remote, &pending))
    }

    pub async fn publish_dashboard(&self, workspace: &WorkspaceId, user_id: &str) {
        let view = self.render_dashboard(workspace, user_id).await;
        if let Err(error) = self.home_sink.publish(workspace, user_id, view).await {
            warn!(workspace = workspace.as_str(), user_id, error = %error,
                "home view publish failed");
        }
    }

    /// Uploads one question/answer entry. The duplicate check, pending
    /// registration, and remote call run under the workspace lock; the
    /// pending entry is released on every exit path, so a failed upload
    /// never leaves a phantom "Uploading..." slot behind.
    pub async fn begin_entry_upload(
        &self,
        workspace: &WorkspaceId,
        user_id: &str,
        question: &str,
        answer: &str,
        learned: bool,
    ) -> SubmissionOutcome {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return SubmissionOutcome::FieldErrors(vec![
                FieldError::new(BLOCK_ENTRY_QUESTION, "Question and answer are required."),
                FieldError::new(BLOCK_ENTRY_ANSWER, "Question and answer are required."),
            ]);
        }

        let lock = self.workspace_lock(workspace).await;
        let _guard = lock.lock().await;

        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return SubmissionOutcome::Failed("workspace has no knowledge base yet".to_owned());
        };

        let entry = QaEntry::new(question, answer);
        let remote = self.knowledge.list_documents(&kb.id).await;
        let pending_view = self.pending.lock().await.snapshot(workspace);
        if is_duplicate_entry(&entry.fingerprint(), &remote, &pending_view) {
            return SubmissionOutcome::FieldErrors(vec![
                FieldError::new(BLOCK_ENTRY_QUESTION, "This entry already exists!"),
                FieldError::new(BLOCK_ENTRY_ANSWER, "This entry already exists!"),
            ]);
        }

        let file_name = entry.file_name(learned);
        let payload = PendingPayload::EntryUpload(PendingEntryUpload {
            learned,
            file_name: file_name.clone(),
            entry: entry.clone(),
        });
        self.pending.lock().await.begin(workspace, PendingKind::UploadEntry, payload.clone());
        self.publish_dashboard(workspace, user_id).await;

        let result = self
            .knowledge
            .create_document(
                &kb.id,
                file_name,
                ENTRY_MIME,
                KnowledgeType::Faq,
                Some(DocumentContent::Inline(entry.encode().into_bytes())),
            )
            .await;

        self.pending.lock().await.end(workspace, PendingKind::UploadEntry, &payload);
        self.publish_dashboard(workspace, user_id).await;

        match result {
            Ok(Some(_)) => SubmissionOutcome::Accepted,
            Ok(None) => SubmissionOutcome::Failed("no entry content supplied".to_owned()),
            Err(error) => {
                warn!(workspace = workspace.as_str(), error = %error, "entry upload failed");
                SubmissionOutcome::Failed(error.to_string())
            }
        }
    }

    /// Fetches a linked file and hands it to [`Self::begin_file_upload`].
    pub async fn handle_add_file_submission(
        &self,
        workspace: &WorkspaceId,
        user_id: &str,
        url: &str,
    ) -> SubmissionOutcome {
        let file = match self.fetcher.fetch(url.trim()).await {
            Ok(file) => file,
            Err(error) => {
                debug!(workspace = workspace.as_str(), error = %error, "file fetch failed");
                return SubmissionOutcome::FieldErrors(vec![FieldError::new(
                    BLOCK_FILE_URL,
                    "File could not be retrieved.",
                )]);
            }
        };

        self.begin_file_upload(workspace, user_id, &file.file_name, &file.mime_type, file.bytes)
            .await
    }

    pub async fn begin_file_upload(
        &self,
        workspace: &WorkspaceId,
        user_id: &str,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> SubmissionOutcome {
        let Some(knowledge_type) = KnowledgeType::for_mime(mime_type) else {
            return SubmissionOutcome::FieldErrors(vec![FieldError::new(
                BLOCK_FILE_URL,
                "Unknown file type",
            )]);
        };

        let lock = self.workspace_lock(workspace).await;
        let _guard = lock.lock().await;

        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return SubmissionOutcome::Failed("workspace has no knowledge base yet".to_owned());
        };

        let remote = self.knowledge.list_documents(&kb.id).await;
        let pending_view = self.pending.lock().await.snapshot(workspace);
        if is_duplicate_file(file_name, &remote, &pending_view) {
            return SubmissionOutcome::FieldErrors(vec![FieldError::new(
                BLOCK_FILE_URL,
                "This entry already exists!",
            )]);
        }

        let payload = PendingPayload::FileUpload { file_name: file_name.to_owned() };
        self.pending.lock().await.begin(workspace, PendingKind::UploadFile, payload.clone());
        self.publish_dashboard(workspace, user_id).await;

        let result = self
            .knowledge
            .create_document(
                &kb.id,
                file_name,
                mime_type,
                knowledge_type,
                Some(DocumentContent::Inline(bytes)),
            )
            .await;

        self.pending.lock().await.end(workspace, PendingKind::UploadFile, &payload);
        self.publish_dashboard(workspace, user_id).await;

        match result {
            Ok(Some(_)) => SubmissionOutcome::Accepted,
            Ok(None) => SubmissionOutcome::Failed("no file content supplied".to_owned()),
            Err(error) => {
                warn!(workspace = workspace.as_str(), file_name, error = %error,
                    "file upload failed");
                SubmissionOutcome::Failed(error.to_string())
            }
        }
    }

    /// Removes one document. The document disappears from the dashboard the
    /// moment the removal is registered, before the remote delete completes.
    /// A target that is already gone is a silent no-op.
    pub async fn begin_removal(
        &self,
        workspace: &WorkspaceId,
        user_id: &str,
        document_name: &str,
        kind: RemovalKind,
    ) -> RemovalOutcome {
        let lock = self.workspace_lock(workspace).await;
        let _guard = lock.lock().await;

        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return RemovalOutcome::Ignored;
        };
        let Some(document) = self.knowledge.document_by_name(&kb.id, document_name).await else {
            return RemovalOutcome::Ignored;
        };

        let payload = PendingPayload::Removal(document.clone());
        self.pending.lock().await.begin(workspace, kind.pending_kind(), payload.clone());
        self.publish_dashboard(workspace, user_id).await;

        let result = self.knowledge.delete_document(&kb.id, &document.id).await;

        self.pending.lock().await.end(workspace, kind.pending_kind(), &payload);
        self.publish_dashboard(workspace, user_id).await;

        match result {
            Ok(()) => RemovalOutcome::Accepted,
            Err(error) => {
                warn!(workspace = workspace.as_str(), document_name, error = %error,
                    "document removal failed");
                RemovalOutcome::Failed(error.to_string())
            }
        }
    }

    /// Answers a free-text question. Anything below high confidence gets a
    /// canned unknown-answer reply; a confident answer is attributed with a
    /// footer naming where it came from.
    pub async fn handle_incoming_question(
        &self,
        text: &str,
        workspace: &WorkspaceId,
        user_id: &str,
    ) -> String {
        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return not_set_up_response(user_id);
        };

        let session_key = format!("{}_{}", workspace.as_str(), user_id);
        let answers = match self.knowledge.query(&session_key, &kb.id, text).await {
            Ok(answers) => answers,
            Err(error) => {
                warn!(workspace = workspace.as_str(), error = %error, "knowledge query failed");
                return unknown_answer_response();
            }
        };

        let Some(best) = answers.into_iter().next() else {
            return unknown_answer_response();
        };
        if best.confidence != ConfidenceLevel::High {
            return unknown_answer_response();
        }

        let document =
            match self.knowledge.document_by_id(&kb.id, &best.source_document_id).await {
                Ok(document) => document,
                Err(error) => {
                    warn!(workspace = workspace.as_str(), error = %error,
                        "answer source lookup failed");
                    return unknown_answer_response();
                }
            };

        let class = document.class();
        // Entry answers carry the leading pipe from the wire encoding.
        let answer = match class {
            DocumentClass::ManualEntry | DocumentClass::LearnedEntry => {
                best.text.strip_prefix('|').unwrap_or(&best.text).to_owned()
            }
            DocumentClass::BulkFile => best.text,
        };
        format!("{answer}{}", context_footer(class))
    }

    /// Learns from an instructor reply when the message carries one of the
    /// capture shapes. Returns whether an entry was recorded.
    pub async fn capture_instructor_answer(&self, event: &MessageEvent) -> bool {
        if !self.is_admin(&event.workspace, &event.user_id).await {
            return false;
        }
        let Some(captured) = capture::detect(event) else {
            return false;
        };

        let (question, answer) = match captured {
            AnswerCapture::LinkedMessage { channel, ts, answer } => {
                match self.history.message_text(&channel, &ts).await {
                    Ok(Some(question)) => (question, answer),
                    Ok(None) => return false,
                    Err(error) => {
                        warn!(error = %error, "linked message lookup failed");
                        return false;
                    }
                }
            }
            AnswerCapture::ThreadReply { channel, parent_ts, answer } => {
                match self.history.message_text(&channel, &parent_ts).await {
                    Ok(Some(question)) => (question, answer),
                    Ok(None) => return false,
                    Err(error) => {
                        warn!(error = %error, "thread parent lookup failed");
                        return false;
                    }
                }
            }
            AnswerCapture::SharedAttachment { question, answer } => (question, answer),
        };

        let question = capture::strip_mentions(&question);
        let outcome = self
            .begin_entry_upload(&event.workspace, &event.user_id, &question, &answer, true)
            .await;
        if outcome != SubmissionOutcome::Accepted {
            return false;
        }

        if let Err(error) =
            self.reactions.add_reaction(&event.channel_id, &event.ts, LEARN_REACTION).await
        {
            warn!(channel = %event.channel_id, error = %error, "learn reaction failed");
        }
        true
    }

    /// Creates the workspace knowledge base if it does not exist yet.
    pub async fn on_workspace_installed(
        &self,
        workspace: &WorkspaceId,
    ) -> Result<(), BackendError> {
        let lock = self.workspace_lock(workspace).await;
        let _guard = lock.lock().await;

        if self.knowledge.knowledge_base_by_name(workspace).await.is_none() {
            self.knowledge.create_knowledge_base(workspace).await?;
        }
        Ok(())
    }

    /// Tears down everything owned by a workspace: stored installation
    /// credentials first, then the knowledge base with all its documents.
    pub async fn on_workspace_uninstalled(&self, workspace: &WorkspaceId) {
        if let Err(error) = self.installations.delete_all(workspace).await {
            warn!(workspace = workspace.as_str(), error = %error,
                "installation teardown failed");
        }

        let lock = self.workspace_lock(workspace).await;
        let _guard = lock.lock().await;

        let Some(kb) = self.knowledge.knowledge_base_by_name(workspace).await else {
            return;
        };
        if let Err(error) = self.knowledge.delete_knowledge_base(&kb.id).await {
            warn!(workspace = workspace.as_str(), error = %error,
                "knowledge base teardown failed");
        }
    }

    pub async fn pending_idle(&self, workspace: &WorkspaceId) -> bool {
        self.pending.lock().await.is_idle(workspace)
    }

    async fn workspace_lock(&self, workspace: &WorkspaceId) -> Arc<Mutex<()>> {
        self.workspace_locks
            .lock()
            .await
            .entry(workspace.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
