use std::collections::HashMap;

use crate::domain::document::DocumentRecord;
use crate::domain::entry::QaEntry;
use crate::domain::knowledge_base::WorkspaceId;

/// The four mutation kinds that can be in flight against the remote store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PendingKind {
    UploadFile,
    UploadEntry,
    RemoveFile,
    RemoveEntry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEntryUpload {
    pub learned: bool,
    pub file_name: String,
    pub entry: QaEntry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingPayload {
    FileUpload { file_name: String },
    EntryUpload(PendingEntryUpload),
    Removal(DocumentRecord),
}

/// Per-workspace, per-kind ordered record of mutations dispatched to the
/// remote store but not yet reflected in its listing.
///
/// `end` removes by value equality, not FIFO position, so concurrent
/// operations may complete out of order. Entries are never retried; the
/// caller must call `end` on every exit path or the entry leaks.
#[derive(Debug, Default)]
pub struct PendingOperations {
    sets: HashMap<(WorkspaceId, PendingKind), Vec<PendingPayload>>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, workspace: &WorkspaceId, kind: PendingKind, payload: PendingPayload) {
        self.sets.entry((workspace.clone(), kind)).or_default().push(payload);
    }

    /// Removes the first value-equal entry and prunes the sequence when it
    /// empties. Returns whether anything was removed.
    pub fn end(
        &mut self,
        workspace: &WorkspaceId,
        kind: PendingKind,
        payload: &PendingPayload,
    ) -> bool {
        let key = (workspace.clone(), kind);
        let Some(entries) = self.sets.get_mut(&key) else {
            return false;
        };

        let Some(position) = entries.iter().position(|entry| entry == payload) else {
            return false;
        };
        entries.remove(position);

        if entries.is_empty() {
            self.sets.remove(&key);
        }
        true
    }

    pub fn of_kind(&self, workspace: &WorkspaceId, kind: PendingKind) -> &[PendingPayload] {
        self.sets
            .get(&(workspace.clone(), kind))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_idle(&self, workspace: &WorkspaceId) -> bool {
        self.sets.keys().all(|(entry_workspace, _)| entry_workspace != workspace)
    }

    /// Point-in-time view of everything in flight for one workspace, in the
    /// shape the reconciliation engine consumes.
    pub fn snapshot(&self, workspace: &WorkspaceId) -> PendingView {
        let mut view = PendingView::default();

        for payload in self.of_kind(workspace, PendingKind::UploadFile) {
            if let PendingPayload::FileUpload { file_name } = payload {
                view.uploading_files.push(file_name.clone());
            }
        }
        for payload in self.of_kind(workspace, PendingKind::UploadEntry) {
            if let PendingPayload::EntryUpload(upload) = payload {
                view.uploading_entries.push(upload.clone());
            }
        }
        for payload in self.of_kind(workspace, PendingKind::RemoveFile) {
            if let PendingPayload::Removal(document) = payload {
                view.removing_files.push(document.clone());
            }
        }
        for payload in self.of_kind(workspace, PendingKind::RemoveEntry) {
            if let PendingPayload::Removal(document) = payload {
                view.removing_entries.push(document.clone());
            }
        }

        view
    }
}

/// Snapshot of a workspace's in-flight mutations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingView {
    pub uploading_files: Vec<String>,
    pub uploading_entries: Vec<PendingEntryUpload>,
    pub removing_files: Vec<DocumentRecord>,
    pub removing_entries: Vec<DocumentRecord>,
}

impl PendingView {
    pub fn is_empty(&self) -> bool {
        self.uploading_files.is_empty()
            && self.uploading_entries.is_empty()
            && self.removing_files.is_empty()
            && self.removing_entries.is_empty()
    }
}
