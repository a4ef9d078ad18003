//! Merges the remote document listing with the pending-operation snapshot
//! into one deduplicated, order-stable dashboard state.
//!
//! A renderer that trusted only the remote list would flicker or double-count
//! in the window between dispatching a mutation and its completion: an
//! uploading document may already appear in the listing while its pending
//! entry has not been popped yet, and a deleted document may still be listed
//! while its removal is in flight. This module owns both suppressions.

use std::collections::HashSet;

use crate::domain::document::{DocumentClass, DocumentRecord};
use crate::domain::entry::{name_carries_fingerprint, QaEntry};
use crate::pending::PendingView;

/// Render-ready dashboard contents for one workspace. Pending uploads come
/// first within each bucket, then confirmed documents in listing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardState {
    pub manual: Vec<EntrySlot>,
    pub learned: Vec<EntrySlot>,
    pub files: Vec<FileSlot>,
}

impl DashboardState {
    /// The learned section is only shown once something learned exists; the
    /// manual and file sections always render (with placeholders if empty).
    pub fn show_learned_section(&self) -> bool {
        !self.learned.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntrySlot {
    Uploading { question: String, answer: String },
    Confirmed { file_name: String, question: String, answer: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSlot {
    Uploading { file_name: String },
    Confirmed { file_name: String },
}

/// An entry submission is a duplicate if its fingerprint is embedded in any
/// remote document name, or any in-flight entry upload for the workspace
/// carries the same fingerprint. The pending half is what rejects the second
/// of two near-simultaneous identical submissions.
pub fn is_duplicate_entry(
    fingerprint: &str,
    remote: &[DocumentRecord],
    pending: &PendingView,
) -> bool {
    remote.iter().any(|document| name_carries_fingerprint(&document.display_name, fingerprint))
        || pending
            .uploading_entries
            .iter()
            .any(|upload| name_carries_fingerprint(&upload.file_name, fingerprint))
}

/// Files deduplicate by display name against both remote and pending state.
pub fn is_duplicate_file(file_name: &str, remote: &[DocumentRecord], pending: &PendingView) -> bool {
    remote.iter().any(|document| document.display_name == file_name)
        || pending.uploading_files.iter().any(|pending_name| pending_name == file_name)
}

pub fn assemble(remote: &[DocumentRecord], pending: &PendingView) -> DashboardState {
    let removing_entries: HashSet<&str> =
        pending.removing_entries.iter().map(|document| document.display_name.as_str()).collect();
    let removing_files: HashSet<&str> =
        pending.removing_files.iter().map(|document| document.display_name.as_str()).collect();
    let uploading_entry_names: HashSet<&str> =
        pending.uploading_entries.iter().map(|upload| upload.file_name.as_str()).collect();
    let uploading_file_names: HashSet<&str> =
        pending.uploading_files.iter().map(String::as_str).collect();

    let mut state = DashboardState::default();

    for upload in &pending.uploading_entries {
        let slot = EntrySlot::Uploading {
            question: upload.entry.question.clone(),
            answer: upload.entry.answer.clone(),
        };
        if upload.learned {
            state.learned.push(slot);
        } else {
            state.manual.push(slot);
        }
    }
    for file_name in &pending.uploading_files {
        state.files.push(FileSlot::Uploading { file_name: file_name.clone() });
    }

    for document in remote {
        match document.class() {
            DocumentClass::ManualEntry | DocumentClass::LearnedEntry => {
                // Optimistically hidden while its delete is in flight, and
                // suppressed while its upload still has a pending entry (the
                // listing can race ahead of the pending-set pop).
                if removing_entries.contains(document.display_name.as_str())
                    || uploading_entry_names.contains(document.display_name.as_str())
                {
                    continue;
                }
                let Some(slot) = confirmed_entry_slot(document) else {
                    continue;
                };
                if document.class() == DocumentClass::ManualEntry {
                    state.manual.push(slot);
                } else {
                    state.learned.push(slot);
                }
            }
            DocumentClass::BulkFile => {
                if removing_files.contains(document.display_name.as_str())
                    || uploading_file_names.contains(document.display_name.as_str())
                {
                    continue;
                }
                state.files.push(FileSlot::Confirmed { file_name: document.display_name.clone() });
            }
        }
    }

    state
}

/// Entry documents we wrote ourselves always decode; anything else under an
/// entry header was not authored through this assistant and is not rendered.
fn confirmed_entry_slot(document: &DocumentRecord) -> Option<EntrySlot> {
    let bytes = document.content.inline_bytes()?;
    let raw = std::str::from_utf8(bytes).ok()?;
    let entry = QaEntry::decode(raw).ok()?;
    Some(EntrySlot::Confirmed {
        file_name: document.display_name.clone(),
        question: entry.question,
        answer: entry.answer,
    })
}

#[cfg(test)]
mod tests {
    use super::{assemble, is_duplicate_entry, is_duplicate_file, EntrySlot, FileSlot};
    use crate::domain::document::{DocumentContent, DocumentId, DocumentRecord};
    use crate::domain::entry::QaEntry;
    use crate::pending::{PendingEntryUpload, PendingView};

    fn entry_document(question: &str, answer: &str, learned: bool) -> DocumentRecord {
        let entry = QaEntry::new(question, answer);
        DocumentRecord {
            id: DocumentId(format!("doc-{question}")),
            display_name: entry.file_name(learned),
            mime_type: "text/csv".to_owned(),
            content: DocumentContent::Inline(entry.encode().into_bytes()),
        }
    }

    fn file_document(name: &str) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId(format!("doc-{name}")),
            display_name: name.to_owned(),
            mime_type: "application/pdf".to_owned(),
            content: DocumentContent::Uri(format!("https://files.example/{name}")),
        }
    }

    fn pending_entry(question: &str, answer: &str, learned: bool) -> PendingEntryUpload {
        let entry = QaEntry::new(question, answer);
        let file_name = entry.file_name(learned);
        PendingEntryUpload { learned, file_name, entry }
    }

    #[test]
    fn duplicate_entry_detected_against_remote_listing() {
        let remote = vec![entry_document("What is X?", "X is Y.", false)];
        let fingerprint = QaEntry::new("What is X?", "X is Y.").fingerprint();

        assert!(is_duplicate_entry(&fingerprint, &remote, &PendingView::default()));
    }

    #[test]
    fn duplicate_entry_detected_against_pending_uploads() {
        let pending = PendingView {
            uploading_entries: vec![pending_entry("What is X?", "X is Y.", false)],
            ..PendingView::default()
        };
        let fingerprint = QaEntry::new("What is X?", "X is Y.").fingerprint();

        assert!(is_duplicate_entry(&fingerprint, &[], &pending));
    }

    #[test]
    fn distinct_entry_is_not_a_duplicate() {
        let remote = vec![entry_document("What is X?", "X is Y.", false)];
        let fingerprint = QaEntry::new("What is Z?", "Z is W.").fingerprint();

        assert!(!is_duplicate_entry(&fingerprint, &remote, &PendingView::default()));
    }

    #[test]
    fn duplicate_file_matches_by_display_name() {
        let remote = vec![file_document("syllabus.pdf")];
        let pending = PendingView {
            uploading_files: vec!["notes.pdf".to_owned()],
            ..PendingView::default()
        };

        assert!(is_duplicate_file("syllabus.pdf", &remote, &pending));
        assert!(is_duplicate_file("notes.pdf", &remote, &pending));
        assert!(!is_duplicate_file("lecture-3.pdf", &remote, &pending));
    }

    #[test]
    fn assemble_partitions_documents_by_class() {
        let remote = vec![
            entry_document("Q1", "A1", false),
            entry_document("Q2", "A2", true),
            file_document("syllabus.pdf"),
        ];

        let state = assemble(&remote, &PendingView::default());

        assert_eq!(state.manual.len(), 1);
        assert_eq!(state.learned.len(), 1);
        assert_eq!(state.files.len(), 1);
        assert!(state.show_learned_section());
    }

    #[test]
    fn learned_section_hidden_without_learned_content() {
        let state = assemble(&[entry_document("Q1", "A1", false)], &PendingView::default());
        assert!(!state.show_learned_section());
    }

    #[test]
    fn pending_uploads_render_ahead_of_confirmed_documents() {
        let remote = vec![entry_document("Q-old", "A-old", false)];
        let pending = PendingView {
            uploading_entries: vec![pending_entry("Q-new", "A-new", false)],
            ..PendingView::default()
        };

        let state = assemble(&remote, &pending);

        assert_eq!(state.manual.len(), 2);
        assert!(matches!(&state.manual[0], EntrySlot::Uploading { question, .. } if question == "Q-new"));
        assert!(matches!(&state.manual[1], EntrySlot::Confirmed { question, .. } if question == "Q-old"));
    }

    #[test]
    fn confirmed_document_matching_pending_upload_is_suppressed() {
        // The remote listing can race ahead of the pending-set pop; the
        // document must not render twice during that window.
        let remote = vec![entry_document("Q1", "A1", false)];
        let pending = PendingView {
            uploading_entries: vec![pending_entry("Q1", "A1", false)],
            ..PendingView::default()
        };

        let state = assemble(&remote, &pending);

        assert_eq!(state.manual.len(), 1);
        assert!(matches!(&state.manual[0], EntrySlot::Uploading { .. }));
    }

    #[test]
    fn documents_pending_removal_are_hidden() {
        let entry = entry_document("Q1", "A1", false);
        let file = file_document("syllabus.pdf");
        let pending = PendingView {
            removing_entries: vec![entry.clone()],
            removing_files: vec![file.clone()],
            ..PendingView::default()
        };

        let state = assemble(&[entry, file], &pending);

        assert!(state.manual.is_empty());
        assert!(state.files.is_empty());
    }

    #[test]
    fn uploading_file_suppresses_confirmed_twin_by_name() {
        let remote = vec![file_document("syllabus.pdf")];
        let pending = PendingView {
            uploading_files: vec!["syllabus.pdf".to_owned()],
            ..PendingView::default()
        };

        let state = assemble(&remote, &pending);

        assert_eq!(state.files, vec![FileSlot::Uploading { file_name: "syllabus.pdf".to_owned() }]);
    }

    #[test]
    fn assemble_is_deterministic() {
        let remote = vec![
            entry_document("Q1", "A1", false),
            entry_document("Q2", "A2", true),
            file_document("syllabus.pdf"),
        ];
        let pending = PendingView {
            uploading_entries: vec![pending_entry("Q3", "A3", false)],
            uploading_files: vec!["notes.pdf".to_owned()],
            ..PendingView::default()
        };

        assert_eq!(assemble(&remote, &pending), assemble(&remote, &pending));
    }

    #[test]
    fn undecodable_entry_documents_are_skipped() {
        let document = DocumentRecord {
            id: DocumentId("doc-x".to_owned()),
            display_name: "Manual_Entry|not-one-of-ours.csv".to_owned(),
            mime_type: "text/csv".to_owned(),
            content: DocumentContent::Inline(b"malformed".to_vec()),
        };

        let state = assemble(&[document], &PendingView::default());

        assert!(state.manual.is_empty());
    }
}
