use serde::{Deserialize, Serialize};

/// Name prefix that marks a manually authored question/answer entry.
pub const MANUAL_ENTRY_HEADER: &str = "Manual_Entry";
/// Name prefix that marks an entry learned from an instructor reply.
pub const LEARNED_ENTRY_HEADER: &str = "Learned_Entry";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Document classification, derived from the display-name prefix convention.
/// The prefix is the actual wire contract with the remote store's naming
/// space, so it is kept as-is and isolated behind [`classify`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DocumentClass {
    ManualEntry,
    LearnedEntry,
    BulkFile,
}

pub fn classify(display_name: &str) -> DocumentClass {
    if display_name.starts_with(MANUAL_ENTRY_HEADER) {
        DocumentClass::ManualEntry
    } else if display_name.starts_with(LEARNED_ENTRY_HEADER) {
        DocumentClass::LearnedEntry
    } else {
        DocumentClass::BulkFile
    }
}

/// Document payload: inline bytes or a URI reference, mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentContent {
    Inline(Vec<u8>),
    Uri(String),
}

impl DocumentContent {
    pub fn inline_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Inline(bytes) => Some(bytes),
            Self::Uri(_) => None,
        }
    }
}

/// Immutable value record for one unit of knowledge-base content, decoupled
/// from whatever entity type the remote transport hands back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub display_name: String,
    pub mime_type: String,
    pub content: DocumentContent,
}

impl DocumentRecord {
    pub fn class(&self) -> DocumentClass {
        classify(&self.display_name)
    }
}

/// Knowledge type accepted by the remote store, keyed off the mime type of
/// the uploaded material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeType {
    Faq,
    ExtractiveQa,
}

impl KnowledgeType {
    pub fn for_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "text/csv" => Some(Self::Faq),
            "text/html" | "text/plain" | "application/pdf" => Some(Self::ExtractiveQa),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Faq => "FAQ",
            Self::ExtractiveQa => "EXTRACTIVE_QA",
        }
    }
}
