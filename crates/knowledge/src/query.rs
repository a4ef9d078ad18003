use classbot_core::DocumentId;

/// Confidence the remote service attaches to a candidate answer. Anything
/// below `High` is treated as a miss by the assistant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfidenceLevel {
    Unspecified,
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeAnswer {
    pub text: String,
    pub confidence: ConfidenceLevel,
    pub source_document_id: DocumentId,
}
