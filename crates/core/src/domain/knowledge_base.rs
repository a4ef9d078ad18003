use serde::{Deserialize, Serialize};

/// Slack team id. Doubles as the knowledge base display name by convention,
/// which is what makes name-keyed lookups per workspace possible.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub String);

impl WorkspaceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeBaseId(pub String);

impl KnowledgeBaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Last-known remote state of a workspace's knowledge base. A plain value
/// record, deliberately decoupled from any vendor SDK entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KnowledgeBaseRecord {
    pub id: KnowledgeBaseId,
    pub display_name: String,
}
