pub mod document;
pub mod entry;
pub mod knowledge_base;
