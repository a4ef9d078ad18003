//! User-facing phrasing: unknown-answer responses, attribution footers, and
//! permission refusals.

use rand::seq::SliceRandom;

use crate::domain::document::DocumentClass;

pub const NO_PERMISSION_HOME: &str =
    ":sweat: I'm sorry, you don't have permission to view this...";
pub const NO_PERMISSION_COMMAND: &str =
    ":sweat: I'm sorry, you don't have permission to do that...";

const MANUAL_ENTRY_FOOTER: &str =
    "\n\n> :pencil: This information was provided to me manually by your instructor.";
const LEARNED_ENTRY_FOOTER: &str =
    "\n\n> :brain: I learned this based on previous questions your instructor has answered.";
const FILE_FOOTER: &str =
    "\n\n> :page_with_curl: This information was extracted from a file provided to me by your instructor.";

const UNKNOWN_PREFIXES: [&str; 3] = ["Sorry", "I'm sorry", "Hm"];

const UNKNOWN_BODIES: [&str; 5] = [
    "I am having some trouble understanding that.",
    "I don't think I know anything about that.",
    "I don't understand your question.",
    "I don't think I have been taught that yet.",
    "I don't believe I have learned anything about that yet.",
];

const UNKNOWN_SUFFIXES: [&str; 1] = ["Can you try to rephrase your question? :sweat:"];

/// Canned reply for questions the knowledge base cannot answer confidently.
/// Phrasing varies so repeated misses don't read like a broken record.
pub fn unknown_answer_response() -> String {
    let mut rng = rand::thread_rng();
    let prefix = UNKNOWN_PREFIXES.choose(&mut rng).copied().unwrap_or(UNKNOWN_PREFIXES[0]);
    let body = UNKNOWN_BODIES.choose(&mut rng).copied().unwrap_or(UNKNOWN_BODIES[0]);
    let suffix = UNKNOWN_SUFFIXES.choose(&mut rng).copied().unwrap_or(UNKNOWN_SUFFIXES[0]);
    format!("{prefix}, {body} {suffix}")
}

pub fn not_set_up_response(user_id: &str) -> String {
    format!("Hello <@{user_id}>, unfortunately I am not set up yet.")
}

/// Attribution footer appended to an answer based on where it came from.
pub fn context_footer(class: DocumentClass) -> &'static str {
    match class {
        DocumentClass::ManualEntry => MANUAL_ENTRY_FOOTER,
        DocumentClass::LearnedEntry => LEARNED_ENTRY_FOOTER,
        DocumentClass::BulkFile => FILE_FOOTER,
    }
}

#[cfg(test)]
mod tests {
    use super::{context_footer, not_set_up_response, unknown_answer_response};
    use crate::domain::document::DocumentClass;

    #[test]
    fn unknown_response_is_assembled_from_the_pools() {
        let response = unknown_answer_response();
        assert!(response.starts_with("Sorry") || response.starts_with("I'm sorry") || response.starts_with("Hm"));
        assert!(response.ends_with("Can you try to rephrase your question? :sweat:"));
    }

    #[test]
    fn not_set_up_response_mentions_the_user() {
        assert_eq!(
            not_set_up_response("U123"),
            "Hello <@U123>, unfortunately I am not set up yet."
        );
    }

    #[test]
    fn footer_varies_by_document_class() {
        assert!(context_footer(DocumentClass::ManualEntry).contains(":pencil:"));
        assert!(context_footer(DocumentClass::LearnedEntry).contains(":brain:"));
        assert!(context_footer(DocumentClass::BulkFile).contains(":page_with_curl:"));
    }
}
