use thiserror::Error;

use crate::domain::document::{LEARNED_ENTRY_HEADER, MANUAL_ENTRY_HEADER};

/// Field separator inside an encoded entry. The leading `|` on the answer
/// side keeps a comma inside the question or answer from being mistaken for
/// the field boundary.
const FIELD_SEPARATOR: &str = "\",\"|";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryDecodeError {
    #[error("entry content is not wrapped in quotes")]
    MissingQuotes,
    #[error("entry content has no question/answer separator")]
    MissingSeparator,
}

/// One authored question/answer pair. Encoding and fingerprinting here are
/// the persisted wire format: a document named `<Header>|<fingerprint>.csv`
/// holding `"<question>","|<answer>"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

impl QaEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { question: question.into(), answer: answer.into() }
    }

    pub fn encode(&self) -> String {
        format!("\"{}\",\"|{}\"", self.question, self.answer)
    }

    pub fn decode(raw: &str) -> Result<Self, EntryDecodeError> {
        let inner = raw
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .ok_or(EntryDecodeError::MissingQuotes)?;

        let (question, answer) =
            inner.split_once(FIELD_SEPARATOR).ok_or(EntryDecodeError::MissingSeparator)?;

        Ok(Self { question: question.to_owned(), answer: answer.to_owned() })
    }

    /// Stable deduplication key: identical pairs always hash to the same
    /// fingerprint, so they collapse onto the same document name. Collision
    /// resistance is all that matters here, not cryptographic strength.
    pub fn fingerprint(&self) -> String {
        format!("{:x}", md5::compute(self.encode().as_bytes()))
    }

    pub fn file_name(&self, learned: bool) -> String {
        let header = if learned { LEARNED_ENTRY_HEADER } else { MANUAL_ENTRY_HEADER };
        format!("{header}|{}.csv", self.fingerprint())
    }
}

fn name_stem(display_name: &str) -> &str {
    match display_name.rsplit_once('.') {
        Some((stem, _extension)) => stem,
        None => display_name,
    }
}

/// Whether a document name embeds the given entry fingerprint.
pub fn name_carries_fingerprint(display_name: &str, fingerprint: &str) -> bool {
    !fingerprint.is_empty() && name_stem(display_name).ends_with(fingerprint)
}

#[cfg(test)]
mod tests {
    use super::{name_carries_fingerprint, EntryDecodeError, QaEntry};

    #[test]
    fn encodes_with_answer_marker() {
        let entry = QaEntry::new("What is X?", "X is Y.");
        assert_eq!(entry.encode(), "\"What is X?\",\"|X is Y.\"");
    }

    #[test]
    fn round_trips_plain_pair() {
        let entry = QaEntry::new("What is X?", "X is Y.");
        assert_eq!(QaEntry::decode(&entry.encode()), Ok(entry));
    }

    #[test]
    fn round_trips_answer_with_comma_and_pipe() {
        let entry = QaEntry::new("Office hours?", "Tuesday, 2pm | Thursday, 4pm");
        assert_eq!(QaEntry::decode(&entry.encode()), Ok(entry));
    }

    #[test]
    fn rejects_unquoted_content() {
        assert_eq!(QaEntry::decode("no quotes here"), Err(EntryDecodeError::MissingQuotes));
    }

    #[test]
    fn rejects_content_without_separator() {
        assert_eq!(
            QaEntry::decode("\"only one field\""),
            Err(EntryDecodeError::MissingSeparator)
        );
    }

    #[test]
    fn fingerprint_is_stable_for_identical_pairs() {
        let first = QaEntry::new("Q", "A").fingerprint();
        let second = QaEntry::new("Q", "A").fingerprint();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn fingerprint_differs_when_pair_differs() {
        assert_ne!(QaEntry::new("Q", "A").fingerprint(), QaEntry::new("Q", "B").fingerprint());
    }

    #[test]
    fn file_name_embeds_header_and_fingerprint() {
        let entry = QaEntry::new("What is X?", "X is Y.");
        let manual = entry.file_name(false);
        let learned = entry.file_name(true);

        assert!(manual.starts_with("Manual_Entry|"));
        assert!(learned.starts_with("Learned_Entry|"));
        assert!(manual.ends_with(".csv"));
        assert!(name_carries_fingerprint(&manual, &entry.fingerprint()));
        assert!(name_carries_fingerprint(&learned, &entry.fingerprint()));
    }

    #[test]
    fn unrelated_names_do_not_carry_fingerprint() {
        let fingerprint = QaEntry::new("Q", "A").fingerprint();
        assert!(!name_carries_fingerprint("syllabus.pdf", &fingerprint));
        assert!(!name_carries_fingerprint("Manual_Entry|deadbeef.csv", &fingerprint));
    }
}
