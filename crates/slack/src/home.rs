//! Home-tab dashboard renderer: a pure projection from the reconciled
//! [`DashboardState`] to a Block Kit view document. No I/O happens here, so
//! rendering twice from the same state yields identical output.

use classbot_core::reconcile::{DashboardState, EntrySlot, FileSlot};
use classbot_core::responses::NO_PERMISSION_HOME;

use crate::blocks::{
    Block, ButtonElement, ButtonStyle, ConfirmDialog, HomeView, ModalView, TextObject,
};

pub const ACTION_ADD_ENTRY: &str = "add_entry";
pub const ACTION_REMOVE_ENTRY: &str = "remove_entry";
pub const ACTION_ADD_FILE: &str = "add_file";
pub const ACTION_REMOVE_FILE: &str = "remove_file";

pub const CALLBACK_ADD_ENTRY: &str = "add-entry-submission";
pub const CALLBACK_ADD_FILE: &str = "add-file-submission";

pub const BLOCK_FILE_URL: &str = "add-file-input";
pub const BLOCK_ENTRY_QUESTION: &str = "add-entry-input-question";
pub const BLOCK_ENTRY_ANSWER: &str = "add-entry-input-answer";

pub fn no_permission_home() -> HomeView {
    HomeView::new(vec![Block::header(NO_PERMISSION_HOME)])
}

/// Shown while the workspace has no knowledge base yet.
pub fn setting_up_home() -> HomeView {
    HomeView::new(vec![Block::header(":wrench: Setting up Classroom Assistant")])
}

pub fn add_entry_modal() -> ModalView {
    ModalView::new(
        CALLBACK_ADD_ENTRY,
        "New Entry",
        vec![
            Block::text_input(BLOCK_ENTRY_QUESTION, "Question", "question", "Expected question"),
            Block::text_input(BLOCK_ENTRY_ANSWER, "Answer", "answer", "Desired answer"),
        ],
    )
}

pub fn add_file_modal() -> ModalView {
    ModalView::new(
        CALLBACK_ADD_FILE,
        "Add File",
        vec![Block::text_input(
            BLOCK_FILE_URL,
            "Add new knowledge",
            "url",
            "Direct link to your new file",
        )],
    )
}

pub fn render_home(state: &DashboardState) -> HomeView {
    let mut blocks = Vec::new();

    blocks.push(Block::header(":pencil: Entries"));
    blocks.push(Block::section_with_button(
        TextObject::mrkdwn(" "),
        ButtonElement::new(ACTION_ADD_ENTRY, "Add Entry").style(ButtonStyle::Primary),
    ));
    blocks.push(Block::divider());
    push_entry_slots(&mut blocks, &state.manual, "Manual Entry");
    if state.manual.is_empty() {
        blocks.push(Block::section(TextObject::plain(
            ":open_file_folder: You don't have any manual entries yet!",
        )));
        blocks.push(Block::divider());
    }

    if state.show_learned_section() {
        blocks.push(Block::header(":brain: Learned Entries"));
        blocks.push(Block::divider());
        push_entry_slots(&mut blocks, &state.learned, "Learned Entry");
    }

    blocks.push(Block::header(":page_with_curl: Files"));
    blocks.push(Block::section_with_button(
        TextObject::mrkdwn(" "),
        ButtonElement::new(ACTION_ADD_FILE, "Add File").style(ButtonStyle::Primary),
    ));
    blocks.push(Block::divider());
    for slot in &state.files {
        match slot {
            FileSlot::Uploading { file_name } => {
                blocks.push(Block::section(TextObject::mrkdwn(format!(
                    "_Uploading..._\n*{file_name}*"
                ))));
            }
            FileSlot::Confirmed { file_name } => {
                blocks.push(Block::section_with_button(
                    TextObject::mrkdwn(format!("*{file_name}*")),
                    ButtonElement::new(ACTION_REMOVE_FILE, "Remove")
                        .style(ButtonStyle::Danger)
                        .value(file_name.clone())
                        .confirm(ConfirmDialog::removal(
                            file_name.clone(),
                            format!("Are you sure you want to remove {file_name}?"),
                        )),
                ));
            }
        }
        blocks.push(Block::divider());
    }
    if state.files.is_empty() {
        blocks.push(Block::section(TextObject::plain(
            ":open_file_folder: You don't have any files yet!",
        )));
        blocks.push(Block::divider());
    }

    HomeView::new(blocks)
}

fn push_entry_slots(blocks: &mut Vec<Block>, slots: &[EntrySlot], confirm_title: &str) {
    for slot in slots {
        match slot {
            EntrySlot::Uploading { question, answer } => {
                blocks.push(Block::section(TextObject::mrkdwn(format!(
                    "_Uploading..._\n*Question:*\n> {question}\n*Answer:*\n> {answer}"
                ))));
            }
            EntrySlot::Confirmed { file_name, question, answer } => {
                blocks.push(Block::section_with_button(
                    TextObject::mrkdwn(format!(
                        "*Question:*\n> {question}\n*Answer:*\n> {answer}"
                    )),
                    ButtonElement::new(ACTION_REMOVE_ENTRY, "Remove")
                        .style(ButtonStyle::Danger)
                        .value(file_name.clone())
                        .confirm(ConfirmDialog::removal(
                            confirm_title,
                            "Are you sure you want to remove this entry?",
                        )),
                ));
            }
        }
        blocks.push(Block::divider());
    }
}

#[cfg(test)]
mod tests {
    use classbot_core::reconcile::{DashboardState, EntrySlot, FileSlot};

    use super::{render_home, ACTION_REMOVE_ENTRY};
    use crate::blocks::Block;

    fn confirmed_entry(name: &str) -> EntrySlot {
        EntrySlot::Confirmed {
            file_name: name.to_owned(),
            question: "Q".to_owned(),
            answer: "A".to_owned(),
        }
    }

    #[test]
    fn empty_state_renders_placeholders_and_no_learned_section() {
        let view = render_home(&DashboardState::default());
        let json = serde_json::to_string(&view).expect("serialize");

        assert!(json.contains("You don't have any manual entries yet!"));
        assert!(json.contains("You don't have any files yet!"));
        assert!(!json.contains("Learned Entries"));
    }

    #[test]
    fn learned_section_appears_with_learned_content() {
        let state = DashboardState {
            learned: vec![confirmed_entry("Learned_Entry|abc.csv")],
            ..DashboardState::default()
        };
        let json = serde_json::to_string(&render_home(&state)).expect("serialize");

        assert!(json.contains("Learned Entries"));
    }

    #[test]
    fn uploading_slots_render_placeholder_text_without_remove_button() {
        let state = DashboardState {
            manual: vec![EntrySlot::Uploading { question: "Q".to_owned(), answer: "A".to_owned() }],
            files: vec![FileSlot::Uploading { file_name: "notes.pdf".to_owned() }],
            ..DashboardState::default()
        };
        let view = render_home(&state);
        let json = serde_json::to_string(&view).expect("serialize");

        assert!(json.contains("_Uploading..._"));
        assert!(!json.contains(ACTION_REMOVE_ENTRY));
    }

    #[test]
    fn confirmed_entry_remove_button_carries_file_name() {
        let state = DashboardState {
            manual: vec![confirmed_entry("Manual_Entry|abc.csv")],
            ..DashboardState::default()
        };
        let view = render_home(&state);

        let button = view
            .blocks
            .iter()
            .find_map(|block| match block {
                Block::Section { accessory: Some(button), .. } => Some(button),
                _ => None,
            })
            .expect("remove button");
        assert_eq!(button.value.as_deref(), Some("Manual_Entry|abc.csv"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let state = DashboardState {
            manual: vec![confirmed_entry("Manual_Entry|abc.csv")],
            files: vec![FileSlot::Confirmed { file_name: "syllabus.pdf".to_owned() }],
            ..DashboardState::default()
        };

        assert_eq!(render_home(&state), render_home(&state));
    }
}
