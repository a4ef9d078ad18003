use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConfirmDialog {
    pub title: TextObject,
    pub text: TextObject,
    pub confirm: TextObject,
    pub deny: TextObject,
    pub style: ButtonStyle,
}

impl ConfirmDialog {
    /// Danger-styled "are you sure" dialog used by every Remove button.
    pub fn removal(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            title: TextObject::plain(title),
            text: TextObject::mrkdwn(prompt),
            confirm: TextObject::plain("Yes, remove it"),
            deny: TextObject::plain("Cancel"),
            style: ButtonStyle::Danger,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<ConfirmDialog>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
            confirm: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn confirm(mut self, confirm: ConfirmDialog) -> Self {
        self.confirm = Some(confirm);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InputElement {
    pub action_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<TextObject>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: TextObject,
    },
    Section {
        text: TextObject,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<ButtonElement>,
    },
    Divider,
    Input {
        block_id: String,
        label: TextObject,
        element: InputElement,
    },
}

impl Block {
    pub fn header(text: impl Into<String>) -> Self {
        Self::Header { text: TextObject::plain(text) }
    }

    pub fn section(text: TextObject) -> Self {
        Self::Section { text, accessory: None }
    }

    pub fn section_with_button(text: TextObject, button: ButtonElement) -> Self {
        Self::Section { text, accessory: Some(button) }
    }

    pub fn divider() -> Self {
        Self::Divider
    }

    pub fn text_input(
        block_id: impl Into<String>,
        label: impl Into<String>,
        action_id: impl Into<String>,
        placeholder: impl Into<String>,
    ) -> Self {
        Self::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element: InputElement {
                action_id: action_id.into(),
                placeholder: Some(TextObject::plain(placeholder)),
            },
        }
    }
}

/// Home-tab view document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HomeView {
    #[serde(rename = "type")]
    pub view_type: String,
    pub blocks: Vec<Block>,
}

impl HomeView {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { view_type: "home".to_owned(), blocks }
    }
}

/// Modal view document (the add-file / add-entry forms).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalView {
    #[serde(rename = "type")]
    pub view_type: String,
    pub callback_id: String,
    pub title: TextObject,
    pub submit: TextObject,
    pub close: TextObject,
    pub blocks: Vec<Block>,
}

impl ModalView {
    pub fn new(callback_id: impl Into<String>, title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            view_type: "modal".to_owned(),
            callback_id: callback_id.into(),
            title: TextObject::plain(title),
            submit: TextObject::plain("Submit"),
            close: TextObject::plain("Cancel"),
            blocks,
        }
    }
}
