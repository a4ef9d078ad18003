use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use classbot_core::responses::NO_PERMISSION_COMMAND;
use classbot_core::WorkspaceId;

use crate::assistant::{AssistantService, FieldError, RemovalKind, SubmissionOutcome};
use crate::blocks::ModalView;
use crate::capture::strip_mentions;
use crate::home::{
    add_entry_modal, add_file_modal, ACTION_ADD_ENTRY, ACTION_ADD_FILE, ACTION_REMOVE_ENTRY,
    ACTION_REMOVE_FILE, BLOCK_ENTRY_ANSWER, BLOCK_ENTRY_QUESTION, BLOCK_FILE_URL,
    CALLBACK_ADD_ENTRY, CALLBACK_ADD_FILE,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    pub envelope_id: String,
    pub event: WorkspaceEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkspaceEvent {
    SlashCommand(SlashCommandPayload),
    Mention(MessageEvent),
    DirectMessage(MessageEvent),
    ChannelMessage(MessageEvent),
    HomeOpened(HomeOpenedEvent),
    BlockAction(BlockActionEvent),
    ViewSubmission(ViewSubmissionEvent),
    Uninstalled(UninstalledEvent),
    Unsupported { event_type: String },
}

impl WorkspaceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SlashCommand(_) => EventKind::SlashCommand,
            Self::Mention(_) | Self::DirectMessage(_) | Self::ChannelMessage(_) => {
                EventKind::Message
            }
            Self::HomeOpened(_) => EventKind::HomeOpened,
            Self::BlockAction(_) => EventKind::BlockAction,
            Self::ViewSubmission(_) => EventKind::ViewSubmission,
            Self::Uninstalled(_) => EventKind::Uninstalled,
            Self::Unsupported { .. } => EventKind::Unsupported,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    SlashCommand,
    Message,
    HomeOpened,
    BlockAction,
    ViewSubmission,
    Uninstalled,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub workspace: WorkspaceId,
    pub user_id: String,
    pub trigger_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Im,
    Channel,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub workspace: WorkspaceId,
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub channel_kind: ChannelKind,
    /// Text of the first attachment, when the message shares another one.
    pub attachment_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomeOpenedEvent {
    pub workspace: WorkspaceId,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockActionEvent {
    pub workspace: WorkspaceId,
    pub user_id: String,
    pub action_id: String,
    pub value: Option<String>,
    pub trigger_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewSubmissionEvent {
    pub workspace: WorkspaceId,
    pub user_id: String,
    pub callback_id: String,
    /// Submitted form values keyed by block id.
    pub values: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UninstalledEvent {
    pub workspace: WorkspaceId,
}

/// What the transport should do with a handled event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Reply(String),
    OpenModal(ModalView),
    FormErrors(Vec<FieldError>),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("event handler failure: {0}")]
    Internal(String),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_kind(&self) -> EventKind;
    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_kind(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &EventEnvelope,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(handler) = self.handlers.get(&envelope.event.kind()) else {
            return Ok(HandlerResult::Ignored);
        };
        handler.handle(envelope).await
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Dispatcher with every assistant-backed handler registered.
pub fn assistant_dispatcher(assistant: Arc<AssistantService>) -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler { assistant: assistant.clone() });
    dispatcher.register(MessageHandler { assistant: assistant.clone() });
    dispatcher.register(HomeOpenedHandler { assistant: assistant.clone() });
    dispatcher.register(BlockActionHandler { assistant: assistant.clone() });
    dispatcher.register(ViewSubmissionHandler { assistant: assistant.clone() });
    dispatcher.register(UninstalledHandler { assistant });
    dispatcher
}

struct SlashCommandHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::SlashCommand
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let WorkspaceEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match payload.command.as_str() {
            "/ping" => Ok(HandlerResult::Reply("Pong!".to_owned())),
            "/add-file" => self.gated_modal(payload, add_file_modal()).await,
            "/add-entry" => self.gated_modal(payload, add_entry_modal()).await,
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

impl SlashCommandHandler {
    async fn gated_modal(
        &self,
        payload: &SlashCommandPayload,
        modal: ModalView,
    ) -> Result<HandlerResult, EventHandlerError> {
        if !self.assistant.is_admin(&payload.workspace, &payload.user_id).await {
            return Ok(HandlerResult::Reply(NO_PERMISSION_COMMAND.to_owned()));
        }
        Ok(HandlerResult::OpenModal(modal))
    }
}

struct MessageHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::Message
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        match &envelope.event {
            WorkspaceEvent::Mention(event) | WorkspaceEvent::DirectMessage(event) => {
                Ok(self.answer(event).await)
            }
            WorkspaceEvent::ChannelMessage(event) => {
                if event.text.is_empty() {
                    return Ok(HandlerResult::Ignored);
                }
                if event.channel_kind == ChannelKind::Im {
                    return Ok(self.answer(event).await);
                }
                self.assistant.capture_instructor_answer(event).await;
                Ok(HandlerResult::Processed)
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

impl MessageHandler {
    async fn answer(&self, event: &MessageEvent) -> HandlerResult {
        let question = strip_mentions(&event.text);
        let reply = self
            .assistant
            .handle_incoming_question(&question, &event.workspace, &event.user_id)
            .await;
        HandlerResult::Reply(reply)
    }
}

struct HomeOpenedHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for HomeOpenedHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::HomeOpened
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let WorkspaceEvent::HomeOpened(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.assistant.publish_dashboard(&event.workspace, &event.user_id).await;
        Ok(HandlerResult::Processed)
    }
}

struct BlockActionHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for BlockActionHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::BlockAction
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let WorkspaceEvent::BlockAction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match event.action_id.as_str() {
            ACTION_ADD_ENTRY => Ok(HandlerResult::OpenModal(add_entry_modal())),
            ACTION_ADD_FILE => Ok(HandlerResult::OpenModal(add_file_modal())),
            ACTION_REMOVE_ENTRY | ACTION_REMOVE_FILE => {
                let Some(document_name) = event.value.as_deref() else {
                    return Ok(HandlerResult::Ignored);
                };
                let kind = if event.action_id == ACTION_REMOVE_ENTRY {
                    RemovalKind::Entry
                } else {
                    RemovalKind::File
                };
                self.assistant
                    .begin_removal(&event.workspace, &event.user_id, document_name, kind)
                    .await;
                Ok(HandlerResult::Processed)
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

struct ViewSubmissionHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for ViewSubmissionHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::ViewSubmission
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let WorkspaceEvent::ViewSubmission(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        match event.callback_id.as_str() {
            CALLBACK_ADD_ENTRY => {
                let (Some(question), Some(answer)) =
                    (event.values.get(BLOCK_ENTRY_QUESTION), event.values.get(BLOCK_ENTRY_ANSWER))
                else {
                    return Ok(HandlerResult::FormErrors(vec![
                        FieldError::new(BLOCK_ENTRY_QUESTION, "Question and answer are required."),
                        FieldError::new(BLOCK_ENTRY_ANSWER, "Question and answer are required."),
                    ]));
                };

                let outcome = self
                    .assistant
                    .begin_entry_upload(&event.workspace, &event.user_id, question, answer, false)
                    .await;
                Ok(submission_result(outcome, &[BLOCK_ENTRY_QUESTION, BLOCK_ENTRY_ANSWER]))
            }
            CALLBACK_ADD_FILE => {
                let Some(url) = event.values.get(BLOCK_FILE_URL) else {
                    return Ok(HandlerResult::FormErrors(vec![FieldError::new(
                        BLOCK_FILE_URL,
                        "A file link is required.",
                    )]));
                };

                let outcome = self
                    .assistant
                    .handle_add_file_submission(&event.workspace, &event.user_id, url)
                    .await;
                Ok(submission_result(outcome, &[BLOCK_FILE_URL]))
            }
            _ => Ok(HandlerResult::Ignored),
        }
    }
}

fn submission_result(outcome: SubmissionOutcome, failure_blocks: &[&str]) -> HandlerResult {
    match outcome {
        SubmissionOutcome::Accepted => HandlerResult::Processed,
        SubmissionOutcome::FieldErrors(errors) => HandlerResult::FormErrors(errors),
        SubmissionOutcome::Failed(_) => HandlerResult::FormErrors(
            failure_blocks
                .iter()
                .map(|block_id| FieldError::new(block_id, "Upload failed. Please try again."))
                .collect(),
        ),
    }
}

struct UninstalledHandler {
    assistant: Arc<AssistantService>,
}

#[async_trait]
impl EventHandler for UninstalledHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::Uninstalled
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<HandlerResult, EventHandlerError> {
        let WorkspaceEvent::Uninstalled(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.assistant.on_workspace_uninstalled(&event.workspace).await;
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use classbot_core::WorkspaceId;
    use classbot_knowledge::{InMemoryKnowledgeBackend, KnowledgeService};

    use super::{
        assistant_dispatcher, ChannelKind, EventDispatcher, EventEnvelope, HandlerResult,
        MessageEvent, SlashCommandPayload, ViewSubmissionEvent, WorkspaceEvent,
    };
    use crate::assistant::AssistantService;
    use crate::home::{BLOCK_ENTRY_ANSWER, BLOCK_ENTRY_QUESTION, CALLBACK_ADD_ENTRY};

    fn assistant() -> Arc<AssistantService> {
        let backend = Arc::new(InMemoryKnowledgeBackend::new());
        let knowledge = Arc::new(KnowledgeService::new("project-1", backend));
        Arc::new(AssistantService::new(knowledge))
    }

    fn envelope(event: WorkspaceEvent) -> EventEnvelope {
        EventEnvelope { envelope_id: "env-1".to_owned(), event }
    }

    #[tokio::test]
    async fn ping_command_replies_pong() {
        let dispatcher = assistant_dispatcher(assistant());
        let result = dispatcher
            .dispatch(&envelope(WorkspaceEvent::SlashCommand(SlashCommandPayload {
                command: "/ping".to_owned(),
                text: String::new(),
                workspace: WorkspaceId("T1".to_owned()),
                user_id: "U1".to_owned(),
                trigger_id: "trig-1".to_owned(),
            })))
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Reply("Pong!".to_owned()));
    }

    #[tokio::test]
    async fn add_entry_command_opens_modal_for_admins() {
        let dispatcher = assistant_dispatcher(assistant());
        let result = dispatcher
            .dispatch(&envelope(WorkspaceEvent::SlashCommand(SlashCommandPayload {
                command: "/add-entry".to_owned(),
                text: String::new(),
                workspace: WorkspaceId("T1".to_owned()),
                user_id: "U1".to_owned(),
                trigger_id: "trig-1".to_owned(),
            })))
            .await
            .expect("dispatch");

        assert!(matches!(result, HandlerResult::OpenModal(_)));
    }

    #[tokio::test]
    async fn mention_in_unconfigured_workspace_gets_not_set_up_reply() {
        let dispatcher = assistant_dispatcher(assistant());
        let result = dispatcher
            .dispatch(&envelope(WorkspaceEvent::Mention(MessageEvent {
                workspace: WorkspaceId("T1".to_owned()),
                channel_id: "C1".to_owned(),
                user_id: "U1".to_owned(),
                text: "<@B1> when is the exam?".to_owned(),
                ts: "1700000000.000100".to_owned(),
                thread_ts: None,
                channel_kind: ChannelKind::Channel,
                attachment_text: None,
            })))
            .await
            .expect("dispatch");

        assert_eq!(
            result,
            HandlerResult::Reply("Hello <@U1>, unfortunately I am not set up yet.".to_owned())
        );
    }

    #[tokio::test]
    async fn entry_submission_without_fields_returns_form_errors() {
        let dispatcher = assistant_dispatcher(assistant());
        let result = dispatcher
            .dispatch(&envelope(WorkspaceEvent::ViewSubmission(ViewSubmissionEvent {
                workspace: WorkspaceId("T1".to_owned()),
                user_id: "U1".to_owned(),
                callback_id: CALLBACK_ADD_ENTRY.to_owned(),
                values: HashMap::new(),
            })))
            .await
            .expect("dispatch");

        let HandlerResult::FormErrors(errors) = result else {
            panic!("expected form errors, got {result:?}");
        };
        let blocks: Vec<&str> = errors.iter().map(|error| error.block_id.as_str()).collect();
        assert_eq!(blocks, vec![BLOCK_ENTRY_QUESTION, BLOCK_ENTRY_ANSWER]);
    }

    #[tokio::test]
    async fn unregistered_event_kind_is_ignored() {
        let dispatcher = EventDispatcher::new();
        let result = dispatcher
            .dispatch(&envelope(WorkspaceEvent::Unsupported { event_type: "team_join".to_owned() }))
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn assistant_dispatcher_registers_all_handlers() {
        let dispatcher = assistant_dispatcher(assistant());
        assert_eq!(dispatcher.handler_count(), 6);
    }
}
