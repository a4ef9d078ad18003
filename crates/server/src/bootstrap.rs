use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use classbot_core::config::{AppConfig, ConfigError, LoadOptions};
use classbot_knowledge::{InMemoryKnowledgeBackend, KnowledgeBackend, KnowledgeService};
use classbot_slack::assistant::AssistantService;
use classbot_slack::events::assistant_dispatcher;
use classbot_slack::pump::{EventPump, NoopEventTransport, ReconnectPolicy};

use crate::fetch::UrlFileFetcher;

pub struct Application {
    pub config: AppConfig,
    pub assistant: Arc<AssistantService>,
    pub pump: EventPump,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the assistant stack. The knowledge backend defaults to the
/// in-memory implementation and the pump to the no-op transport, so the
/// binary starts in offline mode until the real adapters are plugged in.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let backend: Arc<dyn KnowledgeBackend> = Arc::new(InMemoryKnowledgeBackend::new());
    let knowledge =
        Arc::new(KnowledgeService::new(config.knowledge.project_id.clone(), backend));
    info!(project_id = %config.knowledge.project_id, "knowledge service initialized");

    let fetcher = Arc::new(UrlFileFetcher::new().map_err(BootstrapError::HttpClient)?);
    let assistant = Arc::new(AssistantService::new(knowledge).with_file_fetcher(fetcher));

    let dispatcher = assistant_dispatcher(assistant.clone());
    let pump =
        EventPump::new(Arc::new(NoopEventTransport), dispatcher, ReconnectPolicy::default());
    info!("event pump initialized");

    Ok(Application { config, assistant, pump })
}

#[cfg(test)]
mod tests {
    use classbot_core::config::{ConfigOverrides, LoadOptions};
    use classbot_core::WorkspaceId;
    use classbot_slack::assistant::SubmissionOutcome;

    use super::bootstrap;

    fn valid_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                project_id: Some("classroom-project".to_owned()),
                slack_app_token: Some("xapp-test".to_owned()),
                slack_bot_token: Some("xoxb-test".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_on_malformed_slack_tokens() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                slack_app_token: Some("invalid-token".to_owned()),
                ..valid_options().overrides
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("slack.app_token"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_install_upload_and_answer_path() {
        let app = bootstrap(valid_options()).await.expect("bootstrap");
        let workspace = WorkspaceId("T1".to_owned());

        app.assistant.on_workspace_installed(&workspace).await.expect("install");

        let outcome = app
            .assistant
            .begin_entry_upload(&workspace, "U1", "When is the exam?", "Friday.", false)
            .await;
        assert_eq!(outcome, SubmissionOutcome::Accepted);

        // Unscripted backend answers nothing; the reply degrades to the
        // canned unknown response rather than an error.
        let reply =
            app.assistant.handle_incoming_question("When is lunch?", &workspace, "U1").await;
        assert!(reply.ends_with("Can you try to rephrase your question? :sweat:"));
    }
}
