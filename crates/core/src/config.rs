use std::env;
use std::fs;
use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub knowledge: KnowledgeConfig,
    pub slack: SlackConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct KnowledgeConfig {
    /// Project that scopes every knowledge base on the remote service.
    pub project_id: String,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub app_token: SecretString,
    pub bot_token: SecretString,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub project_id: Option<String>,
    pub slack_app_token: Option<String>,
    pub slack_bot_token: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    knowledge: RawKnowledge,
    #[serde(default)]
    slack: RawSlack,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
struct RawKnowledge {
    project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSlack {
    app_token: Option<String>,
    bot_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Resolution order: config file, then `CLASSBOT_*` environment
    /// variables, then explicit overrides (strongest).
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path = options
            .config_path
            .or_else(|| env::var("CLASSBOT_CONFIG").ok().map(PathBuf::from));

        let mut raw = match path {
            Some(path) if path.exists() => {
                let text = fs::read_to_string(&path)
                    .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
                toml::from_str::<RawConfig>(&text)
                    .map_err(|source| ConfigError::ParseFile { path, source })?
            }
            _ => RawConfig::default(),
        };

        apply_env(&mut raw)?;
        apply_overrides(&mut raw, options.overrides);
        validate(raw)
    }
}

fn apply_env(raw: &mut RawConfig) -> Result<(), ConfigError> {
    if let Ok(value) = env::var("CLASSBOT_PROJECT_ID") {
        raw.knowledge.project_id = Some(value);
    }
    if let Ok(value) = env::var("CLASSBOT_SLACK_APP_TOKEN") {
        raw.slack.app_token = Some(value);
    }
    if let Ok(value) = env::var("CLASSBOT_SLACK_BOT_TOKEN") {
        raw.slack.bot_token = Some(value);
    }
    if let Ok(value) = env::var("CLASSBOT_LOG_LEVEL") {
        raw.logging.level = Some(value);
    }
    if let Ok(value) = env::var("CLASSBOT_LOG_FORMAT") {
        raw.logging.format = Some(parse_log_format(&value).ok_or_else(|| {
            ConfigError::InvalidEnvOverride { key: "CLASSBOT_LOG_FORMAT".to_owned(), value }
        })?);
    }
    Ok(())
}

fn apply_overrides(raw: &mut RawConfig, overrides: ConfigOverrides) {
    if let Some(value) = overrides.project_id {
        raw.knowledge.project_id = Some(value);
    }
    if let Some(value) = overrides.slack_app_token {
        raw.slack.app_token = Some(value);
    }
    if let Some(value) = overrides.slack_bot_token {
        raw.slack.bot_token = Some(value);
    }
    if let Some(value) = overrides.log_level {
        raw.logging.level = Some(value);
    }
    if let Some(value) = overrides.log_format {
        raw.logging.format = Some(value);
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "compact" => Some(LogFormat::Compact),
        "pretty" => Some(LogFormat::Pretty),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

fn validate(raw: RawConfig) -> Result<AppConfig, ConfigError> {
    let project_id = raw
        .knowledge
        .project_id
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::Validation("knowledge.project_id is required".to_owned()))?;

    let app_token = raw
        .slack
        .app_token
        .filter(|token| token.starts_with("xapp-"))
        .ok_or_else(|| {
            ConfigError::Validation("slack.app_token must be an `xapp-` token".to_owned())
        })?;
    let bot_token = raw
        .slack
        .bot_token
        .filter(|token| token.starts_with("xoxb-"))
        .ok_or_else(|| {
            ConfigError::Validation("slack.bot_token must be an `xoxb-` token".to_owned())
        })?;

    Ok(AppConfig {
        knowledge: KnowledgeConfig { project_id },
        slack: SlackConfig {
            app_token: SecretString::from(app_token),
            bot_token: SecretString::from(bot_token),
        },
        logging: LoggingConfig {
            level: raw.logging.level.unwrap_or_else(|| "info".to_owned()),
            format: raw.logging.format.unwrap_or(LogFormat::Compact),
        },
    })
}
