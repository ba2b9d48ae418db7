//! Speech-to-intent interpretation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::command::{InterpretedCommand, ALLOWED_ACTIONS};
use crate::config::InterpreterConfig;
use crate::error::VoiceError;
use crate::numbering::{NumberedOrder, OrderNumberMap};

/// What the interpreter is asked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpretRequest {
    pub text: String,
    pub order_number_map: BTreeMap<String, NumberedOrder>,
    pub allowed_actions: Vec<String>,
}

impl InterpretRequest {
    pub fn new(text: impl Into<String>, numbers: &OrderNumberMap) -> Self {
        Self {
            text: text.into(),
            order_number_map: numbers.to_wire(),
            allowed_actions: ALLOWED_ACTIONS.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Turns a transcript into a structured command.
#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    async fn interpret(&self, request: &InterpretRequest) -> Result<InterpretedCommand, VoiceError>;
}

/// Interpreter backed by an HTTP language-understanding service.
#[derive(Clone)]
pub struct HttpCommandInterpreter {
    http: Client,
    config: InterpreterConfig,
}

impl HttpCommandInterpreter {
    pub fn new(config: InterpreterConfig) -> Result<Self, VoiceError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    /// Create an interpreter from environment variables.
    pub fn from_env() -> Result<Self, VoiceError> {
        Self::new(InterpreterConfig::from_env()?)
    }
}

#[async_trait]
impl CommandInterpreter for HttpCommandInterpreter {
    async fn interpret(&self, request: &InterpretRequest) -> Result<InterpretedCommand, VoiceError> {
        debug!(text = %request.text, numbered = request.order_number_map.len(), "Interpreting command");

        let mut builder = self.http.post(self.config.interpret_url()).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VoiceError::Interpreter {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl std::fmt::Debug for HttpCommandInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCommandInterpreter")
            .field("api_url", &self.config.api_url)
            .finish()
    }
}
