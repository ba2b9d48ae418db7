//! Configuration for the voice pipeline and the command interpreter.

use std::env;
use std::time::Duration;

use crate::error::VoiceError;

/// Default wake phrase.
pub const DEFAULT_WAKE_PHRASE: &str = "code work";

/// Configuration for voice mode.
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Phrase that switches the listener into command mode.
    pub wake_phrase: String,

    /// Spoken acknowledgment after the wake phrase is heard.
    pub acknowledgment: String,

    /// Hard limit on a voice session.
    pub session_duration: Duration,

    /// Hard limit on a single command capture.
    pub command_timeout: Duration,

    /// Delay before the wake-word listener is (re)started.
    pub restart_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            wake_phrase: DEFAULT_WAKE_PHRASE.to_string(),
            acknowledgment: "Yes?".to_string(),
            session_duration: Duration::from_secs(3600),
            command_timeout: Duration::from_secs(10),
            restart_delay: Duration::from_millis(500),
        }
    }
}

impl VoiceConfig {
    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `KITCHEN_WAKE_PHRASE` - Wake phrase (default: "code work")
    /// - `KITCHEN_VOICE_SESSION_SECS` - Session length (default: 3600)
    /// - `KITCHEN_COMMAND_TIMEOUT_SECS` - Command capture limit (default: 10)
    /// - `KITCHEN_VOICE_RESTART_MS` - Listener restart delay (default: 500)
    pub fn from_env() -> Result<Self, VoiceError> {
        let defaults = Self::default();

        let wake_phrase = env::var("KITCHEN_WAKE_PHRASE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.wake_phrase);

        let session_duration = match env::var("KITCHEN_VOICE_SESSION_SECS") {
            Ok(raw) => Duration::from_secs(parse_positive("KITCHEN_VOICE_SESSION_SECS", &raw)?),
            Err(_) => defaults.session_duration,
        };
        let command_timeout = match env::var("KITCHEN_COMMAND_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(parse_positive("KITCHEN_COMMAND_TIMEOUT_SECS", &raw)?),
            Err(_) => defaults.command_timeout,
        };
        let restart_delay = match env::var("KITCHEN_VOICE_RESTART_MS") {
            Ok(raw) => Duration::from_millis(parse_positive("KITCHEN_VOICE_RESTART_MS", &raw)?),
            Err(_) => defaults.restart_delay,
        };

        Ok(Self {
            wake_phrase,
            acknowledgment: defaults.acknowledgment,
            session_duration,
            command_timeout,
            restart_delay,
        })
    }

    /// Set the wake phrase.
    pub fn with_wake_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.wake_phrase = phrase.into();
        self
    }
}

/// Configuration for the HTTP command interpreter.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Base URL of the language-understanding service.
    pub api_url: String,

    /// Optional bearer token.
    pub api_key: Option<String>,

    /// Request timeout.
    pub timeout: Duration,
}

impl InterpreterConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            timeout: Duration::from_secs(8),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `KITCHEN_NLU_URL` - Interpreter base URL
    ///
    /// Optional environment variables:
    /// - `KITCHEN_NLU_API_KEY` - Bearer token
    pub fn from_env() -> Result<Self, VoiceError> {
        let api_url = env::var("KITCHEN_NLU_URL")
            .map_err(|_| VoiceError::Config("KITCHEN_NLU_URL not set".to_string()))?;
        let mut config = Self::new(api_url);
        config.api_key = env::var("KITCHEN_NLU_API_KEY").ok().filter(|k| !k.is_empty());
        Ok(config)
    }

    /// Interpretation endpoint.
    pub fn interpret_url(&self) -> String {
        format!("{}/interpret", self.api_url)
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<u64, VoiceError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| VoiceError::Config(format!("{} must be a positive integer, got '{}'", name, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VoiceConfig::default();
        assert_eq!(config.wake_phrase, "code work");
        assert_eq!(config.session_duration, Duration::from_secs(3600));
        assert_eq!(config.command_timeout, Duration::from_secs(10));
        assert_eq!(config.restart_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive("X", " 12 ").unwrap(), 12);
        assert!(parse_positive("X", "0").is_err());
        assert!(parse_positive("X", "soon").is_err());
    }

    #[test]
    fn test_interpret_url() {
        let config = InterpreterConfig::new("http://nlu.local/");
        assert_eq!(config.interpret_url(), "http://nlu.local/interpret");
    }
}
