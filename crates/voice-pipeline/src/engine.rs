//! Speech engine boundaries.
//!
//! The pipeline never talks to audio hardware itself. Recognition and
//! synthesis are injected so the same pipeline runs against platform
//! engines, cloud services or scripted test doubles.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::VoiceError;

/// How the recognizer should listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    /// Keep listening with interim results until stopped.
    Continuous,
    /// Capture one utterance and end.
    SingleShot,
}

/// One candidate transcript for an utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionAlternative {
    pub transcript: String,
    pub confidence: f64,
}

impl RecognitionAlternative {
    pub fn new(transcript: impl Into<String>, confidence: f64) -> Self {
        Self {
            transcript: transcript.into(),
            confidence,
        }
    }
}

/// Events emitted by a running recognizer.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// A result with one or more alternatives.
    Result {
        alternatives: Vec<RecognitionAlternative>,
        is_final: bool,
    },
    /// The engine reported an error.
    Error(String),
    /// The engine stopped on its own.
    End,
}

impl RecognitionEvent {
    /// Interim result with a single alternative.
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self::Result {
            alternatives: vec![RecognitionAlternative::new(transcript, 0.0)],
            is_final: false,
        }
    }

    /// Final result with a single alternative.
    pub fn final_result(transcript: impl Into<String>, confidence: f64) -> Self {
        Self::Result {
            alternatives: vec![RecognitionAlternative::new(transcript, confidence)],
            is_final: true,
        }
    }
}

/// A speech-to-text engine.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Start recognition. Events arrive on the returned channel; a closed
    /// channel is treated like [`RecognitionEvent::End`].
    async fn start(&self, mode: RecognitionMode) -> Result<mpsc::Receiver<RecognitionEvent>, VoiceError>;

    /// Stop any running recognition.
    fn stop(&self);
}

/// A text-to-speech engine.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), VoiceError>;
}

/// A synthesizer that stays silent.
#[derive(Debug, Clone, Default)]
pub struct NoOpSynthesizer;

#[async_trait]
impl SpeechSynthesizer for NoOpSynthesizer {
    async fn speak(&self, _text: &str) -> Result<(), VoiceError> {
        Ok(())
    }
}

/// A synthesizer that logs what it would say.
#[derive(Debug, Clone, Default)]
pub struct LoggingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for LoggingSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        tracing::info!("[voice] {}", text);
        Ok(())
    }
}
