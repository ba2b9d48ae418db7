//! Voice command pipeline for the kitchen screen.
//!
//! Voice mode listens for a wake phrase, captures one spoken command,
//! interprets it through an external language-understanding service and
//! dispatches it into the same mutation path the screen's buttons use.
//!
//! - [`VoicePipeline`] - Listener state machine and session lifetime
//! - [`SpeechRecognizer`] / [`SpeechSynthesizer`] - Injected speech engines
//! - [`CommandInterpreter`] - Speech-to-intent boundary
//! - [`OrderNumberMap`] - Short spoken numbers for active orders
//! - [`gate`] - Confidence gate and action allow-list
//!
//! Commands with a confidence below [`MIN_CONFIDENCE`] are never
//! dispatched.

mod command;
mod config;
mod engine;
mod error;
mod interpreter;
mod numbering;
mod pipeline;
mod session;
mod sink;

pub use command::{gate, status_phrase, GateRejection, InterpretedCommand, VoiceCommand, ALLOWED_ACTIONS, MIN_CONFIDENCE};
pub use config::{InterpreterConfig, VoiceConfig, DEFAULT_WAKE_PHRASE};
pub use engine::{
    LoggingSynthesizer, NoOpSynthesizer, RecognitionAlternative, RecognitionEvent, RecognitionMode, SpeechRecognizer,
    SpeechSynthesizer,
};
pub use error::{DispatchError, VoiceError};
pub use interpreter::{CommandInterpreter, HttpCommandInterpreter, InterpretRequest};
pub use numbering::{NumberedOrder, OrderNumberMap};
pub use pipeline::{contains_phrase, CommandOutcome, ListenerState, VoiceEngines, VoicePipeline};
pub use session::VoiceSession;
pub use sink::CommandSink;

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
