//! Scripted speech engines and a recording command sink.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use kitchen_core::{Order, OrderId, OrderStatus, ScreenView};
use tokio::sync::{mpsc, watch};
use voice_pipeline::{
    CommandInterpreter, CommandSink, DispatchError, InterpretRequest, InterpretedCommand, RecognitionEvent,
    RecognitionMode, SpeechRecognizer, SpeechSynthesizer, VoiceError,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A recognizer that replays scripted runs.
///
/// Each `start` consumes the next script. A script ending in
/// [`RecognitionEvent::End`] closes its channel; any other script, and any
/// start without a script, leaves the run open so [`emit`](Self::emit) can
/// feed it. `stop` closes every open run.
#[derive(Debug, Default)]
pub struct ScriptedRecognizer {
    scripts: Mutex<VecDeque<Vec<RecognitionEvent>>>,
    starts: Mutex<Vec<RecognitionMode>>,
    open: Mutex<Vec<mpsc::Sender<RecognitionEvent>>>,
    stops: AtomicUsize,
    fail_start: AtomicBool,
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the events of the next run.
    pub fn push_script(&self, events: Vec<RecognitionEvent>) {
        lock(&self.scripts).push_back(events);
    }

    /// Make `start` fail.
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Send an event into the most recent open run. Returns false when no
    /// run is open.
    pub async fn emit(&self, event: RecognitionEvent) -> bool {
        let sender = lock(&self.open).last().cloned();
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Modes of every `start`, oldest first.
    pub fn starts(&self) -> Vec<RecognitionMode> {
        lock(&self.starts).clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Whether a run is currently open.
    pub fn is_listening(&self) -> bool {
        lock(&self.open).iter().any(|s| !s.is_closed())
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn start(&self, mode: RecognitionMode) -> Result<mpsc::Receiver<RecognitionEvent>, VoiceError> {
        lock(&self.starts).push(mode);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(VoiceError::Recognizer("microphone unavailable".to_string()));
        }

        let script = lock(&self.scripts).pop_front().unwrap_or_default();
        let (tx, rx) = mpsc::channel(script.len() + 16);
        let closes = matches!(script.last(), Some(RecognitionEvent::End));
        for event in script {
            // Capacity covers the whole script
            let _ = tx.try_send(event);
        }
        if !closes {
            lock(&self.open).push(tx);
        }
        Ok(rx)
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        lock(&self.open).clear();
    }
}

/// A synthesizer that keeps everything it is asked to say.
#[derive(Debug, Default)]
pub struct RecordingSynthesizer {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<String> {
        lock(&self.spoken).clone()
    }

    pub fn last(&self) -> Option<String> {
        lock(&self.spoken).last().cloned()
    }

    /// Whether anything spoken contains `text` (case-insensitive).
    pub fn said(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        lock(&self.spoken).iter().any(|s| s.to_lowercase().contains(&text))
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        lock(&self.spoken).push(text.to_string());
        Ok(())
    }
}

/// An interpreter answering from a queue of scripted responses.
#[derive(Debug, Default)]
pub struct ScriptedInterpreter {
    responses: Mutex<VecDeque<Result<InterpretedCommand, String>>>,
    requests: Mutex<Vec<InterpretRequest>>,
}

impl ScriptedInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: InterpretedCommand) {
        lock(&self.responses).push_back(Ok(command));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.responses).push_back(Err(message.into()));
    }

    /// Requests received, oldest first.
    pub fn requests(&self) -> Vec<InterpretRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl CommandInterpreter for ScriptedInterpreter {
    async fn interpret(&self, request: &InterpretRequest) -> Result<InterpretedCommand, VoiceError> {
        lock(&self.requests).push(request.clone());
        match lock(&self.responses).pop_front() {
            Some(Ok(command)) => Ok(command),
            Some(Err(body)) => Err(VoiceError::Interpreter { status: 500, body }),
            None => Err(VoiceError::Interpreter {
                status: 503,
                body: "no scripted response".to_string(),
            }),
        }
    }
}

/// A command sink that records dispatches instead of changing orders.
#[derive(Debug)]
pub struct RecordingSink {
    orders: watch::Sender<Arc<Vec<Order>>>,
    changes: Mutex<Vec<(OrderId, OrderStatus)>>,
    views: Mutex<Vec<ScreenView>>,
    result: Mutex<Option<DispatchError>>,
}

impl RecordingSink {
    pub fn new(orders: Vec<Order>) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(orders));
        Self {
            orders: tx,
            changes: Mutex::new(Vec::new()),
            views: Mutex::new(Vec::new()),
            result: Mutex::new(None),
        }
    }

    /// Replace the board and notify subscribers.
    pub fn set_orders(&self, orders: Vec<Order>) {
        self.orders.send_replace(Arc::new(orders));
    }

    /// Make every status change fail with `error`.
    pub fn fail_with(&self, error: Option<DispatchError>) {
        *lock(&self.result) = error;
    }

    pub fn changes(&self) -> Vec<(OrderId, OrderStatus)> {
        lock(&self.changes).clone()
    }

    pub fn views(&self) -> Vec<ScreenView> {
        lock(&self.views).clone()
    }
}

#[async_trait]
impl CommandSink for RecordingSink {
    fn subscribe_orders(&self) -> watch::Receiver<Arc<Vec<Order>>> {
        self.orders.subscribe()
    }

    async fn change_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<(), DispatchError> {
        lock(&self.changes).push((order_id.clone(), status));
        match lock(&self.result).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn show_view(&self, view: ScreenView) {
        lock(&self.views).push(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_ending_in_end_closes() {
        let recognizer = ScriptedRecognizer::new();
        recognizer.push_script(vec![RecognitionEvent::interim("hello"), RecognitionEvent::End]);

        let mut rx = recognizer.start(RecognitionMode::Continuous).await.unwrap();
        assert_eq!(rx.recv().await, Some(RecognitionEvent::interim("hello")));
        assert_eq!(rx.recv().await, Some(RecognitionEvent::End));
        assert_eq!(rx.recv().await, None);
        assert!(!recognizer.is_listening());
    }

    #[tokio::test]
    async fn test_open_run_accepts_emits_until_stopped() {
        let recognizer = ScriptedRecognizer::new();
        let mut rx = recognizer.start(RecognitionMode::SingleShot).await.unwrap();
        assert!(recognizer.emit(RecognitionEvent::final_result("two ready", 0.9)).await);
        assert!(rx.recv().await.is_some());

        recognizer.stop();
        assert_eq!(rx.recv().await, None);
        assert!(!recognizer.emit(RecognitionEvent::End).await);
        assert_eq!(recognizer.starts(), vec![RecognitionMode::SingleShot]);
    }
}
