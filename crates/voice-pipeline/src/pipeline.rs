//! Voice listener state machine.
//!
//! ```text
//! Idle ──activate──▶ ListeningForWakeWord ──wake phrase──▶ CommandListening
//!   ▲                       ▲                                   │
//!   └──deactivate/deadline  └────── final / error / timeout ────┘
//! ```
//!
//! Each recognizer run is tagged with a generation number. Every transition
//! claims the current generation with a compare-and-swap, so late events from
//! a superseded run are dropped and a wake phrase repeated across interim
//! results switches modes exactly once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use kitchen_core::{Clock, Scheduler, TimerHandle};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::command::{gate, status_phrase, GateRejection, VoiceCommand};
use crate::config::VoiceConfig;
use crate::engine::{RecognitionAlternative, RecognitionEvent, RecognitionMode, SpeechRecognizer, SpeechSynthesizer};
use crate::error::{DispatchError, VoiceError};
use crate::interpreter::{CommandInterpreter, InterpretRequest};
use crate::numbering::OrderNumberMap;
use crate::session::VoiceSession;
use crate::sink::CommandSink;

/// Listener state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    ListeningForWakeWord,
    CommandListening,
}

/// What happened to one captured command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command was carried out.
    Dispatched(VoiceCommand),
    /// The gate refused the command.
    Rejected(GateRejection),
    /// The spoken number matches no order.
    UnknownOrder(u32),
    /// The screen refused or failed the change.
    DispatchFailed(DispatchError),
    /// The interpreter could not be reached or answered nonsense.
    InterpreterFailed,
    /// Nothing was said.
    Empty,
}

/// The engines the pipeline drives.
#[derive(Clone)]
pub struct VoiceEngines {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub interpreter: Arc<dyn CommandInterpreter>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Wake,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Final,
    Ended,
    Failed,
    TimedOut,
}

#[derive(Debug)]
struct PipelineState {
    listener: ListenerState,
    session: Option<VoiceSession>,
    numbers: OrderNumberMap,
    transcript: String,
    best: Option<RecognitionAlternative>,
    command_timer: Option<TimerHandle>,
}

impl PipelineState {
    fn idle() -> Self {
        Self {
            listener: ListenerState::Idle,
            session: None,
            numbers: OrderNumberMap::default(),
            transcript: String::new(),
            best: None,
            command_timer: None,
        }
    }
}

/// Voice mode for one kitchen screen.
pub struct VoicePipeline {
    config: VoiceConfig,
    engines: VoiceEngines,
    sink: Arc<dyn CommandSink>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
    generation: AtomicU64,
    state: Mutex<PipelineState>,
}

impl VoicePipeline {
    pub fn new(
        config: VoiceConfig,
        engines: VoiceEngines,
        sink: Arc<dyn CommandSink>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            engines,
            sink,
            clock,
            scheduler: Scheduler::new(),
            generation: AtomicU64::new(0),
            state: Mutex::new(PipelineState::idle()),
        })
    }

    /// Switch voice mode on or off. Returns whether it is now on.
    pub async fn toggle(self: &Arc<Self>) -> Result<bool, VoiceError> {
        if self.is_active() {
            self.deactivate();
            Ok(false)
        } else {
            self.activate().await?;
            Ok(true)
        }
    }

    /// Start a voice session and begin listening for the wake phrase.
    ///
    /// Does nothing when a session is already running.
    pub async fn activate(self: &Arc<Self>) -> Result<(), VoiceError> {
        let numbers = OrderNumberMap::compute(&self.sink.subscribe_orders().borrow());
        {
            let mut state = self.lock();
            if state.session.is_some() {
                return Ok(());
            }
            state.session = Some(VoiceSession::start(self.clock.now(), self.config.session_duration));
            state.numbers = numbers;
        }
        info!(
            wake_phrase = %self.config.wake_phrase,
            session_secs = self.config.session_duration.as_secs(),
            "VOICE_ACTIVATED"
        );

        let weak = Arc::downgrade(self);
        self.scheduler.after(self.config.session_duration, async move {
            if let Some(pipeline) = weak.upgrade() {
                info!("VOICE_SESSION_EXPIRED");
                pipeline.deactivate();
            }
        });
        self.watch_orders();

        if let Err(e) = self.start_wake_listening().await {
            warn!(error = %e, "Failed to start wake-word listening");
            self.deactivate();
            return Err(e);
        }
        Ok(())
    }

    /// End the session: stop recognition, drop transcript state and the
    /// order numbers, and cancel every timer.
    pub fn deactivate(&self) {
        let was_active = {
            let mut state = self.lock();
            let was_active = state.session.is_some();
            *state = PipelineState::idle();
            was_active
        };
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.engines.recognizer.stop();
        let cancelled = self.scheduler.cancel_all();
        if was_active {
            info!(cancelled, "VOICE_DEACTIVATED");
        }
    }

    pub fn is_active(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn listener_state(&self) -> ListenerState {
        self.lock().listener
    }

    pub fn session(&self) -> Option<VoiceSession> {
        self.lock().session.clone()
    }

    /// Current order numbers. Empty while voice mode is off.
    pub fn order_numbers(&self) -> OrderNumberMap {
        self.lock().numbers.clone()
    }

    /// Latest transcript heard in the current phase.
    pub fn transcript(&self) -> String {
        self.lock().transcript.clone()
    }

    /// Number of live timers and listener tasks.
    pub fn active_timers(&self) -> usize {
        self.scheduler.active_count()
    }

    /// Interpret a captured command and carry it out.
    pub async fn handle_command_transcript(&self, text: &str) -> CommandOutcome {
        let text = text.trim();
        if text.is_empty() {
            return CommandOutcome::Empty;
        }

        let numbers = OrderNumberMap::compute(&self.sink.subscribe_orders().borrow());
        {
            let mut state = self.lock();
            if state.session.is_some() {
                state.numbers = numbers.clone();
            }
        }

        let request = InterpretRequest::new(text, &numbers);
        let command = match self.engines.interpreter.interpret(&request).await {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "VOICE_INTERPRETER_FAILED");
                self.say("Sorry, I couldn't process that command.").await;
                return CommandOutcome::InterpreterFailed;
            }
        };

        let now = self.clock.now();
        if let Some(session) = self.lock().session.as_mut() {
            session.record_command(now);
        }

        let voice_command = match gate(&command) {
            Ok(voice_command) => voice_command,
            Err(rejection) => {
                info!(
                    action = %command.action,
                    confidence = command.confidence,
                    rejection = ?rejection,
                    "VOICE_GATE_REJECTED"
                );
                self.say(&rejection.reply()).await;
                return CommandOutcome::Rejected(rejection);
            }
        };

        info!(command = ?voice_command, confidence = command.confidence, "VOICE_COMMAND_ACCEPTED");
        match voice_command {
            VoiceCommand::ChangeStatus { order_number, status } => {
                let Some(target) = numbers.order_for(order_number) else {
                    self.say(&format!("I couldn't find order {}.", order_number)).await;
                    return CommandOutcome::UnknownOrder(order_number);
                };

                match self.sink.change_status(&target.order_id, status).await {
                    Ok(()) => {
                        self.say(&format!("Order {} {}.", order_number, status_phrase(status)))
                            .await;
                        CommandOutcome::Dispatched(voice_command)
                    }
                    Err(e) => {
                        let reply = match &e {
                            DispatchError::Rejected(reason) => format!("Order {}: {}.", order_number, reason),
                            DispatchError::TimedOut => {
                                format!("Updating order {} timed out, please retry.", order_number)
                            }
                            DispatchError::Failed(_) => format!("I couldn't update order {}.", order_number),
                        };
                        self.say(&reply).await;
                        CommandOutcome::DispatchFailed(e)
                    }
                }
            }
            VoiceCommand::ShowView(view) => {
                self.sink.show_view(view);
                self.say(&format!("Showing {}.", view.spoken())).await;
                CommandOutcome::Dispatched(voice_command)
            }
            VoiceCommand::ListOrders => {
                self.say(&describe_orders(&numbers)).await;
                CommandOutcome::Dispatched(voice_command)
            }
        }
    }

    fn watch_orders(self: &Arc<Self>) {
        let mut orders = self.sink.subscribe_orders();
        let weak = Arc::downgrade(self);
        self.scheduler.spawn(async move {
            while orders.changed().await.is_ok() {
                let Some(pipeline) = weak.upgrade() else {
                    break;
                };
                let snapshot = orders.borrow_and_update().clone();
                let numbers = OrderNumberMap::compute(&snapshot);
                {
                    let mut state = pipeline.lock();
                    if state.session.is_some() {
                        debug!(numbered = numbers.len(), "Order numbers recomputed");
                        state.numbers = numbers;
                    }
                }
            }
        });
    }

    async fn start_wake_listening(self: &Arc<Self>) -> Result<(), VoiceError> {
        let generation = {
            let mut state = self.lock();
            if state.session.is_none() {
                return Ok(());
            }
            state.listener = ListenerState::ListeningForWakeWord;
            state.transcript.clear();
            state.best = None;
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let events = self.engines.recognizer.start(RecognitionMode::Continuous).await?;
        if !self.is_current(generation) {
            self.engines.recognizer.stop();
            return Ok(());
        }
        debug!(generation, "Listening for wake phrase");
        self.consume(events, generation, Phase::Wake);
        Ok(())
    }

    async fn start_command_listening(self: &Arc<Self>, generation: u64) -> Result<(), VoiceError> {
        let events = self.engines.recognizer.start(RecognitionMode::SingleShot).await?;
        if !self.is_current(generation) {
            self.engines.recognizer.stop();
            return Ok(());
        }

        let weak = Arc::downgrade(self);
        let timer = self.scheduler.after(self.config.command_timeout, async move {
            if let Some(pipeline) = weak.upgrade() {
                pipeline.finish_command(generation, Finish::TimedOut);
            }
        });
        self.lock().command_timer = Some(timer);
        self.consume(events, generation, Phase::Command);
        Ok(())
    }

    fn consume(self: &Arc<Self>, mut events: mpsc::Receiver<RecognitionEvent>, generation: u64, phase: Phase) {
        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.spawn(async move {
            loop {
                let event = events.recv().await.unwrap_or(RecognitionEvent::End);
                let Some(pipeline) = weak.upgrade() else {
                    break;
                };
                let keep_listening = match phase {
                    Phase::Wake => pipeline.on_wake_event(generation, event).await,
                    Phase::Command => pipeline.on_command_event(generation, event),
                };
                if !keep_listening {
                    break;
                }
            }
        });
    }

    async fn on_wake_event(self: &Arc<Self>, generation: u64, event: RecognitionEvent) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        match event {
            RecognitionEvent::Result { alternatives, .. } => {
                if let Some(first) = alternatives.first() {
                    self.lock().transcript = first.transcript.clone();
                }
                let heard = alternatives
                    .iter()
                    .any(|a| contains_phrase(&a.transcript, &self.config.wake_phrase));
                if !heard {
                    return true;
                }
                let Some(command_generation) = self.claim(generation) else {
                    return false;
                };

                {
                    let mut state = self.lock();
                    state.listener = ListenerState::CommandListening;
                    state.transcript.clear();
                    state.best = None;
                    if let Some(session) = state.session.as_mut() {
                        session.record_wake();
                    }
                }
                info!("WAKE_WORD_DETECTED");
                self.engines.recognizer.stop();
                self.say(&self.config.acknowledgment).await;

                if let Err(e) = self.start_command_listening(command_generation).await {
                    warn!(error = %e, "Failed to start command listening");
                    self.return_to_wake();
                }
                false
            }
            RecognitionEvent::Error(message) => {
                warn!(error = %message, "WAKE_RECOGNIZER_ERROR");
                if self.claim(generation).is_some() {
                    self.engines.recognizer.stop();
                    self.schedule_wake_restart();
                }
                false
            }
            RecognitionEvent::End => {
                debug!("Wake-word recognizer ended, restarting");
                if self.claim(generation).is_some() {
                    self.schedule_wake_restart();
                }
                false
            }
        }
    }

    fn on_command_event(self: &Arc<Self>, generation: u64, event: RecognitionEvent) -> bool {
        if !self.is_current(generation) {
            return false;
        }

        match event {
            RecognitionEvent::Result { alternatives, is_final } => {
                {
                    let mut state = self.lock();
                    for alternative in alternatives {
                        let better = state
                            .best
                            .as_ref()
                            .map_or(true, |best| alternative.confidence > best.confidence);
                        if better {
                            state.transcript = alternative.transcript.clone();
                            state.best = Some(alternative);
                        }
                    }
                }
                if is_final {
                    self.finish_command(generation, Finish::Final);
                    false
                } else {
                    true
                }
            }
            RecognitionEvent::Error(message) => {
                warn!(error = %message, "COMMAND_RECOGNIZER_ERROR");
                self.finish_command(generation, Finish::Failed);
                false
            }
            RecognitionEvent::End => {
                self.finish_command(generation, Finish::Ended);
                false
            }
        }
    }

    /// Leave command listening. The best transcript, if any, is handled on
    /// its own task so a later deactivation cannot interrupt a mutation.
    fn finish_command(self: &Arc<Self>, generation: u64, reason: Finish) {
        if self.claim(generation).is_none() {
            return;
        }
        self.engines.recognizer.stop();

        let (timer, best) = {
            let mut state = self.lock();
            state.listener = ListenerState::ListeningForWakeWord;
            state.transcript.clear();
            (state.command_timer.take(), state.best.take())
        };
        if reason != Finish::TimedOut {
            if let Some(timer) = timer {
                self.scheduler.cancel(timer);
            }
        }

        let transcript = match reason {
            Finish::Final | Finish::Ended => best.map(|b| b.transcript).filter(|t| !t.trim().is_empty()),
            Finish::Failed => None,
            Finish::TimedOut => {
                info!("VOICE_COMMAND_TIMEOUT");
                None
            }
        };

        match transcript {
            Some(text) => {
                let pipeline = Arc::clone(self);
                // Detached from the scheduler: a dispatched mutation must run
                // to its keep-or-revert outcome even if voice is switched off.
                // `return_to_wake` is a no-op once the session is gone.
                tokio::spawn(async move {
                    pipeline.handle_command_transcript(&text).await;
                    pipeline.return_to_wake();
                });
            }
            None => self.return_to_wake(),
        }
    }

    fn return_to_wake(self: &Arc<Self>) {
        let generation = {
            let mut state = self.lock();
            if state.session.is_none() {
                return;
            }
            state.listener = ListenerState::ListeningForWakeWord;
            self.generation.load(Ordering::SeqCst)
        };
        if self.claim(generation).is_some() {
            self.schedule_wake_restart();
        }
    }

    fn schedule_wake_restart(self: &Arc<Self>) {
        if !self.is_active() {
            return;
        }
        let expected = self.generation.load(Ordering::SeqCst);
        let weak = Arc::downgrade(self);
        self.scheduler.after(self.config.restart_delay, async move {
            let Some(pipeline) = weak.upgrade() else {
                return;
            };
            if !pipeline.is_current(expected) {
                return;
            }
            if let Err(e) = pipeline.start_wake_listening().await {
                warn!(error = %e, "WAKE_LISTENER_RESTART_FAILED");
                pipeline.schedule_wake_restart();
            }
        });
    }

    /// Advance from `generation` to the next one. `None` if another
    /// transition already did.
    fn claim(&self, generation: u64) -> Option<u64> {
        self.generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|g| g + 1)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn say(&self, text: &str) {
        if let Err(e) = self.engines.synthesizer.speak(text).await {
            warn!(error = %e, "VOICE_SPEAK_FAILED");
        }
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VoicePipeline {
    fn drop(&mut self) {
        self.engines.recognizer.stop();
    }
}

impl std::fmt::Debug for VoicePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoicePipeline")
            .field("wake_phrase", &self.config.wake_phrase)
            .field("state", &self.listener_state())
            .finish()
    }
}

/// Whether `transcript` contains `phrase` as whole words, ignoring case and
/// punctuation.
pub fn contains_phrase(transcript: &str, phrase: &str) -> bool {
    let phrase = normalize(phrase);
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", normalize(transcript)).contains(&format!(" {} ", phrase))
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn describe_orders(numbers: &OrderNumberMap) -> String {
    if numbers.is_empty() {
        return "There are no active orders.".to_string();
    }
    numbers
        .entries()
        .map(|(n, order)| format!("Order {}, number {}, {}.", n, order.order_number, order.status))
        .collect::<Vec<_>>()
        .join(" ")
}
