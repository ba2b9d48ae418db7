//! Voice pipeline behaviour against scripted engines.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use kitchen_core::{Order, OrderId, OrderStatus, ScreenView, SystemClock};
use mock_services::{RecordingSink, RecordingSynthesizer, ScriptedInterpreter, ScriptedRecognizer};
use voice_pipeline::{
    CommandOutcome, DispatchError, GateRejection, InterpretedCommand, ListenerState, RecognitionAlternative,
    RecognitionEvent, RecognitionMode, VoiceCommand, VoiceConfig, VoiceEngines, VoicePipeline,
};

struct Harness {
    pipeline: Arc<VoicePipeline>,
    recognizer: Arc<ScriptedRecognizer>,
    synthesizer: Arc<RecordingSynthesizer>,
    interpreter: Arc<ScriptedInterpreter>,
    sink: Arc<RecordingSink>,
}

fn board() -> Vec<Order> {
    let base = Utc::now() - ChronoDuration::minutes(30);
    vec![
        Order::new("pending-a", "101", base).with_status(OrderStatus::Pending),
        Order::new("prep-b", "102", base + ChronoDuration::minutes(2))
            .with_status(OrderStatus::Preparing)
            .with_started_at(base),
        Order::new("prep-a", "103", base + ChronoDuration::minutes(1))
            .with_status(OrderStatus::Preparing)
            .with_started_at(base),
    ]
}

fn harness() -> Harness {
    let recognizer = Arc::new(ScriptedRecognizer::new());
    let synthesizer = Arc::new(RecordingSynthesizer::new());
    let interpreter = Arc::new(ScriptedInterpreter::new());
    let sink = Arc::new(RecordingSink::new(board()));
    let pipeline = VoicePipeline::new(
        VoiceConfig::default(),
        VoiceEngines {
            recognizer: recognizer.clone(),
            synthesizer: synthesizer.clone(),
            interpreter: interpreter.clone(),
        },
        sink.clone(),
        Arc::new(SystemClock),
    );
    Harness {
        pipeline,
        recognizer,
        synthesizer,
        interpreter,
        sink,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_wake_word_mid_utterance_switches_once() {
    let h = harness();
    assert!(h.pipeline.toggle().await.unwrap());
    assert_eq!(h.pipeline.listener_state(), ListenerState::ListeningForWakeWord);

    h.recognizer.emit(RecognitionEvent::interim("okay code")).await;
    h.recognizer.emit(RecognitionEvent::interim("okay code work")).await;
    h.recognizer.emit(RecognitionEvent::interim("okay code work mark")).await;
    h.recognizer
        .emit(RecognitionEvent::final_result("okay code work mark two", 0.8))
        .await;
    settle().await;

    assert_eq!(h.pipeline.listener_state(), ListenerState::CommandListening);
    assert_eq!(
        h.recognizer.starts(),
        vec![RecognitionMode::Continuous, RecognitionMode::SingleShot]
    );
    assert_eq!(h.synthesizer.spoken(), vec!["Yes?".to_string()]);
    assert!(h.pipeline.session().unwrap().wake_word_detected);
}

#[tokio::test(start_paused = true)]
async fn test_wake_phrase_in_several_alternatives_counts_once() {
    let h = harness();
    h.pipeline.activate().await.unwrap();

    h.recognizer
        .emit(RecognitionEvent::Result {
            alternatives: vec![
                RecognitionAlternative::new("code work", 0.6),
                RecognitionAlternative::new("code work please", 0.4),
            ],
            is_final: true,
        })
        .await;
    settle().await;

    assert_eq!(h.synthesizer.spoken().len(), 1);
    assert_eq!(h.recognizer.starts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_full_command_round_trip() {
    let h = harness();
    h.interpreter.push(InterpretedCommand::change_status(2, "ready", 0.95));
    h.pipeline.activate().await.unwrap();

    h.recognizer.emit(RecognitionEvent::interim("code work")).await;
    settle().await;
    h.recognizer
        .emit(RecognitionEvent::Result {
            alternatives: vec![
                RecognitionAlternative::new("mark to ready", 0.41),
                RecognitionAlternative::new("mark two ready", 0.93),
            ],
            is_final: true,
        })
        .await;
    settle().await;

    // Numbering: prep-a (created first), prep-b, then pending-a
    assert_eq!(h.sink.changes(), vec![(OrderId::new("prep-b"), OrderStatus::Ready)]);
    assert_eq!(h.interpreter.requests()[0].text, "mark two ready");
    assert_eq!(h.synthesizer.last().as_deref(), Some("Order 2 marked ready."));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.pipeline.listener_state(), ListenerState::ListeningForWakeWord);
    assert_eq!(
        h.recognizer.starts(),
        vec![
            RecognitionMode::Continuous,
            RecognitionMode::SingleShot,
            RecognitionMode::Continuous
        ]
    );
}

#[tokio::test]
async fn test_low_confidence_never_dispatches() {
    let h = harness();
    h.interpreter.push(InterpretedCommand::change_status(1, "ready", 0.69));

    let outcome = h.pipeline.handle_command_transcript("mark one ready").await;

    assert_eq!(outcome, CommandOutcome::Rejected(GateRejection::LowConfidence(0.69)));
    assert!(h.sink.changes().is_empty());
    assert!(h.synthesizer.said("not sure"));
}

#[tokio::test]
async fn test_disallowed_action_gets_refusal() {
    let h = harness();
    h.interpreter.push(InterpretedCommand::new("delete_order", 0.99));

    let outcome = h.pipeline.handle_command_transcript("delete order one").await;

    assert_eq!(
        outcome,
        CommandOutcome::Rejected(GateRejection::Disallowed("delete_order".to_string()))
    );
    assert!(h.sink.changes().is_empty());
    assert!(h.synthesizer.said("I can only"));
}

#[tokio::test]
async fn test_unknown_order_number() {
    let h = harness();
    h.interpreter.push(InterpretedCommand::change_status(7, "ready", 0.9));

    let outcome = h.pipeline.handle_command_transcript("order seven ready").await;

    assert_eq!(outcome, CommandOutcome::UnknownOrder(7));
    assert!(h.synthesizer.said("couldn't find order 7"));
}

#[tokio::test]
async fn test_dispatch_timeout_is_spoken() {
    let h = harness();
    h.sink.fail_with(Some(DispatchError::TimedOut));
    h.interpreter.push(InterpretedCommand::change_status(1, "ready", 0.9));

    let outcome = h.pipeline.handle_command_transcript("one ready").await;

    assert_eq!(outcome, CommandOutcome::DispatchFailed(DispatchError::TimedOut));
    assert!(h.synthesizer.said("timed out"));
}

#[tokio::test]
async fn test_views_and_listing() {
    let h = harness();
    h.interpreter.push(InterpretedCommand::new("show_all_day", 0.9));
    h.interpreter.push(InterpretedCommand::new("list_orders", 0.9));

    assert_eq!(
        h.pipeline.handle_command_transcript("show all day").await,
        CommandOutcome::Dispatched(VoiceCommand::ShowView(ScreenView::AllDay))
    );
    assert_eq!(h.sink.views(), vec![ScreenView::AllDay]);

    h.pipeline.handle_command_transcript("what's up").await;
    let listing = h.synthesizer.last().unwrap();
    assert!(listing.starts_with("Order 1, number 103, preparing."));
    assert!(listing.ends_with("Order 3, number 101, pending."));
}

#[tokio::test]
async fn test_interpreter_failure_is_spoken() {
    let h = harness();
    h.interpreter.push_error("boom");

    let outcome = h.pipeline.handle_command_transcript("anything").await;

    assert_eq!(outcome, CommandOutcome::InterpreterFailed);
    assert!(h.synthesizer.said("couldn't process"));
}

#[tokio::test(start_paused = true)]
async fn test_command_timeout_returns_to_wake_listening() {
    let h = harness();
    h.pipeline.activate().await.unwrap();
    h.recognizer.emit(RecognitionEvent::interim("code work")).await;
    settle().await;
    assert_eq!(h.pipeline.listener_state(), ListenerState::CommandListening);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.pipeline.listener_state(), ListenerState::ListeningForWakeWord);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.recognizer.starts().len(), 3);
    assert!(h.interpreter.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_command_error_returns_to_wake_listening() {
    let h = harness();
    h.pipeline.activate().await.unwrap();
    h.recognizer.emit(RecognitionEvent::interim("code work")).await;
    settle().await;

    h.recognizer.emit(RecognitionEvent::Error("no-speech".to_string())).await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(h.pipeline.listener_state(), ListenerState::ListeningForWakeWord);
    assert_eq!(h.recognizer.starts().last(), Some(&RecognitionMode::Continuous));
    assert!(h.interpreter.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_continuous_engine_end_restarts_after_delay() {
    let h = harness();
    h.recognizer.push_script(vec![RecognitionEvent::End]);
    h.pipeline.activate().await.unwrap();

    settle().await;
    assert_eq!(h.recognizer.starts().len(), 1);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        h.recognizer.starts(),
        vec![RecognitionMode::Continuous, RecognitionMode::Continuous]
    );
}

#[tokio::test(start_paused = true)]
async fn test_numbers_follow_store_changes() {
    let h = harness();
    assert!(h.pipeline.order_numbers().is_empty());
    h.pipeline.activate().await.unwrap();
    assert_eq!(h.pipeline.order_numbers().len(), 3);

    let mut orders = board();
    orders.push(Order::new("ready-a", "104", Utc::now()).with_status(OrderStatus::Ready));
    h.sink.set_orders(orders);
    settle().await;

    let numbers = h.pipeline.order_numbers();
    assert_eq!(numbers.len(), 4);
    assert_eq!(numbers.number_of(&OrderId::new("ready-a")), Some(4));
}

#[tokio::test(start_paused = true)]
async fn test_toggle_off_leaves_nothing_running() {
    let h = harness();
    h.pipeline.activate().await.unwrap();
    h.recognizer.emit(RecognitionEvent::interim("code work")).await;
    settle().await;
    assert!(h.pipeline.active_timers() > 0);

    assert!(!h.pipeline.toggle().await.unwrap());

    assert_eq!(h.pipeline.active_timers(), 0);
    assert_eq!(h.pipeline.listener_state(), ListenerState::Idle);
    assert!(h.pipeline.order_numbers().is_empty());
    assert!(h.pipeline.transcript().is_empty());
    assert!(h.pipeline.session().is_none());
    assert!(!h.recognizer.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_session_deadline_deactivates() {
    let h = harness();
    h.pipeline.activate().await.unwrap();

    tokio::time::sleep(Duration::from_secs(3599)).await;
    assert!(h.pipeline.is_active());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!h.pipeline.is_active());
    assert_eq!(h.pipeline.active_timers(), 0);
}

#[tokio::test]
async fn test_activation_fails_when_microphone_is_unavailable() {
    let h = harness();
    h.recognizer.set_fail_start(true);

    assert!(h.pipeline.activate().await.is_err());
    assert!(!h.pipeline.is_active());
    assert_eq!(h.pipeline.active_timers(), 0);
}
