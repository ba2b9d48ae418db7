//! Kitchen screen example.
//!
//! Loads the board from the order service, follows the restaurant room and
//! prints the readiness board as it changes. With a command interpreter
//! configured, lines typed on stdin stand in for speech: type the wake
//! phrase, then a command.
//!
//! Run with: cargo run -p kitchen-display --example kitchen_screen
//!
//! Configuration via .env file or environment variables:
//!   KITCHEN_API_URL        - Order service URL
//!   KITCHEN_API_TOKEN      - Bearer token for the order service
//!   KITCHEN_RESTAURANT_ID  - Restaurant scope (required)
//!   KITCHEN_REALTIME_URL   - Realtime gateway URL
//!   KITCHEN_TERMINAL_ID    - This screen's identifier
//!   KITCHEN_UNDO_POLICY    - "local" or "compensating"
//!   KITCHEN_NLU_URL        - Command interpreter URL (enables voice mode)
//!   KITCHEN_NLU_API_KEY    - API key for the interpreter

use std::env;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kitchen_core::SystemClock;
use kitchen_display::{KitchenConfig, KitchenScreen};
use order_client::OrderClient;
use realtime_bridge::{BridgeConfig, HttpChannel, RealtimeBridge};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use voice_pipeline::{
    HttpCommandInterpreter, LoggingSynthesizer, RecognitionEvent, RecognitionMode, SpeechRecognizer, VoiceConfig,
    VoiceEngines, VoiceError, VoicePipeline,
};

/// Treats every stdin line as a final recognition result.
#[derive(Default)]
struct StdinRecognizer {
    current: Arc<Mutex<Option<(mpsc::Sender<RecognitionEvent>, RecognitionMode)>>>,
}

impl StdinRecognizer {
    fn spawn() -> Arc<Self> {
        let recognizer = Arc::new(Self::default());
        let current = recognizer.current.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let target = current.lock().unwrap_or_else(PoisonError::into_inner).clone();
                let Some((tx, mode)) = target else {
                    debug!("Not listening, dropped: {}", line);
                    continue;
                };
                let _ = tx.send(RecognitionEvent::final_result(line, 1.0)).await;
                if mode == RecognitionMode::SingleShot {
                    let _ = tx.send(RecognitionEvent::End).await;
                }
            }
        });
        recognizer
    }
}

#[async_trait]
impl SpeechRecognizer for StdinRecognizer {
    async fn start(&self, mode: RecognitionMode) -> Result<mpsc::Receiver<RecognitionEvent>, VoiceError> {
        let (tx, rx) = mpsc::channel(8);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some((tx, mode));
        Ok(rx)
    }

    fn stop(&self) {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("kitchen_display=info".parse()?)
                .add_directive("voice_pipeline=info".parse()?)
                .add_directive("realtime_bridge=info".parse()?),
        )
        .init();

    let client = Arc::new(OrderClient::from_env()?);
    let bridge_config = BridgeConfig::from_env()?;
    let channel = Arc::new(HttpChannel::new(bridge_config.clone())?);
    let bridge = RealtimeBridge::new(bridge_config.clone(), channel);

    let screen = KitchenScreen::builder(KitchenConfig::from_env()?, client.clone(), bridge)
        .notifier(client)
        .build();

    let loaded = screen.refresh().await?;
    println!("Loaded {} orders for room {}", loaded, bridge_config.room());

    screen.spawn_inbound(realtime_bridge::subscribe(&bridge_config)?);
    screen.start_ticker();

    let voice = if env::var("KITCHEN_NLU_URL").is_ok() {
        let config = VoiceConfig::from_env()?;
        println!("Voice mode on. Say (type) \"{}\" followed by a command.", config.wake_phrase);
        let pipeline = VoicePipeline::new(
            config,
            VoiceEngines {
                recognizer: StdinRecognizer::spawn(),
                synthesizer: Arc::new(LoggingSynthesizer),
                interpreter: Arc::new(HttpCommandInterpreter::from_env()?),
            },
            screen.clone(),
            Arc::new(SystemClock),
        );
        pipeline.activate().await?;
        Some(pipeline)
    } else {
        info!("KITCHEN_NLU_URL not set, voice mode disabled");
        None
    };

    let mut board = screen.subscribe_readiness();
    println!("Press Ctrl+C to stop.\n");
    loop {
        tokio::select! {
            changed = board.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = board.borrow_and_update().clone();
                for entry in snapshot.iter() {
                    println!(
                        "#{:<6} {:>6}  {:?}",
                        entry.order_number,
                        entry.readiness.display(),
                        entry.readiness.urgency
                    );
                }
                println!();
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, shutting down");
                break;
            }
        }
    }

    if let Some(pipeline) = voice {
        pipeline.deactivate();
    }
    screen.shutdown();
    Ok(())
}
