//! HTTP publish and Server-Sent Events (SSE) subscribe transports.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::Stream;
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::channel::ChangeChannel;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::event::{ChangeEvent, InboundEvent};

/// Envelope posted to the gateway's publish endpoint.
#[derive(Debug, Serialize)]
struct PublishRequest<'a> {
    room: &'a str,
    event: &'static str,
    data: &'a ChangeEvent,
}

/// Publishes change events to the realtime gateway over HTTP.
#[derive(Clone)]
pub struct HttpChannel {
    http: Client,
    config: BridgeConfig,
}

impl HttpChannel {
    /// Create a channel for the configured gateway.
    pub fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(BridgeError::Http)?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ChangeChannel for HttpChannel {
    async fn publish(&self, room: &str, event: &ChangeEvent) -> Result<(), BridgeError> {
        let body = PublishRequest {
            room,
            event: "order_changed",
            data: event,
        };

        let response = self
            .http
            .post(self.config.publish_url())
            .json(&body)
            .send()
            .await
            .map_err(BridgeError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChannel")
            .field("publish_url", &self.config.publish_url())
            .finish()
    }
}

/// A stream of inbound room events.
///
/// The underlying event source reconnects on its own after transient
/// failures; errors are surfaced as items so the consumer can log them.
pub struct EventStream {
    event_source: EventSource,
}

impl EventStream {
    fn open(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let url = config.events_url();
        info!("Creating SSE connection to {}", url);

        // SSE connections are long-lived and must not carry a request timeout
        let client = Client::builder().build().map_err(BridgeError::Http)?;
        let event_source = client
            .get(&url)
            .eventsource()
            .map_err(|e| BridgeError::Sse(e.to_string()))?;

        Ok(Self { event_source })
    }

    /// Parse one SSE message into an inbound event.
    ///
    /// The event name selects the variant when the payload carries no
    /// `type` tag. Unknown event names yield `Ok(None)`.
    pub fn parse_message(event: &str, data: &str) -> Result<Option<InboundEvent>, BridgeError> {
        match event {
            "admin_notification" | "order_changed" => {
                let mut value: serde_json::Value = serde_json::from_str(data)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.entry("type")
                        .or_insert_with(|| serde_json::Value::String(event.to_string()));
                }
                Ok(Some(serde_json::from_value(value)?))
            }
            "message" => Ok(Some(serde_json::from_str(data)?)),
            _ => Ok(None),
        }
    }
}

impl Stream for EventStream {
    type Item = Result<InboundEvent, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.event_source).poll_next(cx) {
                Poll::Ready(Some(Ok(Event::Open))) => {
                    debug!("SSE connection opened");
                    continue;
                }
                Poll::Ready(Some(Ok(Event::Message(msg)))) => {
                    match Self::parse_message(&msg.event, &msg.data) {
                        Ok(Some(event)) => return Poll::Ready(Some(Ok(event))),
                        Ok(None) => {
                            debug!("Ignoring SSE event type: {}", msg.event);
                            continue;
                        }
                        Err(e) => {
                            warn!("Failed to parse SSE event data: {}", e);
                            debug!("Raw data: {}", msg.data);
                            continue;
                        }
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    error!("SSE error: {}", e);
                    return Poll::Ready(Some(Err(BridgeError::Sse(e.to_string()))));
                }
                Poll::Ready(None) => {
                    info!("SSE stream ended");
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Subscribe to the restaurant room's inbound events.
pub fn subscribe(config: &BridgeConfig) -> Result<EventStream, BridgeError> {
    EventStream::open(config)
}
