//! Streaming event types and utilities

use crate::types::{Message, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events emitted while a reply is generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Reply generation started
    Start,
    /// A chunk of reply text
    TextDelta { delta: String },
    /// Reply completed successfully
    Done { message: Message, usage: Usage },
    /// Error occurred
    Error { message: String },
}

impl MessageEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageEvent::Done { .. } | MessageEvent::Error { .. })
    }

    /// Get the final message if this is a Done event
    pub fn into_message(self) -> Option<Message> {
        match self {
            MessageEvent::Done { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A stream of message events
pub type MessageEventStream = Pin<Box<dyn Stream<Item = MessageEvent> + Send>>;

/// Builder for constructing an assistant reply from streaming events
#[derive(Debug, Default)]
pub struct MessageBuilder {
    text: String,
    usage: Usage,
    done: Option<Message>,
}

impl MessageBuilder {
    /// Create a new message builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a streaming event and update the reply state
    pub fn process_event(&mut self, event: &MessageEvent) {
        match event {
            MessageEvent::TextDelta { delta } => self.text.push_str(delta),
            MessageEvent::Done { message, usage } => {
                self.usage = usage.clone();
                self.done = Some(message.clone());
            }
            MessageEvent::Start | MessageEvent::Error { .. } => {}
        }
    }

    /// Text accumulated so far
    pub fn current_text(&self) -> &str {
        &self.text
    }

    /// Usage reported by the final event
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Build the final message.
    ///
    /// A `Done` event's message wins; otherwise the accumulated deltas are used.
    pub fn build(self) -> Message {
        self.done.unwrap_or_else(|| Message::assistant(self.text))
    }
}

/// Drain a stream into one assistant message.
///
/// Returns the backend's error text if the stream reports one, or if it ends
/// without a terminal event.
pub async fn collect_message(
    mut stream: MessageEventStream,
) -> std::result::Result<(Message, Usage), String> {
    let mut builder = MessageBuilder::new();
    while let Some(event) = stream.next().await {
        builder.process_event(&event);
        match event {
            MessageEvent::Error { message } => return Err(message),
            MessageEvent::Done { .. } => {
                let usage = builder.usage().clone();
                return Ok((builder.build(), usage));
            }
            _ => {}
        }
    }
    Err("stream ended before the reply completed".to_string())
}
