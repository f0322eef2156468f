//! Transport abstraction between the engine and the chat backend

use std::pin::Pin;

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use scrum_ai::{Context, Message, Model, providers::provider_for, stream::MessageEvent};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Events produced while one backend reply is generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Start,
    Delta(String),
    /// The complete reply text
    Done(String),
    Failed(String),
}

/// A stream of transport events
pub type TransportEventStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// Sends the backend-bound history and streams back one assistant reply
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        system_prompt: Option<&str>,
        turns: &[Message],
        cancel: CancellationToken,
    ) -> Result<TransportEventStream>;
}

/// Calls the chat backend directly through the scrum-ai providers
pub struct ProviderTransport {
    model: Model,
    api_key: Option<String>,
    stream: bool,
}

impl ProviderTransport {
    /// Create a transport that waits for complete replies
    pub fn new(model: Model) -> Self {
        Self {
            model,
            api_key: None,
            stream: false,
        }
    }

    /// Create with a specific API key
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Stream replies token by token
    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn send(
        &self,
        system_prompt: Option<&str>,
        turns: &[Message],
        cancel: CancellationToken,
    ) -> Result<TransportEventStream> {
        let context = Context {
            system_prompt: system_prompt.map(str::to_string),
            messages: turns.to_vec(),
        };
        let provider = provider_for(&self.model, self.api_key.as_deref())?;
        let model = self.model.clone();

        tracing::debug!(
            "Sending {} turns to {} ({})",
            context.messages.len(),
            model.id,
            model.provider.name()
        );

        if !self.stream {
            let event_stream: TransportEventStream = Box::pin(stream! {
                yield TransportEvent::Start;
                match provider.complete(&model, &context).await {
                    Ok((message, usage)) => {
                        tracing::debug!("Reply used {} input / {} output tokens", usage.input, usage.output);
                        yield TransportEvent::Done(message.content);
                    }
                    Err(e) => yield TransportEvent::Failed(e.to_string()),
                }
            });
            return Ok(event_stream);
        }

        let mut message_stream = provider.stream(&model, &context).await?;
        let event_stream: TransportEventStream = Box::pin(stream! {
            while let Some(event) = message_stream.next().await {
                if cancel.is_cancelled() {
                    return;
                }
                match event {
                    MessageEvent::Start => yield TransportEvent::Start,
                    MessageEvent::TextDelta { delta } => yield TransportEvent::Delta(delta),
                    MessageEvent::Done { message, .. } => {
                        yield TransportEvent::Done(message.content);
                        return;
                    }
                    MessageEvent::Error { message } => {
                        yield TransportEvent::Failed(message);
                        return;
                    }
                }
            }
            yield TransportEvent::Failed("stream ended before the reply completed".to_string());
        });

        Ok(event_stream)
    }
}
