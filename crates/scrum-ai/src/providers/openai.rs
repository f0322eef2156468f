//! OpenAI-compatible Chat Completions provider

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::{LlmProvider, http_client, with_model_headers};
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{Context, Message, Model, Usage},
};

/// OpenAI-compatible API client
pub struct OpenAIProvider {
    api_key: String,
}

impl OpenAIProvider {
    /// Create a new provider with an API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Create from environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::InvalidApiKey)?;
        Ok(Self::new(api_key))
    }

    fn build_request(model: &Model, context: &Context, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: model.id.clone(),
            messages: context
                .wire_messages()
                .into_iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str().to_string(),
                    content: Some(m.content),
                })
                .collect(),
            stream,
            max_tokens: model.max_tokens,
        }
    }

    fn request_builder(
        &self,
        model: &Model,
        context: &Context,
        stream: bool,
    ) -> Result<reqwest::RequestBuilder> {
        let url = format!("{}/chat/completions", model.base_url.trim_end_matches('/'));
        let request = Self::build_request(model, context, stream);
        tracing::debug!("POST {} ({} messages, stream={})", url, request.messages.len(), stream);

        let client = http_client(model)?;
        Ok(with_model_headers(client.post(&url), model)
            .bearer_auth(&self.api_key)
            .json(&request))
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    async fn complete(&self, model: &Model, context: &Context) -> Result<(Message, Usage)> {
        let response = self.request_builder(model, context, false)?.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, &body));
        }

        let completion: Completion = response.json().await?;
        completion_into_message(completion)
    }

    async fn stream(&self, model: &Model, context: &Context) -> Result<MessageEventStream> {
        let builder = self.request_builder(model, context, true)?;
        let event_source = EventSource::new(builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;
        Ok(Box::pin(create_stream(event_source)))
    }
}

fn completion_into_message(completion: Completion) -> Result<(Message, Usage)> {
    let usage = completion
        .usage
        .map(|u| Usage {
            input: u.prompt_tokens,
            output: u.completion_tokens,
        })
        .unwrap_or_default();

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| Error::UnexpectedResponse("completion carried no choices".into()))?;

    Ok((Message::assistant(content), usage))
}

fn create_stream(mut event_source: EventSource) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut accumulated = String::new();
        let mut usage = Usage::default();

        yield MessageEvent::Start;

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data == "[DONE]" {
                        break;
                    }

                    match serde_json::from_str::<StreamChunk>(&msg.data) {
                        Ok(chunk) => {
                            for choice in &chunk.choices {
                                if let Some(ref content) = choice.delta.content {
                                    accumulated.push_str(content);
                                    yield MessageEvent::TextDelta { delta: content.clone() };
                                }
                            }
                            if let Some(ref u) = chunk.usage {
                                usage.input = u.prompt_tokens;
                                usage.output = u.completion_tokens;
                            }
                        }
                        Err(e) => {
                            yield MessageEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(e) => {
                    event_source.close();
                    yield MessageEvent::Error {
                        message: format!("SSE error: {}", e),
                    };
                    return;
                }
            }
        }
        event_source.close();

        yield MessageEvent::Done {
            message: Message::assistant(accumulated),
            usage,
        };
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<OpenAIMessage>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
