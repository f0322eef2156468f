//! Ollama `/api/chat` provider

use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::{LlmProvider, http_client, with_model_headers};
use crate::{
    error::{Error, Result},
    stream::{MessageEvent, MessageEventStream},
    types::{Context, Message, Model, Usage},
};

/// Ollama API client
pub struct OllamaProvider;

impl OllamaProvider {
    pub fn new() -> Self {
        Self
    }

    fn build_request(model: &Model, context: &Context, stream: bool) -> OllamaRequest {
        OllamaRequest {
            model: model.id.clone(),
            messages: context
                .wire_messages()
                .into_iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content,
                })
                .collect(),
            stream,
            options: model.max_tokens.map(|n| OllamaOptions { num_predict: n }),
        }
    }

    async fn post(&self, model: &Model, context: &Context, stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat", model.base_url.trim_end_matches('/'));
        let request = Self::build_request(model, context, stream);
        tracing::debug!(
            "POST {} ({} messages, stream={})",
            url,
            request.messages.len(),
            stream
        );

        let client = http_client(model)?;
        let response = with_model_headers(client.post(&url), model)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status, &body));
        }
        Ok(response)
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(&self, model: &Model, context: &Context) -> Result<(Message, Usage)> {
        let response = self.post(model, context, false).await?;
        let body = response.text().await?;
        let chunk = parse_chunk(&body)?;
        let usage = chunk.usage();
        let message = chunk
            .message
            .map(|m| Message::assistant(m.content))
            .ok_or_else(|| Error::UnexpectedResponse("reply carried no message".into()))?;
        Ok((message, usage))
    }

    async fn stream(&self, model: &Model, context: &Context) -> Result<MessageEventStream> {
        let response = self.post(model, context, true).await?;
        Ok(Box::pin(create_stream(response)))
    }
}

fn create_stream(response: reqwest::Response) -> impl futures::Stream<Item = MessageEvent> {
    stream! {
        let mut bytes = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut accumulated = String::new();

        yield MessageEvent::Start;

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield MessageEvent::Error { message: format!("HTTP error: {}", e) };
                    return;
                }
            };

            for line in lines.push(&chunk) {
                let parsed = match parse_chunk(&line) {
                    Ok(p) => p,
                    Err(e) => {
                        yield MessageEvent::Error { message: e.to_string() };
                        return;
                    }
                };

                if let Some(ref message) = parsed.message {
                    if !message.content.is_empty() {
                        accumulated.push_str(&message.content);
                        yield MessageEvent::TextDelta { delta: message.content.clone() };
                    }
                }

                if parsed.done {
                    yield MessageEvent::Done {
                        message: Message::assistant(std::mem::take(&mut accumulated)),
                        usage: parsed.usage(),
                    };
                    return;
                }
            }
        }

        yield MessageEvent::Error { message: "Ollama stream ended without a final chunk".to_string() };
    }
}

/// Splits a byte stream into newline-delimited JSON records
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    // Buffer raw bytes so multi-byte characters split across chunks survive.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();
            if !line.is_empty() {
                lines.push(line.to_string());
            }
        }
        lines
    }
}

/// Parse one Ollama response object, surfacing `{"error": ...}` bodies as errors
fn parse_chunk(line: &str) -> Result<OllamaChunk> {
    let chunk: OllamaChunk = serde_json::from_str(line)?;
    if let Some(ref error) = chunk.error {
        return Err(Error::api("ollama_error", error.clone()));
    }
    Ok(chunk)
}

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaChunk {
    fn usage(&self) -> Usage {
        Usage {
            input: self.prompt_eval_count.unwrap_or(0),
            output: self.eval_count.unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_includes_system_prompt_and_turns() {
        let model = Model::ollama("mistral", Model::OLLAMA_BASE_URL);
        let mut context = Context::with_system("You are a Scrum Master");
        context.push(Message::assistant("Who'd like to kick us off today?"));
        context.push(Message::user("Team member introducing themselves: I'm Sam"));

        let request = OllamaProvider::build_request(&model, &context, false);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "mistral");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["role"], "user");
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_request_caps_tokens_when_configured() {
        let mut model = Model::ollama("mistral", Model::OLLAMA_BASE_URL);
        model.max_tokens = Some(256);
        let request = OllamaProvider::build_request(&model, &Context::default(), true);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["num_predict"], 256);
    }

    #[test]
    fn test_parse_final_chunk() {
        let chunk = parse_chunk(
            r#"{"model":"mistral","message":{"role":"assistant","content":"Great!"},"done":true,"prompt_eval_count":42,"eval_count":7}"#,
        )
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.message.unwrap().content, "Great!");
    }

    #[test]
    fn test_parse_usage() {
        let chunk = parse_chunk(r#"{"done":true,"prompt_eval_count":42,"eval_count":7}"#).unwrap();
        assert_eq!(chunk.usage(), Usage { input: 42, output: 7 });
    }

    #[test]
    fn test_parse_error_body() {
        let err = parse_chunk(r#"{"error":"model \"llama9\" not found"}"#).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_line_buffer_handles_split_records() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(br#"{"message":{"role":"assistant","con"#).is_empty());
        let lines = buffer.push(b"tent\":\"Hi\"},\"done\":false}\n{\"done\":true}\n");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"Hi\""));
        assert_eq!(lines[1], r#"{"done":true}"#);
    }

    #[test]
    fn test_line_buffer_skips_blank_lines() {
        let mut buffer = LineBuffer::default();
        let lines = buffer.push(b"\n\n{\"done\":true}\n");
        assert_eq!(lines, vec![r#"{"done":true}"#.to_string()]);
    }
}
