//! Chat backend implementations

pub mod ollama;
pub mod openai;

use crate::{Context, Error, Message, MessageEventStream, Model, Result, Usage};
use async_trait::async_trait;

/// Trait for chat backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request one complete assistant reply
    async fn complete(&self, model: &Model, context: &Context) -> Result<(Message, Usage)>;

    /// Stream an assistant reply as it is generated
    async fn stream(&self, model: &Model, context: &Context) -> Result<MessageEventStream>;
}

/// Get an API key from a provided value or the environment
pub fn get_api_key(provided: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(key) = provided {
        return Ok(key.to_string());
    }

    std::env::var(env_var).map_err(|_| Error::InvalidApiKey)
}

/// Build an HTTP client honoring the model's timeout
pub(crate) fn http_client(model: &Model) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(model.timeout_secs))
        .build()
        .map_err(Error::from)
}

/// Apply the model's extra headers to a request
pub(crate) fn with_model_headers(
    mut request: reqwest::RequestBuilder,
    model: &Model,
) -> reqwest::RequestBuilder {
    for (key, value) in &model.headers {
        if let (Ok(name), Ok(val)) = (
            key.parse::<reqwest::header::HeaderName>(),
            value.parse::<reqwest::header::HeaderValue>(),
        ) {
            request = request.header(name, val);
        }
    }
    request
}

/// Create the provider matching a model's API
pub fn provider_for(model: &Model, api_key: Option<&str>) -> Result<Box<dyn LlmProvider>> {
    match model.api {
        crate::Api::OllamaChat => Ok(Box::new(ollama::OllamaProvider::new())),
        crate::Api::OpenAICompletions => {
            let env_var = model.provider.api_key_env_var().unwrap_or("OPENAI_API_KEY");
            let key = get_api_key(api_key, env_var)?;
            Ok(Box::new(openai::OpenAIProvider::new(key)))
        }
    }
}
