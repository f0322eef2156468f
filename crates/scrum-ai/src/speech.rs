//! Speech-to-text collaborator
//!
//! Recognition happens outside this process. The facilitator only sees the
//! `{success, text}` answer and feeds a recognized utterance through the same
//! path as typed input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Answer from a speech recognition attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcription {
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Transcription {
    /// A successful recognition
    pub fn recognized(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: Some(text.into()),
            error: None,
        }
    }

    /// A failed recognition
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            text: None,
            error: Some(error.into()),
        }
    }

    /// The utterance to submit, if recognition succeeded with non-empty text
    pub fn utterance(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Human-readable reason recognition produced nothing
    pub fn failure_reason(&self) -> String {
        match (&self.error, self.success) {
            (Some(e), _) => e.clone(),
            (None, true) => "No speech was recognized".to_string(),
            (None, false) => "Speech recognition failed".to_string(),
        }
    }
}

/// A source of spoken utterances
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Listen for one utterance
    async fn listen(&self) -> Result<Transcription>;
}

/// Speech recognizer backed by an HTTP endpoint returning a [`Transcription`]
pub struct HttpSpeechRecognizer {
    client: reqwest::Client,
    url: String,
    listen_timeout: Duration,
}

impl HttpSpeechRecognizer {
    /// Default time the service listens before giving up
    pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            listen_timeout: Self::DEFAULT_LISTEN_TIMEOUT,
        }
    }

    pub fn with_listen_timeout(mut self, timeout: Duration) -> Self {
        self.listen_timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct ListenRequest {
    timeout: u64,
}

#[async_trait]
impl SpeechRecognizer for HttpSpeechRecognizer {
    async fn listen(&self) -> Result<Transcription> {
        tracing::info!("Listening via {}", self.url);
        let response = self
            .client
            .post(&self.url)
            // leave headroom for the service to answer after its own timeout
            .timeout(self.listen_timeout + Duration::from_secs(10))
            .json(&ListenRequest {
                timeout: self.listen_timeout.as_secs(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Speech(format!("{}: {}", status, body)));
        }

        let transcription: Transcription = response.json().await?;
        tracing::debug!("Recognized: {:?}", transcription.text);
        Ok(transcription)
    }
}
