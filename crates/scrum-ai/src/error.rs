//! Error types for scrum-ai

use thiserror::Error;

/// Result type alias using scrum-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to a chat backend or speech service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Request was aborted
    #[error("Request aborted")]
    Aborted,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Speech recognition failed
    #[error("Speech recognition failed: {0}")]
    Speech(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Build an API error from a non-success HTTP status and its body.
    ///
    /// Ollama and OpenAI-compatible servers both answer with `{"error": ...}`,
    /// where the value is either a string or an object carrying `message`/`type`.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));

        match error {
            Some(serde_json::Value::String(message)) => Self::api(status.as_str(), message.clone()),
            Some(obj @ serde_json::Value::Object(_)) => {
                let message = obj
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or(body)
                    .to_string();
                let error_type = obj
                    .get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or(status.as_str())
                    .to_string();
                Self::api(error_type, message)
            }
            _ => Self::api(status.as_str(), body.to_string()),
        }
    }

    /// Check if this error came from the transport rather than the backend's answer
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Http(e) => e.is_connect() || e.is_timeout(),
            Error::Sse(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_string_error() {
        let e = Error::from_status(StatusCode::NOT_FOUND, r#"{"error":"model 'mistral' not found"}"#);
        match e {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "404");
                assert_eq!(message, "model 'mistral' not found");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_object_error() {
        let e = Error::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#,
        );
        match e {
            Error::Api {
                error_type,
                message,
            } => {
                assert_eq!(error_type, "invalid_request_error");
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_plain_body() {
        let e = Error::from_status(StatusCode::BAD_GATEWAY, "upstream unavailable");
        assert_eq!(e.to_string(), "API error: upstream unavailable (type: 502)");
    }

    #[test]
    fn test_non_transport_errors_are_not_connection_errors() {
        assert!(!Error::InvalidApiKey.is_connection_error());
        assert!(!Error::api("500", "boom").is_connection_error());
        assert!(Error::Sse("stream reset".into()).is_connection_error());
    }
}
