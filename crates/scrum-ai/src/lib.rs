//! scrum-ai: chat backend abstraction layer
//!
//! This crate provides the message types and providers used to talk to the
//! language-generation backend (Ollama or any OpenAI-compatible server), plus
//! the speech-to-text collaborator.

pub mod error;
pub mod providers;
pub mod speech;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use speech::{HttpSpeechRecognizer, SpeechRecognizer, Transcription};
pub use stream::MessageEventStream;
pub use types::*;
