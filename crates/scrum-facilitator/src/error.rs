//! Error types for scrum-facilitator

use thiserror::Error;

/// Result type alias using scrum-facilitator Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while facilitating a session
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the backend abstraction layer
    #[error(transparent)]
    Ai(#[from] scrum_ai::Error),

    /// The session was shut down
    #[error("Session closed")]
    SessionClosed,
}

impl Error {
    pub fn is_session_closed(&self) -> bool {
        matches!(self, Error::SessionClosed)
    }
}
