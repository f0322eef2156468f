//! Facilitator event types

use serde::{Deserialize, Serialize};

use crate::ceremony::{ResponseCategory, Stage};

/// Events emitted while a session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacilitatorEvent {
    /// A human utterance was accepted
    UserTurn { text: String, outbound: String },

    /// The backend started answering
    ReplyStart,

    /// Partial reply text while streaming
    ReplyDelta { delta: String },

    /// A complete backend reply
    Reply {
        text: String,
        stage: Stage,
        category: Option<ResponseCategory>,
    },

    StageChanged { from: Stage, to: Stage },

    SpeakerChanged { speaker: Option<String> },

    /// A locally scripted facilitator turn
    ScriptedTurn { text: String },

    /// The backend call failed and the apology was shown instead
    BackendFailed { error: String, apology: String },

    /// Informational notice for the transcript
    System { message: String },

    /// The session was shut down
    Closed,
}

impl FacilitatorEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, FacilitatorEvent::Closed)
    }
}
