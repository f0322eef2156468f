//! Per-session state and the visible transcript

use chrono::{DateTime, Utc};
use scrum_ai::Message;
use serde::{Deserialize, Serialize};

use crate::ceremony::{CeremonyType, ResponseCategory, Stage};

/// Mutable record owned by one facilitator.
///
/// Mutation goes through crate-private setters so the invariants hold: the
/// stage always belongs to the ceremony, participants never repeat, and turns
/// are only ever appended.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    ceremony: CeremonyType,
    stage: Stage,
    participants: Vec<String>,
    current_speaker: Option<String>,
    last_response_category: Option<ResponseCategory>,
    sprint_goal: Option<String>,
    selected_backlog_items: Vec<String>,
    turns: Vec<Message>,
}

impl SessionState {
    /// Start a session seeded with the ceremony's opening assistant turn
    pub fn new(ceremony: CeremonyType, opening_prompt: impl Into<String>) -> Self {
        Self {
            ceremony,
            stage: ceremony.initial_stage(),
            participants: Vec::new(),
            current_speaker: None,
            last_response_category: None,
            sprint_goal: None,
            selected_backlog_items: Vec::new(),
            turns: vec![Message::assistant(opening_prompt)],
        }
    }

    pub fn ceremony(&self) -> CeremonyType {
        self.ceremony
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Known participants in the order they were first seen
    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    pub fn current_speaker(&self) -> Option<&str> {
        self.current_speaker.as_deref()
    }

    pub fn last_response_category(&self) -> Option<ResponseCategory> {
        self.last_response_category
    }

    pub fn sprint_goal(&self) -> Option<&str> {
        self.sprint_goal.as_deref()
    }

    pub fn selected_backlog_items(&self) -> &[String] {
        &self.selected_backlog_items
    }

    /// Backend-bound history
    pub fn turns(&self) -> &[Message] {
        &self.turns
    }

    /// Set the stage. Returns the previous stage if it changed.
    ///
    /// A stage from another ceremony is rejected and leaves state untouched.
    pub(crate) fn set_stage(&mut self, stage: Stage) -> Option<Stage> {
        if !stage.is_valid_for(self.ceremony) {
            tracing::warn!("Rejected stage {} for {}", stage, self.ceremony);
            return None;
        }
        if stage == self.stage {
            return None;
        }
        Some(std::mem::replace(&mut self.stage, stage))
    }

    /// Add a participant unless already known. Returns whether it was added.
    pub(crate) fn add_participant(&mut self, name: &str) -> bool {
        if self.participants.iter().any(|p| p == name) {
            return false;
        }
        self.participants.push(name.to_string());
        true
    }

    /// Record `name` as the current speaker and a participant
    pub(crate) fn set_speaker(&mut self, name: &str) {
        self.add_participant(name);
        self.current_speaker = Some(name.to_string());
    }

    /// Returns whether a speaker was cleared
    pub(crate) fn clear_speaker(&mut self) -> bool {
        self.current_speaker.take().is_some()
    }

    pub(crate) fn set_last_response_category(&mut self, category: ResponseCategory) {
        self.last_response_category = Some(category);
    }

    pub(crate) fn set_sprint_goal(&mut self, goal: &str) {
        self.sprint_goal = Some(goal.to_string());
    }

    pub(crate) fn extend_backlog(&mut self, items: impl IntoIterator<Item = String>) {
        self.selected_backlog_items.extend(items);
    }

    pub(crate) fn push_turn(&mut self, message: Message) {
        self.turns.push(message);
    }
}

/// What produced a visible transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Canned opening turn
    Opening,
    /// Raw human utterance
    Utterance,
    /// Backend reply
    Reply,
    /// Locally scripted facilitator turn
    Scripted,
    /// Stand-in for a failed backend call
    Apology,
    /// System notice, e.g. a failed speech recognition
    Notice,
}

/// One line of the human-visible transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub kind: EntryKind,
    pub text: String,
    /// Known speaker for utterances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            speaker: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_speaker(mut self, speaker: Option<&str>) -> Self {
        self.speaker = speaker.map(str::to_string);
        self
    }

    /// Whether the facilitator side authored this entry
    pub fn is_facilitator(&self) -> bool {
        matches!(
            self.kind,
            EntryKind::Opening | EntryKind::Reply | EntryKind::Scripted | EntryKind::Apology
        )
    }
}
