//! Per-ceremony configuration
//!
//! One engine serves every ceremony; what differs between them lives here.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::annotator::{AnnotationStyle, REVIEW_PREFIX, SIMPLE_PLANNING_PREFIX};
use crate::ceremony::{CeremonyType, Stage, StandupStage};
use crate::prompts;
use crate::session::SessionState;

/// What happens to the backend-bound history when a backend call fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Append the apology as an assistant turn, keeping turns alternating
    #[default]
    #[serde(rename = "record")]
    RecordApology,
    /// Show the apology only; the unanswered user turn stays in history
    TranscriptOnly,
}

/// Random pause before a request goes to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingDelay {
    pub min: Duration,
    pub max: Duration,
}

impl TypingDelay {
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Pick a delay uniformly in `[min, max]`
    pub fn sample(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        if max <= min {
            return self.min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

/// A facilitator turn produced locally after a fixed delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedTurn {
    /// Text of the turn; `{goal}` expands to the sprint goal
    pub template: String,
    pub delay: Duration,
    /// Stage to move to once the turn is appended
    pub resets_stage: Option<Stage>,
    pub clears_speaker: bool,
}

impl ScriptedTurn {
    pub fn new(template: impl Into<String>, delay: Duration) -> Self {
        Self {
            template: template.into(),
            delay,
            resets_stage: None,
            clears_speaker: false,
        }
    }

    pub fn resetting_to(mut self, stage: Stage) -> Self {
        self.resets_stage = Some(stage);
        self
    }

    pub fn clearing_speaker(mut self) -> Self {
        self.clears_speaker = true;
        self
    }

    pub fn render(&self, session: &SessionState) -> String {
        self.template
            .replace("{goal}", session.sprint_goal().unwrap_or_default())
    }
}

/// Everything the engine needs to know about one ceremony
#[derive(Debug, Clone)]
pub struct CeremonyDescriptor {
    pub ceremony: CeremonyType,
    pub opening_prompt: String,
    pub system_prompt: Option<String>,
    pub annotation: AnnotationStyle,
    /// Capture speaker names and prefix utterances with them
    pub tracks_speaker: bool,
    pub closing: Option<ScriptedTurn>,
    pub apology: String,
    pub failure_policy: FailurePolicy,
    pub typing_delay: Option<TypingDelay>,
}

impl CeremonyDescriptor {
    fn base(ceremony: CeremonyType, annotation: AnnotationStyle, apology: &str) -> Self {
        Self {
            ceremony,
            opening_prompt: prompts::opening_prompt(ceremony).to_string(),
            system_prompt: Some(prompts::SYSTEM_PROMPT.to_string()),
            annotation,
            tracks_speaker: false,
            closing: None,
            apology: apology.to_string(),
            failure_policy: FailurePolicy::default(),
            typing_delay: None,
        }
    }

    pub fn standup() -> Self {
        Self {
            tracks_speaker: true,
            closing: Some(
                ScriptedTurn::new(prompts::STANDUP_HANDOFF, Duration::from_millis(1000))
                    .resetting_to(Stage::Standup(StandupStage::Greeting))
                    .clearing_speaker(),
            ),
            typing_delay: Some(TypingDelay::new(Duration::from_secs(1), Duration::from_secs(3))),
            ..Self::base(
                CeremonyType::Standup,
                AnnotationStyle::PhaseAware,
                prompts::CONNECTION_APOLOGY,
            )
        }
    }

    /// Planning with a prefix per phase
    pub fn planning() -> Self {
        Self {
            closing: Some(ScriptedTurn::new(
                prompts::PLANNING_CLOSING,
                Duration::from_millis(3000),
            )),
            typing_delay: Some(TypingDelay::new(Duration::from_secs(1), Duration::from_secs(4))),
            ..Self::base(
                CeremonyType::Planning,
                AnnotationStyle::PhaseAware,
                prompts::CONNECTION_APOLOGY,
            )
        }
    }

    /// Planning with one fixed prefix; phases are still tracked
    pub fn planning_simple() -> Self {
        Self {
            annotation: AnnotationStyle::Fixed(SIMPLE_PLANNING_PREFIX.to_string()),
            ..Self::planning()
        }
    }

    pub fn retrospective() -> Self {
        Self {
            closing: Some(ScriptedTurn::new(
                prompts::RETRO_CLOSING,
                Duration::from_millis(1000),
            )),
            ..Self::base(
                CeremonyType::Retrospective,
                AnnotationStyle::PhaseAware,
                prompts::SERVICE_APOLOGY,
            )
        }
    }

    pub fn review() -> Self {
        Self::base(
            CeremonyType::Review,
            AnnotationStyle::Fixed(REVIEW_PREFIX.to_string()),
            prompts::SERVICE_APOLOGY,
        )
    }

    pub fn general() -> Self {
        Self::base(
            CeremonyType::General,
            AnnotationStyle::Passthrough,
            prompts::SERVICE_APOLOGY,
        )
    }

    /// Default descriptor for a ceremony
    pub fn for_ceremony(ceremony: CeremonyType) -> Self {
        match ceremony {
            CeremonyType::Standup => Self::standup(),
            CeremonyType::Planning => Self::planning(),
            CeremonyType::Retrospective => Self::retrospective(),
            CeremonyType::Review => Self::review(),
            CeremonyType::General => Self::general(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_typing_delay(mut self, delay: Option<TypingDelay>) -> Self {
        self.typing_delay = delay;
        self
    }
}
