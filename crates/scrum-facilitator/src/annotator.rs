//! Outbound turn annotation
//!
//! The backend sees a context-prefixed rewrite of each human utterance. The
//! visible transcript keeps the raw text.

use serde::{Deserialize, Serialize};

use crate::ceremony::{PlanningStage, RetroStage, Stage, StandupStage};
use crate::names;

pub const REVIEW_PREFIX: &str = "User is in Sprint Review and is saying: ";
pub const SIMPLE_PLANNING_PREFIX: &str = "Team member discussing sprint planning: ";

/// How a ceremony rewrites human utterances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnotationStyle {
    /// Prefix chosen from the current stage
    PhaseAware,
    /// One prefix regardless of stage
    Fixed(String),
    /// Send the utterance as typed
    Passthrough,
}

/// Stage prefix for the phase-aware style
fn stage_prefix(stage: Stage, utterance: &str) -> Option<&'static str> {
    let prefix = match stage {
        Stage::Standup(s) => match s {
            StandupStage::Greeting if names::is_introduction(utterance) => {
                "Team member introducing themselves: "
            }
            StandupStage::Greeting | StandupStage::Ending => return None,
            StandupStage::Yesterday => "Team member talking about yesterday's work: ",
            StandupStage::Today => "Team member talking about today's plans: ",
            StandupStage::Blockers => "Team member talking about blockers or impediments: ",
            StandupStage::NextPerson => "Team member finished their update: ",
        },
        Stage::Planning(s) => match s {
            PlanningStage::GoalSetting => "Team member discussing sprint goal ideas: ",
            PlanningStage::BacklogSelection => "Team member discussing backlog items to select: ",
            PlanningStage::Planning => "Team member discussing implementation plans: ",
        },
        Stage::Retrospective(s) => match s {
            RetroStage::WentWell => "User is in Retrospective discussing what went well: ",
            RetroStage::ToImprove => "User is in Retrospective discussing what could be improved: ",
            RetroStage::ActionItems => "User is in Retrospective discussing action items: ",
        },
        Stage::Review => REVIEW_PREFIX,
        Stage::Open => return None,
    };
    Some(prefix)
}

/// Build the content sent to the backend for one human utterance.
///
/// A known, non-empty `speaker` wraps the stage-prefixed text as
/// `"{speaker} says: ..."`. Callers pass `None` for ceremonies that do not
/// track speakers.
pub fn annotate(style: &AnnotationStyle, stage: Stage, speaker: Option<&str>, utterance: &str) -> String {
    let body = match style {
        AnnotationStyle::PhaseAware => match stage_prefix(stage, utterance) {
            Some(prefix) => format!("{}{}", prefix, utterance),
            None => utterance.to_string(),
        },
        AnnotationStyle::Fixed(prefix) => format!("{}{}", prefix, utterance),
        AnnotationStyle::Passthrough => utterance.to_string(),
    };

    match speaker.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => format!("{} says: {}", name, body),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockers_prefix_keeps_utterance() {
        let out = annotate(
            &AnnotationStyle::PhaseAware,
            Stage::Standup(StandupStage::Blockers),
            Some(""),
            "I'm stuck on deploys",
        );
        assert!(out.starts_with("Team member talking about blockers or impediments: "));
        assert!(out.contains("I'm stuck on deploys"));
    }

    #[test]
    fn test_greeting_only_prefixes_introductions() {
        let greeting = Stage::Standup(StandupStage::Greeting);
        assert_eq!(
            annotate(&AnnotationStyle::PhaseAware, greeting, None, "Hi, I'm Sam"),
            "Team member introducing themselves: Hi, I'm Sam"
        );
        assert_eq!(
            annotate(&AnnotationStyle::PhaseAware, greeting, None, "Sounds good"),
            "Sounds good"
        );
    }

    #[test]
    fn test_speaker_wraps_stage_prefix() {
        assert_eq!(
            annotate(
                &AnnotationStyle::PhaseAware,
                Stage::Standup(StandupStage::Yesterday),
                Some("Sam"),
                "Yesterday I shipped the login page",
            ),
            "Sam says: Team member talking about yesterday's work: Yesterday I shipped the login page"
        );
    }

    #[test]
    fn test_planning_phases() {
        let style = AnnotationStyle::PhaseAware;
        assert_eq!(
            annotate(&style, Stage::Planning(PlanningStage::BacklogSelection), None, "- Search filters"),
            "Team member discussing backlog items to select: - Search filters"
        );
        assert_eq!(
            annotate(&style, Stage::Planning(PlanningStage::Planning), None, "Pair on it"),
            "Team member discussing implementation plans: Pair on it"
        );
    }

    #[test]
    fn test_fixed_prefix_ignores_stage() {
        let style = AnnotationStyle::Fixed(SIMPLE_PLANNING_PREFIX.to_string());
        for stage in [
            Stage::Planning(PlanningStage::GoalSetting),
            Stage::Planning(PlanningStage::Planning),
        ] {
            assert_eq!(
                annotate(&style, stage, None, "Let's aim for checkout"),
                "Team member discussing sprint planning: Let's aim for checkout"
            );
        }
    }

    #[test]
    fn test_review_and_retro() {
        assert_eq!(
            annotate(&AnnotationStyle::PhaseAware, Stage::Review, None, "We shipped search"),
            "User is in Sprint Review and is saying: We shipped search"
        );
        assert_eq!(
            annotate(
                &AnnotationStyle::PhaseAware,
                Stage::Retrospective(RetroStage::ToImprove),
                None,
                "Too many meetings"
            ),
            "User is in Retrospective discussing what could be improved: Too many meetings"
        );
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(
            annotate(&AnnotationStyle::Passthrough, Stage::Open, None, "What is a sprint?"),
            "What is a sprint?"
        );
    }
}
