//! Ceremony types and their stage vocabularies

use serde::{Deserialize, Serialize};
use std::fmt;

/// The Scrum meeting a session facilitates. Fixed for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CeremonyType {
    Standup,
    Planning,
    Retrospective,
    Review,
    /// Free-form Scrum coaching chat, no stages
    General,
}

impl CeremonyType {
    pub const ALL: [CeremonyType; 5] = [
        CeremonyType::Standup,
        CeremonyType::Planning,
        CeremonyType::Retrospective,
        CeremonyType::Review,
        CeremonyType::General,
    ];

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            CeremonyType::Standup => "Daily Standup",
            CeremonyType::Planning => "Sprint Planning",
            CeremonyType::Retrospective => "Sprint Retrospective",
            CeremonyType::Review => "Sprint Review",
            CeremonyType::General => "Scrum Coaching",
        }
    }

    /// Short identifier used on the command line and in config
    pub fn id(&self) -> &'static str {
        match self {
            CeremonyType::Standup => "standup",
            CeremonyType::Planning => "planning",
            CeremonyType::Retrospective => "retrospective",
            CeremonyType::Review => "review",
            CeremonyType::General => "general",
        }
    }

    /// Parse a ceremony name, accepting common aliases
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "standup" | "daily" | "daily-scrum" | "daily-standup" => Some(CeremonyType::Standup),
            "planning" | "sprint-planning" => Some(CeremonyType::Planning),
            "retro" | "retrospective" => Some(CeremonyType::Retrospective),
            "review" | "sprint-review" => Some(CeremonyType::Review),
            "general" | "chat" | "coach" => Some(CeremonyType::General),
            _ => None,
        }
    }

    /// The stage a new session starts in
    pub fn initial_stage(&self) -> Stage {
        match self {
            CeremonyType::Standup => Stage::Standup(StandupStage::Greeting),
            CeremonyType::Planning => Stage::Planning(PlanningStage::GoalSetting),
            CeremonyType::Retrospective => Stage::Retrospective(RetroStage::WentWell),
            CeremonyType::Review => Stage::Review,
            CeremonyType::General => Stage::Open,
        }
    }
}

impl fmt::Display for CeremonyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Daily standup stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StandupStage {
    Greeting,
    Yesterday,
    Today,
    Blockers,
    NextPerson,
    Ending,
}

/// Sprint planning phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanningStage {
    GoalSetting,
    BacklogSelection,
    Planning,
}

/// Retrospective phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetroStage {
    WentWell,
    ToImprove,
    ActionItems,
}

/// The conversational stage of a session.
///
/// Each variant belongs to exactly one ceremony, so a stage can never drift
/// outside its ceremony's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ceremony", content = "stage", rename_all = "kebab-case")]
pub enum Stage {
    Standup(StandupStage),
    Planning(PlanningStage),
    Retrospective(RetroStage),
    /// Sprint review has a single open stage
    Review,
    /// General chat has no stage structure
    Open,
}

impl Stage {
    /// The ceremony this stage belongs to
    pub fn ceremony(&self) -> CeremonyType {
        match self {
            Stage::Standup(_) => CeremonyType::Standup,
            Stage::Planning(_) => CeremonyType::Planning,
            Stage::Retrospective(_) => CeremonyType::Retrospective,
            Stage::Review => CeremonyType::Review,
            Stage::Open => CeremonyType::General,
        }
    }

    pub fn is_valid_for(&self, ceremony: CeremonyType) -> bool {
        self.ceremony() == ceremony
    }

    /// Kebab-case label, e.g. `next-person`
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Standup(s) => match s {
                StandupStage::Greeting => "greeting",
                StandupStage::Yesterday => "yesterday",
                StandupStage::Today => "today",
                StandupStage::Blockers => "blockers",
                StandupStage::NextPerson => "next-person",
                StandupStage::Ending => "ending",
            },
            Stage::Planning(s) => match s {
                PlanningStage::GoalSetting => "goal-setting",
                PlanningStage::BacklogSelection => "backlog-selection",
                PlanningStage::Planning => "planning",
            },
            Stage::Retrospective(s) => match s {
                RetroStage::WentWell => "went-well",
                RetroStage::ToImprove => "to-improve",
                RetroStage::ActionItems => "action-items",
            },
            Stage::Review => "review",
            Stage::Open => "open",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the most recent backend reply was detected to be doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseCategory {
    AskedYesterday,
    AskedToday,
    AskedBlockers,
    NextPerson,
    Ending,
    /// Planning or retrospective moved to its next phase
    AdvancedPhase,
    /// Planning or retrospective is wrapping up
    WrapUp,
}

impl ResponseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::AskedYesterday => "asked-yesterday",
            ResponseCategory::AskedToday => "asked-today",
            ResponseCategory::AskedBlockers => "asked-blockers",
            ResponseCategory::NextPerson => "next-person",
            ResponseCategory::Ending => "ending",
            ResponseCategory::AdvancedPhase => "advanced-phase",
            ResponseCategory::WrapUp => "wrap-up",
        }
    }
}

impl fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
