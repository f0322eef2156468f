//! Stage classification
//!
//! Two pure classifiers per ceremony: one reads the human utterance, the other
//! reads the backend's reply. Each is an ordered rule table and the first rule
//! that matches wins. Unmatched text leaves the stage unchanged.

use crate::ceremony::{CeremonyType, PlanningStage, ResponseCategory, RetroStage, Stage, StandupStage};
use crate::names;

const GREETING: Stage = Stage::Standup(StandupStage::Greeting);
const YESTERDAY: Stage = Stage::Standup(StandupStage::Yesterday);
const TODAY: Stage = Stage::Standup(StandupStage::Today);
const BLOCKERS: Stage = Stage::Standup(StandupStage::Blockers);
const NEXT_PERSON: Stage = Stage::Standup(StandupStage::NextPerson);
const ENDING: Stage = Stage::Standup(StandupStage::Ending);

const GOAL_SETTING: Stage = Stage::Planning(PlanningStage::GoalSetting);
const BACKLOG_SELECTION: Stage = Stage::Planning(PlanningStage::BacklogSelection);
const PLANNING: Stage = Stage::Planning(PlanningStage::Planning);

const WENT_WELL: Stage = Stage::Retrospective(RetroStage::WentWell);
const TO_IMPROVE: Stage = Stage::Retrospective(RetroStage::ToImprove);
const ACTION_ITEMS: Stage = Stage::Retrospective(RetroStage::ActionItems);

/// Utterances shorter than this count as "I'm finished"
const FINISHED_MAX_CHARS: usize = 10;

/// A goal candidate must be longer than this
const GOAL_MIN_CHARS: usize = 15;

/// Human-side transition rule.
///
/// Matches when `test` holds and the current stage is one of `from` (empty
/// means any stage) or is already `to`. The second clause keeps a stage put
/// when the same utterance is classified again, and it also holds the stage
/// against later rules: "That's all for today" said in `today` stays in
/// `today` rather than reaching `next-person`.
#[derive(Debug, Clone, Copy)]
pub struct HumanRule {
    pub name: &'static str,
    pub from: &'static [Stage],
    pub to: Stage,
    pub test: fn(&str) -> bool,
}

impl HumanRule {
    fn applies(&self, stage: Stage, lower: &str) -> bool {
        (self.from.is_empty() || self.from.contains(&stage) || stage == self.to) && (self.test)(lower)
    }
}

/// Reply-side transition rule
#[derive(Debug, Clone, Copy)]
pub struct ReplyRule {
    pub name: &'static str,
    /// Stages the rule is checked from; empty means any
    pub from: &'static [Stage],
    /// Target stage, `None` to stay put
    pub to: Option<Stage>,
    pub category: ResponseCategory,
    pub clears_speaker: bool,
    pub triggers_closing: bool,
    pub test: fn(&str) -> bool,
}

impl ReplyRule {
    fn applies(&self, stage: Stage, lower: &str) -> bool {
        (self.from.is_empty() || self.from.contains(&stage)) && (self.test)(lower)
    }
}

/// Result of classifying a backend reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyClassification {
    pub stage: Stage,
    pub category: Option<ResponseCategory>,
    pub clears_speaker: bool,
    /// The ceremony's scripted closing turn should be scheduled
    pub triggers_closing: bool,
}

impl ReplyClassification {
    fn unchanged(stage: Stage) -> Self {
        Self {
            stage,
            category: None,
            clears_speaker: false,
            triggers_closing: false,
        }
    }
}

fn normalize(text: &str) -> String {
    names::straighten_apostrophes(&text.to_lowercase())
}

fn any_of(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

// -- standup, human side --

fn introduces(text: &str) -> bool {
    names::is_introduction(text)
}

fn mentions_yesterday(text: &str) -> bool {
    any_of(text, &["yesterday", "completed", "worked on", "finished", "last day"])
}

fn mentions_today(text: &str) -> bool {
    any_of(text, &["today", "going to", "plan", "will be"])
}

fn mentions_blockers(text: &str) -> bool {
    any_of(
        text,
        &["blocker", "impediment", "issue", "problem", "stuck", "need help", "challenge"],
    )
}

fn signals_finished(text: &str) -> bool {
    any_of(text, &["that's all", "that is all", "that's it", "i'm done", "finished"])
        || text.trim().chars().count() < FINISHED_MAX_CHARS
}

pub const STANDUP_HUMAN_RULES: &[HumanRule] = &[
    HumanRule {
        name: "introduction",
        from: &[GREETING],
        to: GREETING,
        test: introduces,
    },
    HumanRule {
        name: "yesterday",
        from: &[],
        to: YESTERDAY,
        test: mentions_yesterday,
    },
    HumanRule {
        name: "today",
        from: &[YESTERDAY],
        to: TODAY,
        test: mentions_today,
    },
    HumanRule {
        name: "blockers",
        from: &[TODAY, YESTERDAY],
        to: BLOCKERS,
        test: mentions_blockers,
    },
    HumanRule {
        name: "finished",
        from: &[BLOCKERS, TODAY],
        to: NEXT_PERSON,
        test: signals_finished,
    },
];

// -- standup, reply side --

fn asks_yesterday(text: &str) -> bool {
    text.contains("yesterday") && any_of(text, &["what did you", "what have you"])
}

fn asks_today(text: &str) -> bool {
    text.contains("today") && any_of(text, &["what", "plan"])
}

fn asks_blockers(text: &str) -> bool {
    any_of(text, &["blocker", "impediment", "obstacle", "challenge"]) && text.contains('?')
}

fn hands_off(text: &str) -> bool {
    (text.contains("who") && text.contains("next"))
        || text.contains("would anyone else")
        || (text.contains("thanks") && text.contains("update"))
}

fn wraps_up_loosely(text: &str) -> bool {
    text.contains("wrap") && text.contains("up")
}

pub const STANDUP_REPLY_RULES: &[ReplyRule] = &[
    ReplyRule {
        name: "asked-yesterday",
        from: &[],
        to: Some(YESTERDAY),
        category: ResponseCategory::AskedYesterday,
        clears_speaker: false,
        triggers_closing: false,
        test: asks_yesterday,
    },
    ReplyRule {
        name: "asked-today",
        from: &[],
        to: Some(TODAY),
        category: ResponseCategory::AskedToday,
        clears_speaker: false,
        triggers_closing: false,
        test: asks_today,
    },
    ReplyRule {
        name: "asked-blockers",
        from: &[],
        to: Some(BLOCKERS),
        category: ResponseCategory::AskedBlockers,
        clears_speaker: false,
        triggers_closing: false,
        test: asks_blockers,
    },
    ReplyRule {
        name: "next-person",
        from: &[],
        to: Some(GREETING),
        category: ResponseCategory::NextPerson,
        clears_speaker: true,
        triggers_closing: false,
        test: hands_off,
    },
    ReplyRule {
        name: "ending",
        from: &[],
        to: Some(ENDING),
        category: ResponseCategory::Ending,
        clears_speaker: false,
        triggers_closing: false,
        test: wraps_up_loosely,
    },
];

// -- planning, reply side --

fn moves_to_backlog(text: &str) -> bool {
    any_of(text, &["backlog", "select", "stories", "items"])
}

fn moves_to_implementation(text: &str) -> bool {
    any_of(text, &["how will you", "implementation", "approach", "plan for"])
}

fn concludes_planning(text: &str) -> bool {
    any_of(text, &["wrap", "conclude", "finished", "great plan"])
}

pub const PLANNING_REPLY_RULES: &[ReplyRule] = &[
    ReplyRule {
        name: "backlog-selection",
        from: &[GOAL_SETTING],
        to: Some(BACKLOG_SELECTION),
        category: ResponseCategory::AdvancedPhase,
        clears_speaker: false,
        triggers_closing: false,
        test: moves_to_backlog,
    },
    ReplyRule {
        name: "planning",
        from: &[BACKLOG_SELECTION],
        to: Some(PLANNING),
        category: ResponseCategory::AdvancedPhase,
        clears_speaker: false,
        triggers_closing: false,
        test: moves_to_implementation,
    },
    ReplyRule {
        name: "wrap-up",
        from: &[PLANNING],
        to: None,
        category: ResponseCategory::WrapUp,
        clears_speaker: false,
        triggers_closing: true,
        test: concludes_planning,
    },
];

// -- retrospective, reply side --

fn asks_improvements(text: &str) -> bool {
    any_of(text, &["what could be improved", "what didn't go well"])
}

fn asks_actions(text: &str) -> bool {
    any_of(text, &["action", "specific steps"])
}

fn wraps_up(text: &str) -> bool {
    text.contains("wrap up")
}

pub const RETRO_REPLY_RULES: &[ReplyRule] = &[
    ReplyRule {
        name: "to-improve",
        from: &[WENT_WELL],
        to: Some(TO_IMPROVE),
        category: ResponseCategory::AdvancedPhase,
        clears_speaker: false,
        triggers_closing: false,
        test: asks_improvements,
    },
    ReplyRule {
        name: "action-items",
        from: &[TO_IMPROVE],
        to: Some(ACTION_ITEMS),
        category: ResponseCategory::AdvancedPhase,
        clears_speaker: false,
        triggers_closing: false,
        test: asks_actions,
    },
    ReplyRule {
        name: "wrap-up",
        from: &[ACTION_ITEMS],
        to: None,
        category: ResponseCategory::WrapUp,
        clears_speaker: false,
        triggers_closing: true,
        test: wraps_up,
    },
];

/// Human-side rule table for a ceremony
pub fn human_rules(ceremony: CeremonyType) -> &'static [HumanRule] {
    match ceremony {
        CeremonyType::Standup => STANDUP_HUMAN_RULES,
        _ => &[],
    }
}

/// Reply-side rule table for a ceremony
pub fn reply_rules(ceremony: CeremonyType) -> &'static [ReplyRule] {
    match ceremony {
        CeremonyType::Standup => STANDUP_REPLY_RULES,
        CeremonyType::Planning => PLANNING_REPLY_RULES,
        CeremonyType::Retrospective => RETRO_REPLY_RULES,
        CeremonyType::Review | CeremonyType::General => &[],
    }
}

/// Classify a human utterance into the next stage
pub fn next_stage(ceremony: CeremonyType, stage: Stage, utterance: &str) -> Stage {
    if !stage.is_valid_for(ceremony) {
        tracing::warn!("Stage {} does not belong to {}, resetting", stage, ceremony);
        return ceremony.initial_stage();
    }

    let lower = normalize(utterance);
    match human_rules(ceremony).iter().find(|r| r.applies(stage, &lower)) {
        Some(rule) => {
            tracing::debug!("Human rule '{}' matched: {} -> {}", rule.name, stage, rule.to);
            rule.to
        }
        None => stage,
    }
}

/// Classify a backend reply
pub fn next_stage_from_reply(ceremony: CeremonyType, stage: Stage, reply: &str) -> ReplyClassification {
    if !stage.is_valid_for(ceremony) {
        tracing::warn!("Stage {} does not belong to {}, resetting", stage, ceremony);
        return ReplyClassification::unchanged(ceremony.initial_stage());
    }

    let lower = normalize(reply);
    if let Some(rule) = reply_rules(ceremony).iter().find(|r| r.applies(stage, &lower)) {
        let next = rule.to.unwrap_or(stage);
        tracing::debug!("Reply rule '{}' matched: {} -> {}", rule.name, stage, next);
        return ReplyClassification {
            stage: next,
            category: Some(rule.category),
            clears_speaker: rule.clears_speaker,
            triggers_closing: rule.triggers_closing,
        };
    }

    // the speaker said they were done and the reply did not pick anyone up
    if stage == NEXT_PERSON {
        return ReplyClassification {
            triggers_closing: true,
            ..ReplyClassification::unchanged(stage)
        };
    }

    ReplyClassification::unchanged(stage)
}

/// Whether a planning utterance is a sprint goal candidate
pub fn is_goal_like(utterance: &str) -> bool {
    let text = utterance.trim();
    text.chars().count() > GOAL_MIN_CHARS && !text.ends_with('?')
}
