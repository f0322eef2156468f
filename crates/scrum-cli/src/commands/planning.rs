//! /goal and /backlog commands - show what planning has captured

use super::CommandResult;
use scrum_facilitator::{CeremonyType, SessionState};

pub struct PlanningCommand;

impl PlanningCommand {
    pub fn goal(session: &SessionState) -> CommandResult {
        if let Some(message) = not_planning(session) {
            return message;
        }
        CommandResult::Message(match session.sprint_goal() {
            Some(goal) => format!("Sprint goal: {}", goal),
            None => "No sprint goal captured yet.".to_string(),
        })
    }

    pub fn backlog(session: &SessionState) -> CommandResult {
        if let Some(message) = not_planning(session) {
            return message;
        }
        let items = session.selected_backlog_items();
        if items.is_empty() {
            return CommandResult::Message("No backlog items selected yet.".to_string());
        }

        let mut output = format!("Selected backlog items ({}):\n", items.len());
        for (i, item) in items.iter().enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, item));
        }
        CommandResult::Message(output.trim_end().to_string())
    }
}

fn not_planning(session: &SessionState) -> Option<CommandResult> {
    (session.ceremony() != CeremonyType::Planning).then(|| {
        CommandResult::Message(format!(
            "Only available in {}, this is {}.",
            CeremonyType::Planning,
            session.ceremony()
        ))
    })
}
