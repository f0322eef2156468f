//! /stage and /participants commands - show where the session stands

use super::CommandResult;
use scrum_facilitator::SessionState;

pub struct StatusCommand;

impl StatusCommand {
    pub fn stage(session: &SessionState) -> CommandResult {
        let mut output = String::from("Session Status\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        output.push_str(&format!("Ceremony:   {}\n", session.ceremony()));
        output.push_str(&format!("Stage:      {}\n", session.stage()));
        output.push_str(&format!(
            "Speaker:    {}\n",
            session.current_speaker().unwrap_or("-")
        ));
        output.push_str(&format!(
            "Last reply: {}\n",
            session
                .last_response_category()
                .map(|c| c.as_str())
                .unwrap_or("-")
        ));
        output.push_str(&format!("Turns:      {}", session.turns().len()));

        CommandResult::Message(output)
    }

    pub fn participants(session: &SessionState) -> CommandResult {
        let participants = session.participants();
        if participants.is_empty() {
            return CommandResult::Message("No participants yet.".to_string());
        }

        let mut output = String::from("Participants:\n");
        for name in participants {
            let marker = if session.current_speaker() == Some(name.as_str()) {
                " *"
            } else {
                ""
            };
            output.push_str(&format!("  {}{}\n", name, marker));
        }
        CommandResult::Message(output.trim_end().to_string())
    }
}
