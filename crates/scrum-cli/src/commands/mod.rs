//! Slash commands for interactive mode

mod history;
mod planning;
mod status;

pub use history::HistoryCommand;
pub use planning::PlanningCommand;
pub use status::StatusCommand;

use scrum_facilitator::{SessionState, TranscriptEntry};

/// Result of executing a slash command
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Show a message to the user (not sent to the facilitator)
    Message(String),
    /// Capture one utterance through speech recognition
    Listen,
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse and execute a slash command
pub fn execute_command(
    input: &str,
    session: &SessionState,
    transcript: &[TranscriptEntry],
) -> Option<CommandResult> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "quit" | "exit" | "q" => CommandResult::Exit,

        "stage" | "status" | "s" => StatusCommand::stage(session),

        "participants" | "p" => StatusCommand::participants(session),

        "goal" | "g" => PlanningCommand::goal(session),

        "backlog" | "b" => PlanningCommand::backlog(session),

        "history" | "hist" => HistoryCommand::execute(args, transcript),

        "voice" | "v" => CommandResult::Listen,

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?          Show this help message
  /stage, /s             Show ceremony, stage and current speaker
  /participants, /p      List participants (* marks the current speaker)
  /goal, /g              Show the captured sprint goal (planning)
  /backlog, /b           Show selected backlog items (planning)
  /history [n]           Show the last n transcript entries (default 10)
  /voice, /v             Speak one utterance instead of typing it
  /quit, /exit, /q       End the session

Anything else you type is said to the facilitator."#
        .to_string()
}
