//! /history command - show the visible transcript

use super::CommandResult;
use crate::utils::truncate_chars;
use scrum_facilitator::{EntryKind, TranscriptEntry};

const DEFAULT_COUNT: usize = 10;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn execute(args: &str, transcript: &[TranscriptEntry]) -> CommandResult {
        let count = if args.is_empty() {
            DEFAULT_COUNT
        } else {
            match args.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return CommandResult::Message(format!(
                        "Invalid count: '{}'\nUsage: /history [n]",
                        args
                    ));
                }
            }
        };

        let start = transcript.len().saturating_sub(count);
        let mut output = String::new();
        for (i, entry) in transcript.iter().enumerate().skip(start) {
            let preview = truncate_chars(&entry.text, 80).replace('\n', " ");
            output.push_str(&format!(
                "  {:>3} {} [{}] {}\n",
                i,
                entry.timestamp.format("%H:%M:%S"),
                author(entry),
                preview
            ));
        }
        CommandResult::Message(output.trim_end().to_string())
    }
}

fn author(entry: &TranscriptEntry) -> &str {
    if entry.is_facilitator() {
        return "facilitator";
    }
    match entry.kind {
        EntryKind::Notice => "system",
        _ => entry.speaker.as_deref().unwrap_or("you"),
    }
}
