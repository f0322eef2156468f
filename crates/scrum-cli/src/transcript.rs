//! JSONL transcript logging

use scrum_ai::Message;
use scrum_facilitator::{SessionState, TranscriptEntry};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Transcript line types for JSONL format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEntry {
    /// Session metadata
    Metadata {
        id: String,
        created_at: i64,
        ceremony: String,
        model: String,
    },
    /// A line of the human-visible transcript
    Visible { entry: TranscriptEntry },
    /// A turn sent to or received from the backend
    Turn { message: Message, timestamp: i64 },
}

/// Appends a session's transcript to a JSONL file
pub struct TranscriptLog {
    id: String,
    path: PathBuf,
    writer: BufWriter<File>,
    visible_written: usize,
    turns_written: usize,
}

impl TranscriptLog {
    /// Get the transcripts directory
    pub fn transcripts_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scrum")
            .join("transcripts")
    }

    /// Start a new transcript in the default directory
    pub fn create(ceremony: &str, model: &str) -> std::io::Result<Self> {
        Self::create_in(&Self::transcripts_dir(), ceremony, model)
    }

    pub fn create_in(dir: &Path, ceremony: &str, model: &str) -> std::io::Result<Self> {
        let id = uuid::Uuid::new_v4().to_string();
        fs::create_dir_all(dir)?;

        let path = dir.join(format!("{}.jsonl", id));
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);

        let metadata = LogEntry::Metadata {
            id: id.clone(),
            created_at: chrono::Utc::now().timestamp_millis(),
            ceremony: ceremony.to_string(),
            model: model.to_string(),
        };
        writeln!(writer, "{}", serde_json::to_string(&metadata)?)?;
        writer.flush()?;

        Ok(Self {
            id,
            path,
            writer,
            visible_written: 0,
            turns_written: 0,
        })
    }

    /// Get transcript ID
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append whatever the session gained since the last sync.
    ///
    /// Both the visible transcript and the turns are append-only, so the
    /// counts written so far mark where to resume.
    pub fn sync(
        &mut self,
        session: &SessionState,
        transcript: &[TranscriptEntry],
    ) -> std::io::Result<()> {
        for entry in transcript.iter().skip(self.visible_written) {
            let line = LogEntry::Visible {
                entry: entry.clone(),
            };
            writeln!(self.writer, "{}", serde_json::to_string(&line)?)?;
        }
        self.visible_written = self.visible_written.max(transcript.len());

        let now = chrono::Utc::now().timestamp_millis();
        for message in session.turns().iter().skip(self.turns_written) {
            let line = LogEntry::Turn {
                message: message.clone(),
                timestamp: now,
            };
            writeln!(self.writer, "{}", serde_json::to_string(&line)?)?;
        }
        self.turns_written = self.turns_written.max(session.turns().len());

        self.writer.flush()
    }

    /// List all transcripts, newest first
    pub fn list() -> std::io::Result<Vec<TranscriptInfo>> {
        Self::list_in(&Self::transcripts_dir())
    }

    pub fn list_in(dir: &Path) -> std::io::Result<Vec<TranscriptInfo>> {
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut transcripts = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                if let Some(info) = Self::read_info(&path) {
                    transcripts.push(info);
                }
            }
        }

        transcripts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(transcripts)
    }

    fn read_info(path: &Path) -> Option<TranscriptInfo> {
        let file = File::open(path).ok()?;
        let mut lines = BufReader::new(file).lines().map_while(Result::ok);
        let first_line = lines.next()?;

        let LogEntry::Metadata {
            id,
            created_at,
            ceremony,
            model,
        } = serde_json::from_str(&first_line).ok()?
        else {
            return None;
        };

        let visible_count = lines
            .filter(|l| l.contains("\"type\":\"visible\""))
            .count();

        Some(TranscriptInfo {
            id,
            created_at,
            ceremony,
            model,
            visible_count,
        })
    }
}

/// Information about a saved transcript
#[derive(Debug, Clone)]
pub struct TranscriptInfo {
    pub id: String,
    pub created_at: i64,
    pub ceremony: String,
    pub model: String,
    pub visible_count: usize,
}

impl TranscriptInfo {
    /// Format the created_at timestamp for display
    pub fn created_at_display(&self) -> String {
        use chrono::{TimeZone, Utc};
        Utc.timestamp_millis_opt(self.created_at)
            .single()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
