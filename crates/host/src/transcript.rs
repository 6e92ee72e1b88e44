//! JSON export of finished (or running) episodes.

use crate::arena::EpisodeId;
use crate::error::ArenaError;
use arena_core::{Disposition, Message, Metrics, Turn};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Full record of an episode: every message with its visibility, plus the
/// hidden setup and the scoring snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub episode: EpisodeId,
    pub game: String,
    pub players: Vec<String>,
    pub disposition: Disposition,
    pub metrics: Metrics,
    pub messages: Vec<Message>,
    pub exported_at: DateTime<Utc>,
}

/// One line of a chat-only export.
#[derive(Debug, Clone, Serialize)]
pub struct ChatLine {
    pub turn: Turn,
    pub author: String,
    pub content: String,
}

impl Transcript {
    /// Messages in order, without visibility or bookkeeping.
    pub fn chat(&self) -> Vec<ChatLine> {
        self.messages
            .iter()
            .map(|m| ChatLine {
                turn: m.turn(),
                author: m.author().to_owned(),
                content: m.content().to_owned(),
            })
            .collect()
    }
}

/// Pretty-print `value` as JSON into `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArenaError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "wrote json");
    Ok(())
}
