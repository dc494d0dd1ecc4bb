//! Chat persistence
//!
//! Directory structure:
//! ```text
//! <data_dir>/
//!   sessions/
//!     <session_id>/
//!       session.json    # Session document
//!       messages.jsonl  # Messages (newline-delimited JSON)
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::chat::model::{ChatMessage, ChatSession};
use crate::Result;

/// Store for persisting chat sessions and messages
#[derive(Debug, Clone)]
pub struct ChatStore {
    base_dir: PathBuf,
}

impl ChatStore {
    /// Create a new chat store rooted at a data directory
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: data_dir.as_ref().join("sessions"),
        }
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.base_dir.join(session_id.to_string())
    }

    fn session_path(&self, session_id: Uuid) -> PathBuf {
        self.session_dir(session_id).join("session.json")
    }

    fn messages_path(&self, session_id: Uuid) -> PathBuf {
        self.session_dir(session_id).join("messages.jsonl")
    }

    fn ensure_session_dir(&self, session_id: Uuid) -> Result<()> {
        let dir = self.session_dir(session_id);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Persist a session document
    pub fn save_session(&self, session: &ChatSession) -> Result<()> {
        self.ensure_session_dir(session.id)?;
        let path = self.session_path(session.id);
        let file = File::create(&path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, session)?;
        debug!("Saved session: {}", path.display());
        Ok(())
    }

    /// Load a session document
    pub fn load_session(&self, session_id: Uuid) -> Result<Option<ChatSession>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let session: ChatSession = serde_json::from_reader(reader)?;
        Ok(Some(session))
    }

    /// Record the resume token reported by the agent.
    ///
    /// Creates the session document if the submitting service has not written
    /// one yet.
    pub fn set_agent_session(
        &self,
        session_id: Uuid,
        project_id: Uuid,
        token: impl Into<String>,
    ) -> Result<()> {
        let mut session = self
            .load_session(session_id)?
            .unwrap_or_else(|| ChatSession::new(session_id, project_id));
        session.agent_session_id = Some(token.into());
        session.updated_at = Utc::now();
        self.save_session(&session)
    }

    /// Append a message to a session's log
    pub fn append_message(&self, message: &ChatMessage) -> Result<()> {
        self.ensure_session_dir(message.session_id)?;
        let path = self.messages_path(message.session_id);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(message)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended message {} to session {}", message.id, message.session_id);
        Ok(())
    }

    /// Load all messages for a session
    pub fn load_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        let path = self.messages_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let mut messages = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!("Failed to read line {} in messages file: {}", line_num, e);
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ChatMessage>(&line) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(
                        "Failed to parse message at line {} in {}: {}",
                        line_num,
                        path.display(),
                        e
                    );
                    continue;
                }
            }
        }

        Ok(messages)
    }
}
