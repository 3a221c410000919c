//! Per-session conversation log (`§6`: `conversations/<session>.json`).
//!
//! Append-only: a turn is written once, in full, after it completes (or is
//! cancelled). Resuming a session re-hydrates its message list from this
//! log rather than from any in-memory state (`§4.5` step 5).

use crate::error::Result;
use hg_llm::{Message, Role};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// One fragment of an assistant turn's response, in generation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePart {
    Text { text: String },
    ToolUse { name: String, args: serde_json::Value },
    ToolResult { name: String, ok: bool, summary: serde_json::Value },
}

/// One complete user-to-assistant exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub parts: Vec<ResponsePart>,
    pub ended_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub cancelled: bool,
}

/// Handle onto one session's append-only log file.
pub struct ConversationLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConversationLog {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_turns(&self) -> Result<Vec<ConversationTurn>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Append one completed (or cancelled) turn, atomically rewriting the
    /// whole-array file (write-then-rename, matching the Store's
    /// convention) so a crash mid-write never corrupts prior turns.
    pub async fn append(&self, turn: ConversationTurn) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut turns = self.read_turns()?;
        turns.push(turn);
        let bytes = serde_json::to_vec_pretty(&turns)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = tempfile::NamedTempFile::new_in(self.path.parent().unwrap_or_else(|| Path::new(".")))?;
        std::fs::write(tmp.path(), &bytes)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn load_turns(&self) -> Result<Vec<ConversationTurn>> {
        self.read_turns()
    }

    /// Flatten every logged turn back into a `Message` history, for
    /// resuming a session (`§4.5` step 5). Tool-use/tool-result parts
    /// collapse onto a single assistant/tool message pair per turn, mirroring
    /// how the chat loop appended them live.
    pub fn to_messages(&self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();
        for turn in self.read_turns()? {
            messages.push(Message::user(turn.user_text));
            let mut assistant_text = String::new();
            for part in &turn.parts {
                if let ResponsePart::Text { text } = part {
                    assistant_text.push_str(text);
                }
            }
            if !assistant_text.is_empty() {
                messages.push(Message::assistant(assistant_text));
            }
        }
        Ok(messages)
    }
}
