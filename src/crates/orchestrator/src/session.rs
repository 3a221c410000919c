//! Per-(approach, session) chat state (`§4.5`).

use crate::context::ContextManager;
use crate::conversation_log::ConversationLog;
use crate::error::{OrchestratorError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One chat session: its message history, its append-only log, and the
/// one-turn-at-a-time concurrency guard (`§4.5` concurrency contract).
pub struct Session {
    pub id: String,
    pub context: ContextManager,
    pub log: ConversationLog,
    turn_in_progress: AtomicBool,
    cancellation: std::sync::Mutex<Option<CancellationToken>>,
}

impl Session {
    pub fn new(id: impl Into<String>, chat_model_id: &str, log_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            id: id.into(),
            context: ContextManager::new(chat_model_id),
            log: ConversationLog::open(log_path),
            turn_in_progress: AtomicBool::new(false),
            cancellation: std::sync::Mutex::new(None),
        }
    }

    /// Re-hydrate message history from the conversation log (`§4.5` step 5).
    pub async fn resume(&self) -> Result<()> {
        let messages = self.log.to_messages()?;
        self.context.add_messages(messages).await;
        Ok(())
    }

    /// Claim the session for one turn. Returns a cancellation token the
    /// caller can trigger, and a guard that releases the session on drop.
    pub fn begin_turn(self: &Arc<Self>) -> Result<(CancellationToken, TurnGuard)> {
        if self.turn_in_progress.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::TurnInProgress(self.id.clone()));
        }
        let token = CancellationToken::new();
        *self.cancellation.lock().unwrap() = Some(token.clone());
        Ok((token, TurnGuard { session: self.clone() }))
    }

    /// Abort the in-progress turn, if any. A no-op if no turn is active.
    pub fn cancel(&self) {
        if let Some(token) = self.cancellation.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    pub fn is_turn_in_progress(&self) -> bool {
        self.turn_in_progress.load(Ordering::SeqCst)
    }
}

/// Releases a session's turn-in-progress flag when dropped, whether the
/// turn completed, errored, or was cancelled.
pub struct TurnGuard {
    session: Arc<Session>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.session.turn_in_progress.store(false, Ordering::SeqCst);
        *self.session.cancellation.lock().unwrap() = None;
    }
}
