//! Chat controller: owns the conversation history and the turn state.
//!
//! ```text
//!   Idle ──submit──▶ AwaitingResponse ──ok──▶ Idle
//!    ▲                      │
//!    │                      └──err──▶ Error(msg)
//!    └──acknowledge_error / next submit───┘
//! ```
//!
//! A submission while a response is pending is rejected with
//! [`ControllerError::Busy`]. History only grows by whole turns, and only
//! after the chain succeeds.

use std::sync::{Arc, Mutex, MutexGuard};

use ragchat_core::history::{ConversationHistory, HistoryEntry};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ChainError, ControllerError};
use crate::orchestrator::ConversationOrchestrator;

/// Where the conversation is between turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ChatState {
    Idle,
    AwaitingResponse,
    /// The last turn failed; the message is shown to the user.
    Error(String),
}

impl ChatState {
    pub fn label(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AwaitingResponse => "awaiting_response",
            ChatState::Error(_) => "error",
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ChatState::Error(message) => Some(message),
            _ => None,
        }
    }
}

/// A settled turn: the answer and the history length right after it landed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub answer: String,
    pub history_len: usize,
}

struct Inner {
    state: ChatState,
    history: ConversationHistory,
}

/// Serializes chat turns over one orchestrator.
pub struct ChatController {
    orchestrator: Arc<ConversationOrchestrator>,
    inner: Mutex<Inner>,
}

impl ChatController {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self {
            orchestrator,
            inner: Mutex::new(Inner {
                state: ChatState::Idle,
                history: ConversationHistory::new(),
            }),
        }
    }

    /// Submit a question and wait for the answer.
    ///
    /// On success the question and answer are appended to history together.
    /// On failure history is untouched and the state moves to
    /// [`ChatState::Error`].
    pub async fn submit(&self, question: &str) -> Result<String, ControllerError> {
        self.submit_turn(question).await.map(|reply| reply.answer)
    }

    /// Like [`submit`](Self::submit), also reporting the history length
    /// observed under the same lock that appended the turn.
    pub async fn submit_turn(&self, question: &str) -> Result<Reply, ControllerError> {
        if question.trim().is_empty() {
            return Err(ControllerError::EmptyQuestion);
        }

        let history = {
            let mut inner = self.lock();
            if inner.state == ChatState::AwaitingResponse {
                return Err(ControllerError::Busy);
            }
            inner.state = ChatState::AwaitingResponse;
            inner.history.snapshot()
        };

        let in_flight = InFlight { controller: self, settled: false };
        let result = self.orchestrator.invoke(question, &history).await;
        in_flight.settle(question, result)
    }

    pub fn state(&self) -> ChatState {
        self.lock().state.clone()
    }

    /// Read-only copy of the history.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.lock().history.snapshot()
    }

    pub fn turns(&self) -> usize {
        self.lock().history.turns()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// Clear an error and return to idle. No-op in any other state.
    pub fn acknowledge_error(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, ChatState::Error(_)) {
            inner.state = ChatState::Idle;
        }
    }

    pub fn orchestrator(&self) -> &ConversationOrchestrator {
        &self.orchestrator
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Resets the state if a submission is dropped before it settles.
struct InFlight<'a> {
    controller: &'a ChatController,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, question: &str, result: Result<String, ChainError>) -> Result<Reply, ControllerError> {
        self.settled = true;
        let controller = self.controller;
        let mut inner = controller.lock();
        match result {
            Ok(answer) => {
                inner.history.append_turn(question, answer.clone());
                inner.state = ChatState::Idle;
                info!(turns = inner.history.turns(), "Turn completed");
                Ok(Reply {
                    answer,
                    history_len: inner.history.len(),
                })
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                inner.state = ChatState::Error(e.to_string());
                Err(ControllerError::Upstream(e))
            }
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Turn abandoned before completion");
            self.controller.lock().state = ChatState::Idle;
        }
    }
}
