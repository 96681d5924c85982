//! Conversation history.
//!
//! History is an append-only sequence of entries alternating user and
//! assistant. It only grows by whole turns: [`ConversationHistory::append_turn`]
//! is the single mutation, so a half-finished turn can never show up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Role;

/// One side of a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered, append-only conversation history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed turn: the question, then its answer.
    pub fn append_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(HistoryEntry::now(Role::User, question));
        self.entries.push(HistoryEntry::now(Role::Assistant, answer));
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Owned copy for readers outside the owning controller.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed turns.
    pub fn turns(&self) -> usize {
        self.entries.len() / 2
    }
}

/// Renders history into a string suitable for prompt interpolation.
pub trait HistoryFormatter: Send + Sync {
    fn format(&self, history: &[HistoryEntry]) -> String;
}

/// Prefixes entries by position: even indices are `Human:`, odd are `AI:`.
/// Lines are joined with `\n`.
#[derive(Debug, Clone, Default)]
pub struct LabeledHistoryFormatter;

impl HistoryFormatter for LabeledHistoryFormatter {
    fn format(&self, history: &[HistoryEntry]) -> String {
        history
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                if i % 2 == 0 {
                    format!("Human: {}", entry.content)
                } else {
                    format!("AI: {}", entry.content)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_turn_alternates_roles() {
        let mut history = ConversationHistory::new();
        history.append_turn("q1", "a1");
        history.append_turn("q2", "a2");

        assert_eq!(history.len(), 4);
        assert_eq!(history.turns(), 2);
        let roles: Vec<Role> = history.entries().iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(history.entries()[2].content, "q2");
    }

    #[test]
    fn snapshot_is_detached() {
        let mut history = ConversationHistory::new();
        history.append_turn("q", "a");
        let snap = history.snapshot();
        history.append_turn("q2", "a2");
        assert_eq!(snap.len(), 2);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn labeled_formatter_output() {
        let mut history = ConversationHistory::new();
        history.append_turn("What is Scrimba?", "A coding platform.");
        history.append_turn("Is it free?", "Partly.");

        let text = LabeledHistoryFormatter.format(history.entries());
        assert_eq!(
            text,
            "Human: What is Scrimba?\nAI: A coding platform.\nHuman: Is it free?\nAI: Partly."
        );
    }

    #[test]
    fn formatter_on_empty_history() {
        assert_eq!(LabeledHistoryFormatter.format(&[]), "");
    }
}
