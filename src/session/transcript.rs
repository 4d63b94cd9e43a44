//! Ordered conversation history owned by one session.
//!
//! The store holds exactly one `system` turn, always first, inserted at
//! creation. Caller utterances and completed agent replies are appended in
//! the order received; mutation only happens on the owning session's single
//! logical thread.

use crate::core::crm::TranscriptEntry;
use crate::core::llm::ChatMessage;

/// Speaker of one transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One exchange unit in the conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// Ordered sequence of turns, insertion order significant.
#[derive(Debug, Clone)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create a transcript seeded with its single system turn.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Turn {
                role: Role::System,
                content: system_prompt.into(),
            }],
        }
    }

    /// Append one caller utterance.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::User,
            content: content.into(),
        });
    }

    /// Append one completed agent reply.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn {
            role: Role::Assistant,
            content: content.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// View of the transcript as completion-API messages.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .map(|t| ChatMessage::new(t.role.as_str(), t.content.clone()))
            .collect()
    }

    /// View of the transcript as CRM payload entries.
    pub fn to_crm_entries(&self) -> Vec<TranscriptEntry> {
        self.turns
            .iter()
            .map(|t| TranscriptEntry {
                role: t.role.as_str().to_string(),
                content: t.content.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_turn_is_system_exactly_once() {
        let mut transcript = Transcript::new("You are an SDR.");
        transcript.push_user("hi");
        transcript.push_assistant("hello");
        transcript.push_user("bye");

        assert_eq!(transcript.turns()[0].role, Role::System);
        let system_count = transcript
            .turns()
            .iter()
            .filter(|t| t.role == Role::System)
            .count();
        assert_eq!(system_count, 1);
    }

    #[test]
    fn test_turns_keep_insertion_order() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("one");
        transcript.push_assistant("two");
        transcript.push_user("three");

        let contents: Vec<&str> = transcript
            .turns()
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(contents, vec!["sys", "one", "two", "three"]);
    }

    #[test]
    fn test_chat_message_view_preserves_roles() {
        let mut transcript = Transcript::new("sys");
        transcript.push_user("question");

        let messages = transcript.to_chat_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "question");
    }
}
