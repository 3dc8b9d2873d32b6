use serde::{Deserialize, Serialize};

use crate::models::message::Message;
use crate::models::role::Role;

/// The ordered messages of one run.
///
/// Append-only: a run owns its transcript exclusively and only ever pushes to
/// it, so there is no way to rewrite or drop earlier turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Check that the latest assistant message with tool calls is followed by
    /// exactly one tool message per call, carrying the same ids in the same
    /// order, and nothing else.
    pub fn verify_tool_pairing(&self) -> Result<(), String> {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::Assistant && m.has_tool_calls())
        else {
            return Ok(());
        };

        let requested: Vec<&str> = self.messages[position]
            .tool_calls
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        let answers = &self.messages[position + 1..];

        if answers.len() != requested.len() {
            return Err(format!(
                "assistant requested {} tool calls but {} responses follow",
                requested.len(),
                answers.len()
            ));
        }

        for (expected, answer) in requested.iter().zip(answers) {
            if answer.role != Role::Tool {
                return Err(format!(
                    "expected a tool message for call {} but found role {}",
                    expected, answer.role
                ));
            }
            if answer.tool_call_id.as_deref() != Some(*expected) {
                return Err(format!(
                    "tool message answers {:?} where call {} was expected",
                    answer.tool_call_id, expected
                ));
            }
        }

        Ok(())
    }
}
