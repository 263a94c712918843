//! Conversation state: the display transcript and the model transcript
//! derived from it.

use serde::{Deserialize, Serialize};

use crate::model::{Message, Role};

/// Progress of an annotated display entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Done,
}

/// UI annotations used to render tool progress as nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// An entry of the display transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl DisplayMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            metadata: None,
        }
    }

    /// Assistant entry carrying tool-progress annotations.
    pub fn annotated(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            metadata: Some(metadata),
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.metadata.as_ref().and_then(|m| m.status)
    }

    /// The model-transcript form of this entry, if it is replayed at all.
    ///
    /// Annotated entries and tool-role entries stay out of later turns.
    pub fn replay(&self) -> Option<Message> {
        if self.metadata.is_some() {
            return None;
        }
        match self.role {
            Role::System | Role::User | Role::Assistant => {
                Some(Message::new(self.role, self.content.clone()))
            }
            Role::Tool => None,
        }
    }
}

/// Append-only display transcript.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    entries: Vec<DisplayMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transcript(entries: Vec<DisplayMessage>) -> Self {
        Self { entries }
    }

    pub fn transcript(&self) -> &[DisplayMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: DisplayMessage) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Flip a pending entry to done. Returns `false` if the entry is missing
    /// or not pending, so the transition happens at most once.
    pub fn mark_done(&mut self, index: usize) -> bool {
        let Some(metadata) = self
            .entries
            .get_mut(index)
            .and_then(|entry| entry.metadata.as_mut())
        else {
            return false;
        };
        if metadata.status == Some(Status::Pending) {
            metadata.status = Some(Status::Done);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Model transcript for a new turn: one system message, the replayable
    /// history, then the new user message.
    pub fn model_transcript(&self, system_prompt: &str, input: &str) -> Vec<Message> {
        std::iter::once(Message::system(system_prompt))
            .chain(self.entries.iter().filter_map(DisplayMessage::replay))
            .chain(std::iter::once(Message::user(input)))
            .collect()
    }
}
