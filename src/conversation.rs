//! Transcript data model: messages, the append-only conversation, and the
//! two-valued interaction state.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

/// Whether new input may be submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionState {
    #[default]
    Idle,
    Sending,
}

/// Position of a message in its conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Ordered, append-only list of messages.
///
/// At most one message is open at a time: the last bot message of an active
/// response. Only the open message can grow, and sealing it is permanent.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    open: Option<MessageHandle>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, handle: MessageHandle) -> Option<&Message> {
        self.messages.get(handle.0)
    }

    pub fn open_message(&self) -> Option<MessageHandle> {
        self.open
    }

    /// Append a finished message. Seals any open message first.
    pub(crate) fn push(&mut self, role: Role, text: impl Into<String>) -> MessageHandle {
        self.seal();
        self.messages.push(Message {
            role,
            text: text.into(),
        });
        MessageHandle(self.messages.len() - 1)
    }

    /// Append an empty bot message that keeps receiving content until sealed.
    pub(crate) fn open_bot(&mut self) -> MessageHandle {
        let handle = self.push(Role::Bot, String::new());
        self.open = Some(handle);
        handle
    }

    /// Append to the open message, returning its full text.
    ///
    /// Returns `None` when no message is open.
    pub(crate) fn append_to_open(&mut self, content: &str) -> Option<&str> {
        let handle = self.open?;
        let msg = self.messages.get_mut(handle.0)?;
        msg.text.push_str(content);
        Some(msg.text.as_str())
    }

    pub(crate) fn seal(&mut self) -> Option<MessageHandle> {
        self.open.take()
    }
}
