//! The append-only conversation buffer of one interactive session.
//!
//! Every model call replays [`ConversationState::messages`] in full and in
//! insertion order, hidden messages included. Nothing is ever removed,
//! edited or reordered.

use crate::models::ConversationMessage;

/// Ordered log of user and assistant messages.
///
/// # Examples
///
/// ```ignore
/// let mut conversation = ConversationState::new();
/// conversation.append(ConversationMessage::hidden_user("Texto das notícias: ..."));
/// conversation.append(ConversationMessage::user("Diretriz: resuma"));
/// assert_eq!(conversation.len(), 2);
/// assert_eq!(conversation.visible_messages().count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct ConversationState {
    messages: Vec<ConversationMessage>,
}

impl ConversationState {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message at the end of the log.
    ///
    /// # Arguments
    ///
    /// * `message` - Stored as-is; its visibility flag only affects
    ///   [`visible_messages`](Self::visible_messages)
    pub fn append(&mut self, message: ConversationMessage) {
        tracing::debug!(
            role = ?message.role,
            visible = message.visible,
            bytes = message.content.len(),
            position = self.messages.len(),
            "Appending conversation message"
        );
        self.messages.push(message);
    }

    /// The full history, as sent to the model.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Messages shown in the transcript, in order.
    pub fn visible_messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().filter(|m| m.visible)
    }

    /// Content of the most recent assistant reply, if any.
    pub fn last_assistant(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::models::Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Number of messages, hidden ones included.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` before the first message is appended.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
