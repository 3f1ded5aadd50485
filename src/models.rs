//! Data models shared by the analysis pipeline.
//!
//! This module defines the records that flow between the stages:
//! - [`SearchResult`]: one candidate article returned by the news search
//! - [`ExtractedDocument`]: the cleaned text and images of one article
//! - [`ConversationMessage`]: one role-tagged turn of the dialogue
//! - [`ReportRequest`]: everything the report renderer needs
//!
//! Messages serialize to the `{role, content}` shape the chat completion
//! endpoint expects; the visibility flag never leaves the process.

use serde::{Deserialize, Serialize};

/// A candidate article returned by the news search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// The article link.
    pub url: String,
}

/// An image found on an article page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Absolute image URL.
    pub url: String,
    /// The `alt` attribute, empty when missing.
    pub alt: String,
}

/// The cleaned content of one article page.
///
/// Created by the extractor and consumed once when the prompt is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// The page URL the content came from.
    pub source: String,
    /// Normalized prose followed by any rendered tables.
    pub text: String,
    /// Up to a fixed number of images, in document order.
    pub images: Vec<ImageRef>,
}

impl ExtractedDocument {
    /// An extraction that yielded no usable text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when printing the transcript.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "você",
            Role::Assistant => "assistente",
        }
    }
}

/// One turn of the dialogue.
///
/// `visible` controls display only; hidden messages are still replayed to
/// the model on every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip, default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ConversationMessage {
    /// A visible user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            visible: true,
        }
    }

    /// A user message sent to the model but never displayed.
    pub fn hidden_user(content: impl Into<String>) -> Self {
        Self {
            visible: false,
            ..Self::user(content)
        }
    }

    /// A visible assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            visible: true,
        }
    }
}

/// Input to the report renderer, built on demand and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    pub topic: String,
    pub directive: String,
    /// The latest assistant reply; never empty when a report is rendered.
    pub analysis: String,
    pub sources: Vec<String>,
    /// Model that produced the analysis, printed in the header.
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_without_visibility() {
        let msg = ConversationMessage::hidden_user("Texto: conteúdo");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Texto: conteúdo"}"#);
    }

    #[test]
    fn test_message_deserializes_as_visible() {
        let json = r#"{"role": "assistant", "content": "Resposta"}"#;
        let msg: ConversationMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.visible);
    }

    #[test]
    fn test_constructors_set_visibility() {
        assert!(ConversationMessage::user("a").visible);
        assert!(ConversationMessage::assistant("b").visible);
        assert!(!ConversationMessage::hidden_user("c").visible);
    }

    #[test]
    fn test_extracted_document_is_empty() {
        let doc = ExtractedDocument {
            source: "https://example.com".to_string(),
            text: "  \n ".to_string(),
            images: vec![],
        };
        assert!(doc.is_empty());
    }
}
