//! Conversation data model.

use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The console operator.
    Me,
    /// The customer.
    Client,
}

/// Delivery status of a chat message. Only `Sent` is produced here; richer
/// tracking would need the provider's status webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

/// One message in a conversation thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Display timestamp, formatted once at creation and stored verbatim so
    /// the rendered history never shifts.
    pub timestamp: String,
    pub status: MessageStatus,
}

impl ChatMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            timestamp: Local::now().format("%H:%M").to_string(),
            status: MessageStatus::Sent,
        }
    }
}

/// The message history associated with one contact.
///
/// Contact name/phone are snapshots taken when the thread was created; they
/// do not follow later edits to the contact record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub contact_id: String,
    pub contact_name: String,
    pub contact_phone: String,
    pub last_message: String,
    pub last_timestamp: String,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub is_unread: bool,
    /// Append-only; position is the happens-before order.
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a thread with its first message.
    pub fn started_with(
        contact_id: impl Into<String>,
        contact_name: impl Into<String>,
        contact_phone: impl Into<String>,
        first: ChatMessage,
    ) -> Self {
        Self {
            contact_id: contact_id.into(),
            contact_name: contact_name.into(),
            contact_phone: contact_phone.into(),
            last_message: first.text.clone(),
            last_timestamp: first.timestamp.clone(),
            unread_count: 0,
            is_unread: false,
            messages: vec![first],
        }
    }

    /// Append a message and refresh the thread summary.
    pub fn push(&mut self, message: ChatMessage) {
        self.last_message = message.text.clone();
        self.last_timestamp = message.timestamp.clone();
        self.messages.push(message);
    }
}
