//! Thread aggregator — merges dispatched and inbound messages into
//! per-contact ordered histories.

use std::sync::RwLock;

use crate::inbox::model::{ChatMessage, Conversation, Sender};

/// Identity seed for a thread, resolved by the caller against the contact
/// registry (or filled with placeholders for unknown senders). Only used
/// when the conversation does not exist yet.
#[derive(Debug, Clone)]
pub struct ThreadPeer {
    pub contact_id: String,
    pub name: String,
    pub phone: String,
}

impl ThreadPeer {
    /// Placeholder identity for a contact the registry does not know.
    pub fn unknown(contact_id: impl Into<String>) -> Self {
        Self {
            contact_id: contact_id.into(),
            name: "New contact".to_string(),
            phone: String::new(),
        }
    }
}

/// All conversation threads, one per contact, in creation order.
#[derive(Default)]
pub struct Inbox {
    inner: RwLock<Vec<Conversation>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the peer's thread, creating the thread lazily.
    ///
    /// Always appends: for outbound messages this runs after the dispatch
    /// attempt and does not care whether it succeeded — the thread records
    /// what we tried to say. Unread state is never touched here.
    pub fn record(&self, peer: &ThreadPeer, text: impl Into<String>, sender: Sender) -> ChatMessage {
        let message = ChatMessage::new(sender, text);
        let mut threads = self.write();
        match threads
            .iter_mut()
            .find(|c| c.contact_id == peer.contact_id)
        {
            Some(conversation) => conversation.push(message.clone()),
            None => threads.push(Conversation::started_with(
                peer.contact_id.clone(),
                peer.name.clone(),
                peer.phone.clone(),
                message.clone(),
            )),
        }
        tracing::debug!(contact = %peer.contact_id, sender = ?sender, "Message recorded");
        message
    }

    /// Flip the unread marker on a thread. Returns the new state, or `None`
    /// if there is no conversation for the contact.
    pub fn toggle_unread(&self, contact_id: &str) -> Option<bool> {
        let mut threads = self.write();
        let conversation = threads.iter_mut().find(|c| c.contact_id == contact_id)?;
        conversation.is_unread = !conversation.is_unread;
        conversation.unread_count = if conversation.is_unread { 1 } else { 0 };
        Some(conversation.is_unread)
    }

    pub fn conversation(&self, contact_id: &str) -> Option<Conversation> {
        self.read()
            .iter()
            .find(|c| c.contact_id == contact_id)
            .cloned()
    }

    /// All threads, creation order.
    pub fn list(&self) -> Vec<Conversation> {
        self.read().clone()
    }

    pub fn restore(&self, conversations: Vec<Conversation>) {
        *self.write() = conversations;
    }

    pub fn snapshot(&self) -> Vec<Conversation> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Conversation>> {
        self.inner.read().expect("Inbox lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Conversation>> {
        self.inner.write().expect("Inbox lock poisoned")
    }
}
