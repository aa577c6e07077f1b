//! Chat inbox — per-contact conversation threads.

pub mod model;
pub mod threads;

pub use model::{ChatMessage, Conversation, MessageStatus, Sender};
pub use threads::{Inbox, ThreadPeer};
