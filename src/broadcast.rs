//! Broadcast scheduling — contact groups and bulk messages sent when due.
//!
//! This store only tracks what should go out and when; the console drains
//! due messages through the dispatch gateway and marks them sent or failed.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BroadcastError;

/// A named set of contacts used as a broadcast audience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub contact_ids: Vec<String>,
}

/// Status of a scheduled bulk message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Dispatched to at least one group member.
    Sent,
    /// Dispatch reached no member.
    Failed,
}

/// A message scheduled for delivery to every contact in a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledMessage {
    pub id: String,
    pub group_id: String,
    pub content: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: BroadcastStatus,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BroadcastSnapshot {
    pub groups: Vec<ContactGroup>,
    pub messages: Vec<ScheduledMessage>,
}

/// Store for groups and their scheduled messages.
#[derive(Default)]
pub struct Broadcasts {
    inner: RwLock<BroadcastSnapshot>,
}

impl Broadcasts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_group(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        contact_ids: Vec<String>,
    ) -> ContactGroup {
        let group = ContactGroup {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            contact_ids,
        };
        self.write().groups.push(group.clone());
        group
    }

    pub fn groups(&self) -> Vec<ContactGroup> {
        self.read().groups.clone()
    }

    /// Member contact ids of a group.
    pub fn members(&self, group_id: &str) -> Result<Vec<String>, BroadcastError> {
        self.read()
            .groups
            .iter()
            .find(|g| g.id == group_id)
            .map(|g| g.contact_ids.clone())
            .ok_or(BroadcastError::UnknownGroup {
                id: group_id.to_string(),
            })
    }

    /// Schedule a message for a group.
    pub fn schedule(
        &self,
        group_id: &str,
        content: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<ScheduledMessage, BroadcastError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(BroadcastError::EmptyContent);
        }

        let mut inner = self.write();
        if !inner.groups.iter().any(|g| g.id == group_id) {
            return Err(BroadcastError::UnknownGroup {
                id: group_id.to_string(),
            });
        }

        let message = ScheduledMessage {
            id: Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            content,
            scheduled_at: at,
            status: BroadcastStatus::Pending,
        };
        inner.messages.push(message.clone());
        tracing::info!(group = group_id, at = %message.scheduled_at, "Broadcast scheduled");
        Ok(message)
    }

    /// Pending messages whose scheduled time has passed, oldest first.
    pub fn due(&self, now: DateTime<Utc>) -> Vec<ScheduledMessage> {
        let mut due: Vec<ScheduledMessage> = self
            .read()
            .messages
            .iter()
            .filter(|m| m.status == BroadcastStatus::Pending && m.scheduled_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|m| m.scheduled_at);
        due
    }

    /// Record the outcome of a dispatch run for one message.
    pub fn mark(&self, id: &str, status: BroadcastStatus) -> Result<(), BroadcastError> {
        let mut inner = self.write();
        let message = inner
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(BroadcastError::MessageNotFound { id: id.to_string() })?;
        message.status = status;
        Ok(())
    }

    pub fn messages(&self) -> Vec<ScheduledMessage> {
        self.read().messages.clone()
    }

    pub fn restore(&self, snapshot: BroadcastSnapshot) {
        *self.write() = snapshot;
    }

    pub fn snapshot(&self) -> BroadcastSnapshot {
        let inner = self.read();
        BroadcastSnapshot {
            groups: inner.groups.clone(),
            messages: inner.messages.clone(),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BroadcastSnapshot> {
        self.inner.read().expect("Broadcast store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BroadcastSnapshot> {
        self.inner.write().expect("Broadcast store lock poisoned")
    }
}
