//! Contact registry — customer identities looked up by the core operations.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a contact is still actively messaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Active,
    Inactive,
}

/// A customer contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    /// Free-form grouping label (e.g. a sales region).
    #[serde(default)]
    pub group: String,
    pub status: ContactStatus,
}

/// In-memory contact registry.
///
/// The core treats this as a read-only lookup (`get`, `find_by_phone`); the
/// maintenance operations exist for the contact-manager collaborator.
#[derive(Default)]
pub struct ContactRegistry {
    inner: RwLock<Vec<Contact>>,
}

impl ContactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new contact and return it.
    pub fn add(
        &self,
        name: impl Into<String>,
        phone: impl Into<String>,
        group: impl Into<String>,
    ) -> Contact {
        let contact = Contact {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone: phone.into(),
            group: group.into(),
            status: ContactStatus::Active,
        };
        self.write().push(contact.clone());
        tracing::debug!(id = %contact.id, name = %contact.name, "Contact registered");
        contact
    }

    /// Look up a contact by id.
    pub fn get(&self, id: &str) -> Option<Contact> {
        self.read().iter().find(|c| c.id == id).cloned()
    }

    /// Look up a contact by phone, comparing digits only.
    ///
    /// Used to attribute inbound messages to a known contact regardless of
    /// how the number was formatted on either side.
    pub fn find_by_phone(&self, phone: &str) -> Option<Contact> {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        self.read()
            .iter()
            .find(|c| {
                c.phone
                    .chars()
                    .filter(|ch| ch.is_ascii_digit())
                    .collect::<String>()
                    == digits
            })
            .cloned()
    }

    /// All contacts, registration order.
    pub fn list(&self) -> Vec<Contact> {
        self.read().clone()
    }

    /// Mark a contact inactive. Returns false if the id is unknown.
    pub fn deactivate(&self, id: &str) -> bool {
        let mut contacts = self.write();
        match contacts.iter_mut().find(|c| c.id == id) {
            Some(contact) => {
                contact.status = ContactStatus::Inactive;
                true
            }
            None => false,
        }
    }

    /// Replace the full contact list (snapshot restore).
    pub fn restore(&self, contacts: Vec<Contact>) {
        *self.write() = contacts;
    }

    /// Clone the full contact list (snapshot save).
    pub fn snapshot(&self) -> Vec<Contact> {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Contact>> {
        self.inner.read().expect("Contact registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Contact>> {
        self.inner.write().expect("Contact registry lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let registry = ContactRegistry::new();
        let ana = registry.add("Ana Silva", "+55 (17) 99999-0001", "Retail");

        let loaded = registry.get(&ana.id).unwrap();
        assert_eq!(loaded.name, "Ana Silva");
        assert_eq!(loaded.status, ContactStatus::Active);
    }

    #[test]
    fn get_unknown_is_none() {
        let registry = ContactRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn find_by_phone_ignores_formatting() {
        let registry = ContactRegistry::new();
        let ana = registry.add("Ana", "+55 (17) 99999-0001", "");

        let found = registry.find_by_phone("5517999990001").unwrap();
        assert_eq!(found.id, ana.id);

        let found = registry.find_by_phone("55 17 99999 0001").unwrap();
        assert_eq!(found.id, ana.id);
    }

    #[test]
    fn find_by_phone_empty_never_matches() {
        let registry = ContactRegistry::new();
        registry.add("No phone", "", "");
        assert!(registry.find_by_phone("").is_none());
        assert!(registry.find_by_phone("---").is_none());
    }

    #[test]
    fn deactivate_flips_status() {
        let registry = ContactRegistry::new();
        let c = registry.add("Bob", "123", "");

        assert!(registry.deactivate(&c.id));
        assert_eq!(registry.get(&c.id).unwrap().status, ContactStatus::Inactive);
        assert!(!registry.deactivate("unknown"));
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let registry = ContactRegistry::new();
        registry.add("Ana", "1", "");
        registry.add("Bob", "2", "");

        let snapshot = registry.snapshot();
        let restored = ContactRegistry::new();
        restored.restore(snapshot);
        assert_eq!(restored.list().len(), 2);
        assert_eq!(restored.list()[1].name, "Bob");
    }
}
