//! The console service — owns the stores and the gateway, and funnels every
//! mutation through the operations below. No ambient globals: everything a
//! caller can do goes through a `Console` handle.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, NaiveDate, Utc};

use crate::broadcast::{BroadcastStatus, Broadcasts, ContactGroup, ScheduledMessage};
use crate::catalog::{Catalog, Material};
use crate::config::DispatchConfig;
use crate::contacts::{Contact, ContactRegistry};
use crate::dispatch::{MessageGateway, SendOutcome};
use crate::error::{DispatchError, OrderError};
use crate::inbox::{ChatMessage, Inbox, Sender, ThreadPeer};
use crate::orders::model::{Order, OrderItem, OrderStatus};
use crate::orders::receipt::{self, ReceiptForm};
use crate::orders::store::{OrderDraft, OrderStore};
use crate::persist::{self, Persistence};

const KEY_CONTACTS: &str = "contacts";
const KEY_ORDERS: &str = "orders";
const KEY_CONVERSATIONS: &str = "conversations";
const KEY_CATALOG: &str = "catalog";
const KEY_BROADCASTS: &str = "broadcasts";

/// Input for scheduling a new order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub contact_id: String,
    pub city: String,
    pub description: String,
    pub delivery_date: NaiveDate,
    pub issue_invoice: bool,
    pub items: Vec<OrderItem>,
}

/// Result of one outbound message: the recorded thread entry plus the
/// dispatch result. `dispatch` is `None` when no send was attempted (the
/// contact has no registry entry, so there is no phone to address).
#[derive(Debug)]
pub struct SendReport {
    pub message: ChatMessage,
    pub dispatch: Option<Result<SendOutcome, DispatchError>>,
}

impl SendReport {
    /// A human-readable warning when the dispatch did not go through.
    pub fn warning(&self) -> Option<String> {
        match &self.dispatch {
            Some(Err(e)) => Some(e.to_string()),
            None => Some("Contact has no registered phone; message not dispatched".to_string()),
            Some(Ok(_)) => None,
        }
    }
}

/// Result of a delivery confirmation: the committed order plus the outcome
/// of the customer notification.
#[derive(Debug)]
pub struct DeliveryConfirmation {
    pub order: Order,
    pub report: Option<SendReport>,
}

/// Tally of one due-broadcast dispatch run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastRun {
    pub sent: usize,
    pub failed: usize,
}

/// The operations console.
pub struct Console {
    contacts: ContactRegistry,
    catalog: Catalog,
    orders: OrderStore,
    inbox: Inbox,
    broadcasts: Broadcasts,
    gateway: MessageGateway,
    config: RwLock<Arc<DispatchConfig>>,
    persistence: Option<Arc<dyn Persistence>>,
}

impl Console {
    pub fn new(gateway: MessageGateway, config: DispatchConfig) -> Self {
        Self {
            contacts: ContactRegistry::new(),
            catalog: Catalog::new(),
            orders: OrderStore::new(),
            inbox: Inbox::new(),
            broadcasts: Broadcasts::new(),
            gateway,
            config: RwLock::new(Arc::new(config)),
            persistence: None,
        }
    }

    /// Attach a snapshot store; mutations are saved through it best-effort.
    pub fn with_persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Load all entity snapshots from the attached store, if any.
    pub fn restore_state(&self) -> crate::error::Result<()> {
        let Some(p) = &self.persistence else {
            return Ok(());
        };
        if let Some(contacts) = persist::load_entity(p.as_ref(), KEY_CONTACTS)? {
            self.contacts.restore(contacts);
        }
        if let Some(orders) = persist::load_entity(p.as_ref(), KEY_ORDERS)? {
            self.orders.restore(orders);
        }
        if let Some(conversations) = persist::load_entity(p.as_ref(), KEY_CONVERSATIONS)? {
            self.inbox.restore(conversations);
        }
        if let Some(catalog) = persist::load_entity(p.as_ref(), KEY_CATALOG)? {
            self.catalog.restore(catalog);
        }
        if let Some(broadcasts) = persist::load_entity(p.as_ref(), KEY_BROADCASTS)? {
            self.broadcasts.restore(broadcasts);
        }
        tracing::info!("Console state restored");
        Ok(())
    }

    // ── Configuration ───────────────────────────────────────────────

    pub fn dispatch_config(&self) -> Arc<DispatchConfig> {
        self.config
            .read()
            .expect("Config lock poisoned")
            .clone()
    }

    /// Swap in a new dispatch configuration from the settings collaborator.
    pub fn update_dispatch_config(&self, config: DispatchConfig) {
        *self.config.write().expect("Config lock poisoned") = Arc::new(config);
    }

    // ── Contacts & catalog ──────────────────────────────────────────

    pub fn contacts(&self) -> &ContactRegistry {
        &self.contacts
    }

    pub fn add_contact(
        &self,
        name: impl Into<String>,
        phone: impl Into<String>,
        group: impl Into<String>,
    ) -> Contact {
        let contact = self.contacts.add(name, phone, group);
        self.persist(KEY_CONTACTS, &self.contacts.snapshot());
        contact
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn add_material(&self, name: impl Into<String>, unit: impl Into<String>) -> Material {
        let material = self.catalog.add_material(name, unit);
        self.persist(KEY_CATALOG, &self.catalog.snapshot());
        material
    }

    pub fn add_city(&self, city: impl Into<String>) {
        self.catalog.add_city(city);
        self.persist(KEY_CATALOG, &self.catalog.snapshot());
    }

    /// Compose an order item from the catalog, copying the material's unit.
    pub fn compose_item(&self, material_name: &str, quantity: f64) -> Result<OrderItem, OrderError> {
        let unit = self
            .catalog
            .unit_for(material_name)
            .ok_or_else(|| OrderError::UnknownMaterial {
                name: material_name.to_string(),
            })?;
        Ok(OrderItem {
            material_name: material_name.to_string(),
            unit,
            quantity,
        })
    }

    // ── Orders ──────────────────────────────────────────────────────

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    /// Schedule a new order for a registered contact.
    pub fn create_order(&self, new_order: NewOrder) -> crate::error::Result<Order> {
        let contact = self
            .contacts
            .get(&new_order.contact_id)
            .ok_or(OrderError::UnknownContact {
                id: new_order.contact_id.clone(),
            })?;

        let order = self.orders.create(OrderDraft {
            contact_id: contact.id,
            contact_name: contact.name,
            city: new_order.city,
            description: new_order.description,
            delivery_date: new_order.delivery_date,
            issue_invoice: new_order.issue_invoice,
            items: new_order.items,
        })?;
        self.persist(KEY_ORDERS, &self.orders.snapshot());
        Ok(order)
    }

    /// Move an order along the lifecycle without delivery semantics
    /// (preparing, cancelled). Confirming a delivery goes through
    /// [`Console::confirm_delivery`] so the receipt gate applies.
    pub fn update_order_status(
        &self,
        id: uuid::Uuid,
        status: OrderStatus,
    ) -> crate::error::Result<Order> {
        let (order, _) = self.orders.transition(id, status, None)?;
        self.persist(KEY_ORDERS, &self.orders.snapshot());
        Ok(order)
    }

    /// Confirm a delivery: capture the receipt, commit the transition, then
    /// dispatch the customer notification and record it in the thread.
    ///
    /// The status change is committed before the dispatch and is never
    /// rolled back by a dispatch failure — the failure is surfaced in the
    /// returned report instead.
    pub async fn confirm_delivery(
        &self,
        id: uuid::Uuid,
        form: ReceiptForm,
    ) -> crate::error::Result<DeliveryConfirmation> {
        let receipt = receipt::capture(form)?;
        let (order, notice) = self
            .orders
            .transition(id, OrderStatus::Delivered, Some(receipt))?;
        self.persist(KEY_ORDERS, &self.orders.snapshot());

        let report = match notice {
            Some(notice) => Some(self.push_outbound(&notice.contact_id, &notice.text).await),
            None => None,
        };
        Ok(DeliveryConfirmation { order, report })
    }

    pub fn toggle_invoice_issued(&self, id: uuid::Uuid) -> crate::error::Result<Order> {
        let order = self.orders.toggle_nf_issued(id)?;
        self.persist(KEY_ORDERS, &self.orders.snapshot());
        Ok(order)
    }

    // ── Chat ────────────────────────────────────────────────────────

    pub fn inbox(&self) -> &Inbox {
        &self.inbox
    }

    /// Send a chat message to a contact: dispatch first, then record the
    /// message regardless of the outcome.
    pub async fn send_chat_message(&self, contact_id: &str, text: &str) -> SendReport {
        self.push_outbound(contact_id, text).await
    }

    /// Record an inbound customer message. No dispatch, no unread mutation.
    pub fn receive_chat_message(&self, contact_id: &str, text: &str) -> ChatMessage {
        let message = self.inbox.record(&self.peer_for(contact_id), text, Sender::Client);
        self.persist(KEY_CONVERSATIONS, &self.inbox.snapshot());
        message
    }

    pub fn toggle_unread(&self, contact_id: &str) -> Option<bool> {
        let state = self.inbox.toggle_unread(contact_id);
        if state.is_some() {
            self.persist(KEY_CONVERSATIONS, &self.inbox.snapshot());
        }
        state
    }

    // ── Broadcasts ──────────────────────────────────────────────────

    pub fn broadcasts(&self) -> &Broadcasts {
        &self.broadcasts
    }

    pub fn create_group(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        contact_ids: Vec<String>,
    ) -> ContactGroup {
        let group = self.broadcasts.create_group(name, description, contact_ids);
        self.persist(KEY_BROADCASTS, &self.broadcasts.snapshot());
        group
    }

    pub fn schedule_broadcast(
        &self,
        group_id: &str,
        content: &str,
        at: DateTime<Utc>,
    ) -> crate::error::Result<ScheduledMessage> {
        let message = self.broadcasts.schedule(group_id, content, at)?;
        self.persist(KEY_BROADCASTS, &self.broadcasts.snapshot());
        Ok(message)
    }

    /// Dispatch every due broadcast to its group members. A message counts
    /// as sent when at least one member dispatch succeeded.
    pub async fn dispatch_due_broadcasts(&self, now: DateTime<Utc>) -> BroadcastRun {
        let due = self.broadcasts.due(now);
        let mut run = BroadcastRun::default();

        for message in due {
            let members = match self.broadcasts.members(&message.group_id) {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!(message = %message.id, error = %e, "Broadcast group missing");
                    Vec::new()
                }
            };

            let mut reached = 0usize;
            for contact_id in &members {
                let report = self.push_outbound(contact_id, &message.content).await;
                if matches!(report.dispatch, Some(Ok(_))) {
                    reached += 1;
                }
            }

            let status = if reached > 0 {
                run.sent += 1;
                BroadcastStatus::Sent
            } else {
                run.failed += 1;
                BroadcastStatus::Failed
            };
            tracing::info!(
                message = %message.id,
                reached,
                members = members.len(),
                status = ?status,
                "Broadcast dispatched"
            );
            if let Err(e) = self.broadcasts.mark(&message.id, status) {
                tracing::warn!(message = %message.id, error = %e, "Broadcast status update failed");
            }
        }

        if run.sent + run.failed > 0 {
            self.persist(KEY_BROADCASTS, &self.broadcasts.snapshot());
        }
        run
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Dispatch to a contact and record the message in their thread.
    async fn push_outbound(&self, contact_id: &str, text: &str) -> SendReport {
        let contact = self.contacts.get(contact_id);

        let dispatch = match &contact {
            Some(c) => {
                let config = self.dispatch_config();
                let result = self.gateway.send(&c.phone, text, &config).await;
                if let Err(e) = &result {
                    tracing::warn!(contact = contact_id, error = %e, "Message dispatch failed");
                }
                Some(result)
            }
            None => {
                tracing::warn!(contact = contact_id, "Unknown contact, dispatch skipped");
                None
            }
        };

        let peer = match contact {
            Some(c) => ThreadPeer {
                contact_id: c.id,
                name: c.name,
                phone: c.phone,
            },
            None => ThreadPeer::unknown(contact_id),
        };
        let message = self.inbox.record(&peer, text, Sender::Me);
        self.persist(KEY_CONVERSATIONS, &self.inbox.snapshot());

        SendReport { message, dispatch }
    }

    fn peer_for(&self, contact_id: &str) -> ThreadPeer {
        match self.contacts.get(contact_id) {
            Some(c) => ThreadPeer {
                contact_id: c.id,
                name: c.name,
                phone: c.phone,
            },
            None => ThreadPeer::unknown(contact_id),
        }
    }

    /// Best-effort snapshot save; a failed save is logged, never fatal.
    fn persist<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Some(p) = &self.persistence
            && let Err(e) = persist::save_entity(p.as_ref(), key, value)
        {
            tracing::warn!(key, error = %e, "Snapshot save failed");
        }
    }
}
