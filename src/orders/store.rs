//! Order store — creation with sequential numbering, lookup, and the
//! transition funnel. All mutation goes through here.

use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;
use crate::orders::lifecycle::{self, DeliveryNotice};
use crate::orders::model::{Order, OrderItem, OrderStatus, ReceiptData};

/// Input for creating an order. The contact name is snapshotted by the
/// caller after resolving the contact id against the registry.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub contact_id: String,
    pub contact_name: String,
    pub city: String,
    pub description: String,
    pub delivery_date: NaiveDate,
    pub issue_invoice: bool,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub orders: Vec<Order>,
    pub next_number: u64,
}

struct Inner {
    orders: Vec<Order>,
    next_number: u64,
}

/// Process-local order store.
pub struct OrderStore {
    inner: RwLock<Inner>,
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                orders: Vec::new(),
                next_number: 1,
            }),
        }
    }

    /// Create an order with status `Pending` and the next sequential number.
    pub fn create(&self, draft: OrderDraft) -> Result<Order, OrderError> {
        if draft.items.is_empty() {
            return Err(OrderError::NoItems);
        }
        for item in &draft.items {
            if !(item.quantity > 0.0) {
                return Err(OrderError::InvalidQuantity {
                    material: item.material_name.clone(),
                });
            }
        }

        let mut inner = self.write();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: inner.next_number,
            contact_id: draft.contact_id,
            contact_name: draft.contact_name,
            city: draft.city,
            description: draft.description,
            items: draft.items,
            delivery_date: draft.delivery_date,
            status: OrderStatus::Pending,
            issue_invoice: draft.issue_invoice,
            nf_issued: false,
            receipt: None,
        };
        inner.next_number += 1;
        inner.orders.push(order.clone());
        tracing::info!(
            order = order.order_number,
            contact = %order.contact_name,
            items = order.items.len(),
            "Order created"
        );
        Ok(order)
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.read().orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn find_by_number(&self, number: u64) -> Option<Order> {
        self.read()
            .orders
            .iter()
            .find(|o| o.order_number == number)
            .cloned()
    }

    /// All orders, newest first.
    pub fn list(&self) -> Vec<Order> {
        let mut orders = self.read().orders.clone();
        orders.sort_by(|a, b| b.order_number.cmp(&a.order_number));
        orders
    }

    /// Orders still in flight (pending or preparing), newest first.
    pub fn queue(&self) -> Vec<Order> {
        self.list()
            .into_iter()
            .filter(|o| !o.status.is_terminal())
            .collect()
    }

    /// Delivered orders, newest first.
    pub fn delivered(&self) -> Vec<Order> {
        self.list()
            .into_iter()
            .filter(|o| o.status == OrderStatus::Delivered)
            .collect()
    }

    /// Delivered orders that requested an invoice which was not issued yet.
    pub fn invoice_backlog(&self) -> Vec<Order> {
        self.delivered()
            .into_iter()
            .filter(|o| o.issue_invoice && !o.nf_issued)
            .collect()
    }

    /// Apply a lifecycle transition, returning the updated order and — when
    /// a delivery was confirmed — the notification to dispatch.
    pub fn transition(
        &self,
        id: Uuid,
        target: OrderStatus,
        receipt: Option<ReceiptData>,
    ) -> Result<(Order, Option<DeliveryNotice>), OrderError> {
        let mut inner = self.write();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(OrderError::NotFound { id })?;
        let notice = lifecycle::apply(order, target, receipt)?;
        Ok((order.clone(), notice))
    }

    /// Flip the invoice-issued flag. Independent of status.
    pub fn toggle_nf_issued(&self, id: Uuid) -> Result<Order, OrderError> {
        let mut inner = self.write();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(OrderError::NotFound { id })?;
        order.nf_issued = !order.nf_issued;
        Ok(order.clone())
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        let inner = self.read();
        OrderSnapshot {
            orders: inner.orders.clone(),
            next_number: inner.next_number,
        }
    }

    /// Restore from a snapshot. The number counter never moves backwards,
    /// even if the snapshot's counter disagrees with its orders.
    pub fn restore(&self, snapshot: OrderSnapshot) {
        let highest = snapshot
            .orders
            .iter()
            .map(|o| o.order_number)
            .max()
            .unwrap_or(0);
        let mut inner = self.write();
        inner.next_number = snapshot.next_number.max(highest + 1);
        inner.orders = snapshot.orders;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("Order store lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("Order store lock poisoned")
    }
}
