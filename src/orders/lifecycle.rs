//! Order lifecycle — legal status transitions and the delivery notice.
//!
//! The transition function never performs I/O. Confirming a delivery returns
//! a [`DeliveryNotice`] describing the notification to send, and the
//! orchestration layer dispatches it independently — a failed send must never
//! roll back a committed status change.

use chrono::{Local, NaiveDate};

use crate::error::OrderError;
use crate::orders::model::{Order, OrderStatus, ReceiptData};

/// A customer notification produced by a successful delivery confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryNotice {
    pub contact_id: String,
    pub order_number: u64,
    pub text: String,
}

/// Apply a status transition to an order.
///
/// Rejected transitions leave the order untouched. Only the transition to
/// `Delivered` has extra requirements (receipt data with a receiver name) and
/// an output (the delivery notice); everything else is a pure status change.
pub fn apply(
    order: &mut Order,
    target: OrderStatus,
    receipt: Option<ReceiptData>,
) -> Result<Option<DeliveryNotice>, OrderError> {
    if !order.status.can_transition_to(target) {
        return Err(OrderError::InvalidTransition {
            id: order.id,
            from: order.status,
            to: target,
        });
    }

    if target == OrderStatus::Delivered {
        let receipt = receipt
            .filter(|r| !r.full_name.trim().is_empty())
            .ok_or(OrderError::ReceiptRequired { id: order.id })?;

        order.status = OrderStatus::Delivered;
        let notice = render_notice(order, &receipt, Local::now().date_naive());
        order.receipt = Some(receipt);
        tracing::info!(
            order = order.order_number,
            contact = %order.contact_name,
            "Order delivered"
        );
        return Ok(Some(notice));
    }

    tracing::debug!(
        order = order.order_number,
        from = %order.status,
        to = %target,
        "Order status changed"
    );
    order.status = target;
    Ok(None)
}

/// Render the delivered-order notification from the fixed template.
pub fn render_notice(order: &Order, receipt: &ReceiptData, on: NaiveDate) -> DeliveryNotice {
    let items = order
        .items
        .iter()
        .map(|i| format!("- {} {} {}", i.quantity, i.unit, i.material_name))
        .collect::<Vec<_>>()
        .join("\n");

    let text = format!(
        "✅ *ORDER DELIVERED (#{number})*\n\n\
         Hello *{contact}*, your delivery is complete!\n\n\
         📦 *Items:*\n{items}\n\n\
         👤 *Received by:* {receiver}\n\
         📅 *Date:* {date}\n\n\
         Thank you! 🚀",
        number = order.order_number,
        contact = order.contact_name,
        items = items,
        receiver = receipt.full_name,
        date = on.format("%d/%m/%Y"),
    );

    DeliveryNotice {
        contact_id: order.contact_id.clone(),
        order_number: order.order_number,
        text,
    }
}
