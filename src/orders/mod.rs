//! Delivery orders — data model, receipt capture, lifecycle, and store.

pub mod lifecycle;
pub mod model;
pub mod receipt;
pub mod store;

pub use lifecycle::DeliveryNotice;
pub use model::{Order, OrderItem, OrderStatus, ReceiptData};
pub use receipt::{ReceiptForm, capture};
pub use store::{OrderDraft, OrderStore};
