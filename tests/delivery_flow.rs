//! End-to-end test: order lifecycle → notification dispatch → conversation
//! threading, against a scripted transport.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;

use zapflow::config::DispatchConfig;
use zapflow::console::{Console, NewOrder};
use zapflow::dispatch::transport::{HttpReply, HttpTransport, TransportError};
use zapflow::dispatch::{MessageGateway, SendOutcome};
use zapflow::inbox::Sender;
use zapflow::orders::model::{OrderItem, OrderStatus};
use zapflow::orders::receipt::ReceiptForm;

/// Transport that answers every request with a fixed status and records the
/// request bodies it saw.
struct RecordingTransport {
    status: u16,
    calls: AtomicUsize,
    bodies: Mutex<Vec<serde_json::Value>>,
}

impl RecordingTransport {
    fn new(status: u16) -> Arc<Self> {
        Arc::new(Self {
            status,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn post_json(
        &self,
        _url: &str,
        _headers: &[(&str, String)],
        body: &serde_json::Value,
    ) -> Result<HttpReply, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
        Ok(HttpReply {
            status: self.status,
            body: r#"{"error":{"message":"scripted failure"}}"#.to_string(),
        })
    }
}

fn console(transport: Arc<RecordingTransport>) -> Console {
    Console::new(
        MessageGateway::new(transport),
        DispatchConfig::official("test-token", "1054620444391410"),
    )
}

fn ana_order(console: &Console, contact_id: &str) -> zapflow::orders::Order {
    console
        .create_order(NewOrder {
            contact_id: contact_id.to_string(),
            city: "Mirassol".to_string(),
            description: "Leave at the gate".to_string(),
            delivery_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            issue_invoice: true,
            items: vec![OrderItem {
                material_name: "Box".to_string(),
                unit: "un".to_string(),
                quantity: 3.0,
            }],
        })
        .unwrap()
}

fn receipt() -> ReceiptForm {
    ReceiptForm {
        full_name: "Ana Silva".to_string(),
        document: "123".to_string(),
        signature: "<blob>".to_string(),
        received_at: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    }
}

#[tokio::test]
async fn delivery_confirmation_notifies_and_threads() {
    let transport = RecordingTransport::new(200);
    let console = console(transport.clone());
    let ana = console.add_contact("Ana", "+55 17 99999-0001", "Retail");
    let order = ana_order(&console, &ana.id);

    let confirmation = console.confirm_delivery(order.id, receipt()).await.unwrap();

    // Order committed with its receipt.
    assert_eq!(confirmation.order.status, OrderStatus::Delivered);
    assert_eq!(
        confirmation.order.receipt.as_ref().unwrap().full_name,
        "Ana Silva"
    );

    // One dispatch to Ana's normalized number, with the rendered notice.
    assert_eq!(transport.call_count(), 1);
    let body = &transport.bodies()[0];
    assert_eq!(body["to"], "5517999990001");
    let text = body["text"]["body"].as_str().unwrap();
    assert!(text.contains("Box"));
    assert!(text.contains("Ana Silva"));
    assert!(text.contains(&format!("#{}", order.order_number)));

    // The thread gained exactly one outbound message with the same text.
    let conv = console.inbox().conversation(&ana.id).unwrap();
    assert_eq!(conv.messages.len(), 1);
    assert_eq!(conv.messages[0].sender, Sender::Me);
    assert_eq!(conv.messages[0].text, text);
    assert!(matches!(
        confirmation.report.unwrap().dispatch,
        Some(Ok(SendOutcome::Accepted))
    ));
}

#[tokio::test]
async fn dispatch_failure_still_threads_and_keeps_the_delivery() {
    let transport = RecordingTransport::new(400);
    let console = console(transport.clone());
    let ana = console.add_contact("Ana", "5517999990001", "");
    let order = ana_order(&console, &ana.id);

    let confirmation = console.confirm_delivery(order.id, receipt()).await.unwrap();

    assert_eq!(confirmation.order.status, OrderStatus::Delivered);
    let report = confirmation.report.unwrap();
    let warning = report.warning().unwrap();
    // The provider's own message is surfaced verbatim.
    assert!(warning.contains("scripted failure"));

    // Thread reflects intent despite the failure.
    let conv = console.inbox().conversation(&ana.id).unwrap();
    assert_eq!(conv.messages.len(), 1);
    assert_eq!(
        console.orders().get(order.id).unwrap().status,
        OrderStatus::Delivered
    );
}

#[tokio::test]
async fn receipt_gate_blocks_delivery_and_dispatch() {
    let transport = RecordingTransport::new(200);
    let console = console(transport.clone());
    let ana = console.add_contact("Ana", "5517999990001", "");
    let order = ana_order(&console, &ana.id);

    let mut form = receipt();
    form.full_name = "   ".to_string();
    assert!(console.confirm_delivery(order.id, form).await.is_err());

    assert_eq!(
        console.orders().get(order.id).unwrap().status,
        OrderStatus::Pending
    );
    assert_eq!(transport.call_count(), 0);
    assert!(console.inbox().conversation(&ana.id).is_none());
}

#[tokio::test]
async fn lifecycle_walk_then_terminal_rejection() {
    let transport = RecordingTransport::new(200);
    let console = console(transport.clone());
    let ana = console.add_contact("Ana", "5517999990001", "");
    let order = ana_order(&console, &ana.id);

    let o = console
        .update_order_status(order.id, OrderStatus::Preparing)
        .unwrap();
    assert_eq!(o.status, OrderStatus::Preparing);

    let o = console
        .update_order_status(order.id, OrderStatus::Cancelled)
        .unwrap();
    assert_eq!(o.status, OrderStatus::Cancelled);

    // Terminal: the delivery confirmation must be rejected outright.
    assert!(console.confirm_delivery(order.id, receipt()).await.is_err());
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn order_numbers_are_strictly_increasing() {
    let transport = RecordingTransport::new(200);
    let console = console(transport);
    let ana = console.add_contact("Ana", "5517999990001", "");

    let numbers: Vec<u64> = (0..4)
        .map(|_| ana_order(&console, &ana.id).order_number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn manual_method_hands_off_without_network() {
    let transport = RecordingTransport::new(200);
    let console = console(transport.clone());
    console.update_dispatch_config(DispatchConfig::manual());
    let ana = console.add_contact("Ana", "+55 (17) 99999-0001", "");

    let report = console.send_chat_message(&ana.id, "até amanhã!").await;
    match report.dispatch {
        Some(Ok(SendOutcome::Handoff { url })) => {
            assert!(url.starts_with("https://wa.me/5517999990001?text="));
            // URL-safe encoding of the message text.
            assert!(url.contains("at%C3%A9%20amanh%C3%A3%21"));
        }
        other => panic!("Expected a manual handoff, got {other:?}"),
    }
    assert_eq!(transport.call_count(), 0);
    assert_eq!(
        console.inbox().conversation(&ana.id).unwrap().last_message,
        "até amanhã!"
    );
}
