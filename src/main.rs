use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use zapflow::config::DispatchConfig;
use zapflow::console::{Console, NewOrder};
use zapflow::dispatch::{MessageGateway, ReqwestTransport};
use zapflow::orders::receipt::ReceiptForm;
use zapflow::persist::FileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let data_dir =
        std::env::var("ZAPFLOW_DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let config = DispatchConfig::from_env()?;

    eprintln!("📦 ZapFlow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Dispatch method: {}", config.method);
    eprintln!("   Data dir: {}", data_dir);
    eprintln!("   Type 'help' for commands. 'quit' to exit.\n");

    let persistence = Arc::new(FileStore::open(&data_dir)?);
    let console = Arc::new(
        Console::new(
            MessageGateway::new(Arc::new(ReqwestTransport::new())),
            config,
        )
        .with_persistence(persistence),
    );
    console.restore_state()?;

    // Drain due broadcasts in the background.
    {
        let console = Arc::clone(&console);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(std::time::Duration::from_secs(30));
            loop {
                tick.tick().await;
                let run = console.dispatch_due_broadcasts(Utc::now()).await;
                if run.sent + run.failed > 0 {
                    tracing::info!(sent = run.sent, failed = run.failed, "Broadcast tick");
                }
            }
        });
    }

    repl(&console).await
}

/// Minimal operator REPL for driving the console locally.
async fn repl(console: &Console) -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    eprint!("> ");
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            eprint!("> ");
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let rest: Vec<&str> = parts.collect();

        match command {
            "quit" | "exit" => break,
            "help" => print_help(),
            "contacts" => {
                for c in console.contacts().list() {
                    println!("{}  {}  {}", c.id, c.name, c.phone);
                }
            }
            "contact" => match rest.as_slice() {
                [name, phone] => {
                    let c = console.add_contact(*name, *phone, "");
                    println!("Added {} ({})", c.name, c.id);
                }
                _ => println!("Usage: contact <name> <phone>"),
            },
            "material" => match rest.as_slice() {
                [unit, name @ ..] if !name.is_empty() => {
                    let m = console.add_material(name.join(" "), *unit);
                    println!("Added {} [{}]", m.name, m.unit);
                }
                _ => println!("Usage: material <unit> <name...>"),
            },
            "orders" => {
                for o in console.orders().list() {
                    println!(
                        "#{:<4} {:<10} {:<20} {}",
                        o.order_number, o.status, o.contact_name, o.city
                    );
                }
            }
            "order" => match rest.as_slice() {
                [contact_id, city, quantity, name @ ..] if !name.is_empty() => {
                    match order_from_args(console, contact_id, city, quantity, &name.join(" ")) {
                        Ok(new_order) => match console.create_order(new_order) {
                            Ok(o) => println!("Order #{} scheduled for {}", o.order_number, o.contact_name),
                            Err(e) => println!("Error: {e}"),
                        },
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: order <contact-id> <city> <quantity> <material...>"),
            },
            "prepare" | "cancel" => match rest.first().and_then(|n| lookup_order(console, n)) {
                Some(order) => {
                    let target = if command == "prepare" {
                        zapflow::orders::OrderStatus::Preparing
                    } else {
                        zapflow::orders::OrderStatus::Cancelled
                    };
                    match console.update_order_status(order.id, target) {
                        Ok(o) => println!("Order #{} is now {}", o.order_number, o.status),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                None => println!("Usage: {command} <order-number>"),
            },
            "deliver" => match rest.as_slice() {
                [number, receiver @ ..] if !receiver.is_empty() => {
                    match lookup_order(console, number) {
                        Some(order) => {
                            let form = ReceiptForm {
                                full_name: receiver.join(" "),
                                document: String::new(),
                                signature: "(captured on device)".to_string(),
                                received_at: Utc::now().date_naive(),
                            };
                            match console.confirm_delivery(order.id, form).await {
                                Ok(confirmation) => {
                                    println!(
                                        "Order #{} delivered",
                                        confirmation.order.order_number
                                    );
                                    if let Some(warning) =
                                        confirmation.report.and_then(|r| r.warning())
                                    {
                                        println!("⚠️  {warning}");
                                    }
                                }
                                Err(e) => println!("Error: {e}"),
                            }
                        }
                        None => println!("Unknown order number"),
                    }
                }
                _ => println!("Usage: deliver <order-number> <receiver name...>"),
            },
            "send" => match rest.as_slice() {
                [contact_id, words @ ..] if !words.is_empty() => {
                    let report = console.send_chat_message(contact_id, &words.join(" ")).await;
                    match report.warning() {
                        None => println!("Sent"),
                        Some(warning) => println!("⚠️  {warning}"),
                    }
                }
                _ => println!("Usage: send <contact-id> <text...>"),
            },
            "inbox" => {
                for conv in console.inbox().list() {
                    let marker = if conv.is_unread { "●" } else { " " };
                    println!(
                        "{} {:<20} [{}] {}",
                        marker, conv.contact_name, conv.last_timestamp, conv.last_message
                    );
                }
            }
            other => println!("Unknown command: {other} (try 'help')"),
        }
        eprint!("> ");
    }

    Ok(())
}

fn print_help() {
    println!("  contacts                                    list contacts");
    println!("  contact <name> <phone>                      add a contact");
    println!("  material <unit> <name...>                   add a catalog material");
    println!("  orders                                      list orders");
    println!("  order <contact-id> <city> <qty> <mat...>    schedule an order");
    println!("  prepare <order-number>                      mark order preparing");
    println!("  cancel <order-number>                       cancel an order");
    println!("  deliver <order-number> <receiver...>        confirm delivery");
    println!("  send <contact-id> <text...>                 send a chat message");
    println!("  inbox                                       list conversations");
    println!("  quit                                        exit");
}

fn order_from_args(
    console: &Console,
    contact_id: &str,
    city: &str,
    quantity: &str,
    material: &str,
) -> anyhow::Result<NewOrder> {
    let quantity: f64 = quantity.parse()?;
    let item = console.compose_item(material, quantity)?;
    Ok(NewOrder {
        contact_id: contact_id.to_string(),
        city: city.to_string(),
        description: String::new(),
        delivery_date: Utc::now().date_naive(),
        issue_invoice: false,
        items: vec![item],
    })
}

fn lookup_order(console: &Console, number: &str) -> Option<zapflow::orders::Order> {
    let number: u64 = number.parse().ok()?;
    console.orders().find_by_number(number)
}
