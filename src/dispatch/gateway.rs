//! Message dispatch gateway — one `send` operation, three transport methods.
//!
//! Method selection is an exhaustive match over [`DispatchMethod`]; there is
//! no automatic fallback from `official` to anything else, so incomplete
//! Cloud API credentials fail the send instead of silently degrading.

use std::sync::Arc;

use secrecy::ExposeSecret;

use crate::config::{DispatchConfig, DispatchMethod};
use crate::dispatch::transport::HttpTransport;
use crate::error::DispatchError;

const CLOUD_API_BASE: &str = "https://graph.facebook.com/v22.0";

/// Successful send result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The remote API accepted the message (`official` or `gateway`).
    Accepted,
    /// Manual handoff: the caller opens this pre-filled wa.me link in the
    /// operator's messaging surface. No delivery confirmation exists.
    Handoff { url: String },
}

/// Strip everything but digits from a phone number. Shared by all methods.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Dispatches outbound texts through the configured transport method.
pub struct MessageGateway {
    transport: Arc<dyn HttpTransport>,
}

impl MessageGateway {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Send `text` to `to` using the method selected by `config`.
    ///
    /// Calling this twice with identical arguments issues two independent
    /// transport attempts; no dedup key is kept.
    pub async fn send(
        &self,
        to: &str,
        text: &str,
        config: &DispatchConfig,
    ) -> Result<SendOutcome, DispatchError> {
        let digits = normalize_phone(to);

        match config.method {
            DispatchMethod::Official => self.send_official(&digits, text, config).await,
            DispatchMethod::Gateway => match config.gateway_url.as_deref() {
                Some(url) => self.send_forwarded(url, &digits, text, config).await,
                // No forwarding endpoint configured behaves as unset: fall
                // through to the manual handoff.
                None => Ok(manual_handoff(&digits, text)),
            },
            DispatchMethod::Manual => Ok(manual_handoff(&digits, text)),
        }
    }

    /// WhatsApp Cloud API send.
    async fn send_official(
        &self,
        digits: &str,
        text: &str,
        config: &DispatchConfig,
    ) -> Result<SendOutcome, DispatchError> {
        let (Some(token), Some(phone_number_id)) =
            (&config.access_token, &config.phone_number_id)
        else {
            return Err(DispatchError::ConfigIncomplete {
                reason: "Cloud API needs an access token and a phone number id".to_string(),
            });
        };

        let url = format!("{CLOUD_API_BASE}/{phone_number_id}/messages");
        let headers = [(
            "Authorization",
            format!("Bearer {}", token.expose_secret()),
        )];
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": digits,
            "type": "text",
            "text": { "body": text },
        });

        let reply = self
            .transport
            .post_json(&url, &headers, &body)
            .await
            .map_err(|e| DispatchError::Network { message: e.0 })?;

        if reply.is_success() {
            tracing::info!(to = digits, "Cloud API message accepted");
            return Ok(SendOutcome::Accepted);
        }

        // The Cloud API wraps failures as {"error": {"message": ...}}.
        let detail: serde_json::Value = serde_json::from_str(&reply.body).unwrap_or_default();
        let message = detail
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown Cloud API error")
            .to_string();
        tracing::warn!(status = reply.status, error = %message, "Cloud API rejected message");
        Err(DispatchError::Provider { message })
    }

    /// Forwarding-gateway send.
    async fn send_forwarded(
        &self,
        url: &str,
        digits: &str,
        text: &str,
        config: &DispatchConfig,
    ) -> Result<SendOutcome, DispatchError> {
        let mut headers = Vec::new();
        if let Some(key) = &config.gateway_api_key {
            headers.push(("apikey", key.expose_secret().to_string()));
        }
        let body = serde_json::json!({
            "number": digits,
            "text": text,
        });

        let reply = self
            .transport
            .post_json(url, &headers, &body)
            .await
            .map_err(|e| DispatchError::Network { message: e.0 })?;

        if reply.is_success() {
            tracing::info!(to = digits, "Gateway message accepted");
            Ok(SendOutcome::Accepted)
        } else {
            tracing::warn!(status = reply.status, "Gateway rejected message");
            Err(DispatchError::Gateway {
                message: format!("gateway returned status {}", reply.status),
            })
        }
    }
}

/// Build the pre-filled wa.me link. Always succeeds; there is nothing to
/// observe beyond the handoff itself.
fn manual_handoff(digits: &str, text: &str) -> SendOutcome {
    let url = format!("https://wa.me/{digits}?text={}", urlencoding::encode(text));
    SendOutcome::Handoff { url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::transport::{HttpReply, TransportError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Captured request for assertions.
    #[derive(Debug, Clone)]
    struct Seen {
        url: String,
        headers: Vec<(String, String)>,
        body: serde_json::Value,
    }

    /// Scripted transport: returns a fixed reply (or failure) and records
    /// every request it sees.
    struct ScriptedTransport {
        reply: Result<HttpReply, TransportError>,
        calls: AtomicUsize,
        seen: Mutex<Option<Seen>>,
    }

    impl ScriptedTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpReply {
                    status,
                    body: body.to_string(),
                }),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(None),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(TransportError(message.to_string())),
                calls: AtomicUsize::new(0),
                seen: Mutex::new(None),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_seen(&self) -> Option<Seen> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn post_json(
            &self,
            url: &str,
            headers: &[(&str, String)],
            body: &serde_json::Value,
        ) -> Result<HttpReply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(Seen {
                url: url.to_string(),
                headers: headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.clone()))
                    .collect(),
                body: body.clone(),
            });
            self.reply.clone()
        }
    }

    fn gateway_with(transport: Arc<ScriptedTransport>) -> MessageGateway {
        MessageGateway::new(transport)
    }

    #[test]
    fn normalize_strips_non_digits() {
        assert_eq!(normalize_phone("+55 (17) 99999-0001"), "5517999990001");
        assert_eq!(normalize_phone("abc"), "");
    }

    // ── Official method ─────────────────────────────────────────────

    #[tokio::test]
    async fn official_missing_credentials_makes_no_network_call() {
        let transport = Arc::new(ScriptedTransport::replying(200, "{}"));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig {
            access_token: None,
            ..DispatchConfig::official("", "")
        };

        let err = gateway.send("5517999990001", "hi", &config).await.unwrap_err();
        assert!(matches!(err, DispatchError::ConfigIncomplete { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn official_success_posts_normalized_number_and_bearer_token() {
        let transport = Arc::new(ScriptedTransport::replying(200, "{}"));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig::official("tok-abc", "10540");

        let outcome = gateway
            .send("+55 (17) 99999-0001", "Your order arrived", &config)
            .await
            .unwrap();
        assert_eq!(outcome, SendOutcome::Accepted);
        assert_eq!(transport.call_count(), 1);

        let seen = transport.last_seen().unwrap();
        assert_eq!(seen.url, "https://graph.facebook.com/v22.0/10540/messages");
        assert_eq!(
            seen.headers,
            vec![("Authorization".to_string(), "Bearer tok-abc".to_string())]
        );
        assert_eq!(seen.body["to"], "5517999990001");
        assert_eq!(seen.body["messaging_product"], "whatsapp");
        assert_eq!(seen.body["text"]["body"], "Your order arrived");
    }

    #[tokio::test]
    async fn official_error_message_is_extracted_from_payload() {
        let transport = Arc::new(ScriptedTransport::replying(
            400,
            r#"{"error":{"message":"(#131030) Recipient not in allowed list"}}"#,
        ));
        let gateway = gateway_with(transport);
        let config = DispatchConfig::official("tok", "1");

        let err = gateway.send("123", "hi", &config).await.unwrap_err();
        match err {
            DispatchError::Provider { message } => {
                assert_eq!(message, "(#131030) Recipient not in allowed list");
            }
            other => panic!("Expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn official_unparseable_error_body_gets_fallback_message() {
        let transport = Arc::new(ScriptedTransport::replying(500, "<html>oops</html>"));
        let gateway = gateway_with(transport);
        let config = DispatchConfig::official("tok", "1");

        let err = gateway.send("123", "hi", &config).await.unwrap_err();
        match err {
            DispatchError::Provider { message } => {
                assert_eq!(message, "Unknown Cloud API error");
            }
            other => panic!("Expected Provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn official_transport_failure_is_network_error() {
        let transport = Arc::new(ScriptedTransport::failing("connection refused"));
        let gateway = gateway_with(transport);
        let config = DispatchConfig::official("tok", "1");

        let err = gateway.send("123", "hi", &config).await.unwrap_err();
        assert!(matches!(err, DispatchError::Network { .. }));
    }

    // ── Gateway method ──────────────────────────────────────────────

    #[tokio::test]
    async fn forwarding_gateway_posts_number_and_text_with_api_key() {
        let transport = Arc::new(ScriptedTransport::replying(201, ""));
        let gateway = gateway_with(transport.clone());
        let config =
            DispatchConfig::gateway("https://gw.example/send", Some("key-1".to_string()));

        let outcome = gateway.send("(17) 1234-5678", "hello", &config).await.unwrap();
        assert_eq!(outcome, SendOutcome::Accepted);

        let seen = transport.last_seen().unwrap();
        assert_eq!(seen.url, "https://gw.example/send");
        assert_eq!(
            seen.headers,
            vec![("apikey".to_string(), "key-1".to_string())]
        );
        assert_eq!(seen.body["number"], "1712345678");
        assert_eq!(seen.body["text"], "hello");
    }

    #[tokio::test]
    async fn forwarding_gateway_without_key_sends_no_auth_header() {
        let transport = Arc::new(ScriptedTransport::replying(200, ""));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig::gateway("https://gw.example/send", None);

        gateway.send("123", "hello", &config).await.unwrap();
        assert!(transport.last_seen().unwrap().headers.is_empty());
    }

    #[tokio::test]
    async fn forwarding_gateway_non_2xx_is_gateway_error() {
        let transport = Arc::new(ScriptedTransport::replying(503, "down"));
        let gateway = gateway_with(transport);
        let config = DispatchConfig::gateway("https://gw.example/send", None);

        let err = gateway.send("123", "hi", &config).await.unwrap_err();
        match err {
            DispatchError::Gateway { message } => assert!(message.contains("503")),
            other => panic!("Expected Gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn forwarding_gateway_without_url_falls_through_to_handoff() {
        let transport = Arc::new(ScriptedTransport::replying(200, ""));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig {
            gateway_url: None,
            ..DispatchConfig::gateway("", None)
        };

        let outcome = gateway.send("123", "hi", &config).await.unwrap();
        assert!(matches!(outcome, SendOutcome::Handoff { .. }));
        assert_eq!(transport.call_count(), 0);
    }

    // ── Manual method ───────────────────────────────────────────────

    #[tokio::test]
    async fn manual_always_succeeds_with_encoded_handoff_url() {
        let transport = Arc::new(ScriptedTransport::replying(500, ""));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig::manual();

        let outcome = gateway
            .send("+55 17 99999-0001", "Hello Ana & crew!", &config)
            .await
            .unwrap();
        match outcome {
            SendOutcome::Handoff { url } => {
                assert!(url.starts_with("https://wa.me/5517999990001?text="));
                assert!(url.contains("Hello%20Ana%20%26%20crew%21"));
            }
            other => panic!("Expected Handoff, got {other:?}"),
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn two_identical_sends_are_two_transport_attempts() {
        let transport = Arc::new(ScriptedTransport::replying(200, "{}"));
        let gateway = gateway_with(transport.clone());
        let config = DispatchConfig::official("tok", "1");

        gateway.send("123", "hi", &config).await.unwrap();
        gateway.send("123", "hi", &config).await.unwrap();
        assert_eq!(transport.call_count(), 2);
    }
}
