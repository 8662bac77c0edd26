//! Outbound SMS notifications.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendSmsResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl SendSmsResult {
    pub fn ok() -> Self {
        Self { success: true, error_message: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()) }
    }
}

/// Senders report failure in the result; they never error out.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> SendSmsResult;
}

/// Logs the message instead of delivering it.
#[derive(Debug, Default)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, message: &str) -> SendSmsResult {
        info!(to = %phone, message, "SMS (log only)");
        SendSmsResult::ok()
    }
}

/// POSTs `{"to", "message"}` to a gateway webhook.
pub struct WebhookSmsSender {
    client: reqwest::Client,
    url: String,
}

impl WebhookSmsSender {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl SmsSender for WebhookSmsSender {
    #[instrument(skip(self, message), fields(url = %self.url))]
    async fn send(&self, phone: &str, message: &str) -> SendSmsResult {
        let resp = self.client
            .post(&self.url)
            .json(&json!({"to": phone, "message": message}))
            .send()
            .await;
        match resp {
            Ok(r) if r.status().is_success() => SendSmsResult::ok(),
            Ok(r) => {
                let status = r.status();
                warn!(%status, "SMS webhook rejected message");
                SendSmsResult::failed(format!("SMS gateway returned {status}"))
            }
            Err(e) => {
                warn!(error = %e, "SMS webhook unreachable");
                SendSmsResult::failed(e.to_string())
            }
        }
    }
}

/// Text sent when an appointment is booked.
pub fn appointment_confirmation(patient_name: &str, doctor_name: &str, date: &str, time: &str) -> String {
    format!(
        "Hi {patient_name}, your appointment with {doctor_name} on {date} at {time} is booked. \
         Reply or call the clinic to reschedule."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    async fn spawn_gateway(status: StatusCode) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let app = Router::new().route(
            "/sms",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    status
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/sms"), seen)
    }

    #[tokio::test]
    async fn test_log_sender_succeeds() {
        let result = LogSmsSender.send("5550001111", "hello").await;
        assert_eq!(result, SendSmsResult::ok());
    }

    #[tokio::test]
    async fn test_webhook_posts_payload() {
        let (url, seen) = spawn_gateway(StatusCode::OK).await;
        let sender = WebhookSmsSender::new(url).unwrap();
        let result = sender.send("5550001111", "Your appointment").await;
        assert!(result.success);

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies[0]["to"], "5550001111");
        assert_eq!(bodies[0]["message"], "Your appointment");
    }

    #[tokio::test]
    async fn test_webhook_non_2xx_is_failure() {
        let (url, _) = spawn_gateway(StatusCode::BAD_GATEWAY).await;
        let sender = WebhookSmsSender::new(url).unwrap();
        let result = sender.send("5550001111", "x").await;
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("502"));
    }

    #[test]
    fn test_confirmation_text() {
        let text = appointment_confirmation("John Doe", "Dr. Smith", "2030-07-30", "10:00");
        assert!(text.starts_with("Hi John Doe, your appointment with Dr. Smith on 2030-07-30 at 10:00"));
    }
}
