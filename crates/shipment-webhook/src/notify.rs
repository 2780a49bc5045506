use crate::error::{Result, WebhookError};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

pub const DELIVERED_EVENT: &str = "Order Delivered";

/// Payload of the one-time delivered notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveredEvent {
    pub email: String,
    pub order_id: String,
    pub tracking_number: String,
    pub carrier: Option<String>,
}

/// Downstream marketing event sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn delivered(&self, event: &DeliveredEvent) -> Result<()>;
}

/// Posts events as JSON with a bearer API key
pub struct HttpNotifier {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct EventRequest<'a> {
    event: &'static str,
    email: &'a str,
    properties: &'a DeliveredEvent,
}

impl HttpNotifier {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WebhookError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn delivered(&self, event: &DeliveredEvent) -> Result<()> {
        let request = EventRequest {
            event: DELIVERED_EVENT,
            email: &event.email,
            properties: event,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| WebhookError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WebhookError::Notification(format!(
                "HTTP {} from {}",
                response.status(),
                self.endpoint
            )));
        }
        Ok(())
    }
}
