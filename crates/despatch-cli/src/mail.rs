use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use pdf_despatch::{DespatchError, Mailer, OutgoingMail, Result};
use serde::Serialize;
use std::time::Duration;

/// Send-mail REST endpoint authenticated with a bearer token
pub struct RestMailer {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    from: String,
    to: Vec<String>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
    attachments: Vec<Attachment<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Attachment<'a> {
    filename: &'a str,
    content_type: &'a str,
    /// Base64 encoded
    content: String,
}

impl RestMailer {
    pub fn new(endpoint: &str, token: &str, from: &str, to: Vec<String>, timeout: Duration) -> Result<Self> {
        if to.is_empty() {
            return Err(DespatchError::Config("At least one recipient is required".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DespatchError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            from: from.to_string(),
            to,
        })
    }
}

fn send_request<'a>(from: &'a str, to: &'a [String], mail: &'a OutgoingMail) -> SendRequest<'a> {
    SendRequest {
        from,
        to,
        subject: &mail.subject,
        text: &mail.body,
        attachments: vec![Attachment {
            filename: &mail.attachment_name,
            content_type: "application/pdf",
            content: STANDARD.encode(&mail.attachment),
        }],
    }
}

#[async_trait]
impl Mailer for RestMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        debug!(
            "Sending '{}' to {} recipient(s), {} byte attachment",
            mail.subject,
            self.to.len(),
            mail.attachment.len()
        );
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&send_request(&self.from, &self.to, mail))
            .send()
            .await
            .map_err(|e| DespatchError::Mail(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DespatchError::Mail(format!("HTTP {}: {}", status, body)));
        }
        Ok(())
    }
}
