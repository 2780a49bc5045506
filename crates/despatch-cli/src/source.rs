use async_trait::async_trait;
use log::debug;
use pdf_despatch::{DespatchError, OrderSource, Result, Window};
use serde_json::Value;
use std::time::Duration;

const PAGE_SIZE: u32 = 500;

/// Shipping API order listing, `GET {base}/orders`
pub struct HttpOrderSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl HttpOrderSource {
    pub fn new(base_url: &str, api_key: &str, api_secret: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DespatchError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    async fn fetch_page(&self, window: &Window, page: u32) -> Result<Value> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(&window_query(window, page))
            .send()
            .await
            .map_err(|e| DespatchError::Source(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DespatchError::Source(format!(
                "{}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DespatchError::Source(format!("{}: invalid JSON: {}", url, e)))
    }
}

#[async_trait]
impl OrderSource for HttpOrderSource {
    async fn fetch_orders(&self, window: &Window) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        let mut page = 1;
        loop {
            let (batch, pages) = split_page(self.fetch_page(window, page).await?)?;
            debug!("Order page {} of {}: {} records", page, pages, batch.len());
            let done = batch.is_empty() || page >= pages;
            records.extend(batch);
            if done {
                break;
            }
            page += 1;
        }
        Ok(records)
    }
}

fn window_query(window: &Window, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("createDateStart", window.since.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ("createDateEnd", window.until.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ("pageSize", PAGE_SIZE.to_string()),
        ("page", page.to_string()),
    ]
}

/// Accepts a bare array or an `{orders, page, pages}` envelope.
fn split_page(body: Value) -> Result<(Vec<Value>, u32)> {
    match body {
        Value::Array(records) => Ok((records, 1)),
        Value::Object(mut envelope) => {
            let pages = envelope
                .get("pages")
                .and_then(Value::as_u64)
                .map(|p| p.clamp(1, u32::MAX as u64) as u32)
                .unwrap_or(1);
            match envelope.remove("orders") {
                Some(Value::Array(records)) => Ok((records, pages)),
                Some(Value::Null) | None => Ok((Vec::new(), pages)),
                Some(other) => Err(DespatchError::Source(format!(
                    "'orders' should be an array, got {}",
                    other
                ))),
            }
        }
        other => Err(DespatchError::Source(format!(
            "Unexpected order listing: {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_bare_array_is_single_page() {
        let (records, pages) = split_page(json!([{"orderNumber": "1"}])).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(pages, 1);
    }

    #[test]
    fn test_envelope_reports_page_count() {
        let (records, pages) = split_page(json!({"orders": [{}, {}], "page": 1, "pages": 3})).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(pages, 3);
    }

    #[test]
    fn test_envelope_without_orders_is_empty() {
        let (records, _) = split_page(json!({"total": 0})).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_scalar_body_rejected() {
        assert!(split_page(json!("maintenance")).is_err());
    }

    #[test]
    fn test_window_query_uses_utc_bounds() {
        let window = Window {
            since: Utc.with_ymd_and_hms(2024, 6, 30, 23, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2024, 7, 1, 23, 0, 0).unwrap(),
        };
        let query = window_query(&window, 2);
        assert_eq!(query[0], ("createDateStart", "2024-06-30T23:00:00Z".to_string()));
        assert_eq!(query[1], ("createDateEnd", "2024-07-01T23:00:00Z".to_string()));
        assert_eq!(query[3], ("page", "2".to_string()));
    }
}
