use super::LabelFetcher;
use crate::types::*;
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches label documents over HTTP(S)
#[derive(Clone)]
pub struct HttpLabelFetcher {
    client: reqwest::Client,
}

impl HttpLabelFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DespatchError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LabelFetcher for HttpLabelFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching label document {}", url);
        let fetch_error = |reason: String| DespatchError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
