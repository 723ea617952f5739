use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use urlencoding::encode;

use crate::error::HistError;
use crate::limiter::RateLimiter;

/// Partition key to the number of records the remote holds for it.
pub type TotalsIndex = BTreeMap<String, u64>;

/// Read side of the remote history API. Every request first takes a permit
/// from the shared limiter.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: Client,
    base_url: String,
    limiter: Arc<RateLimiter>,
}

impl HistoryClient {
    pub fn new(base_url: &str, limiter: Arc<RateLimiter>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }

    pub fn totals_url(&self) -> String {
        format!("{}/totals.json", self.base_url)
    }

    pub fn history_url(&self, key: &str) -> String {
        format!("{}/{}.json", self.base_url, encode(key))
    }

    pub async fn fetch_totals(&self) -> Result<TotalsIndex, HistError> {
        let body = self
            .get_bytes(&self.totals_url())
            .await
            .map_err(|err| HistError::RemoteIndex(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| HistError::RemoteIndex(err.to_string()))
    }

    /// Raw body of one partition's history document.
    pub async fn fetch_history(&self, key: &str) -> Result<Vec<u8>, HistError> {
        self.get_bytes(&self.history_url(key))
            .await
            .map_err(|err| match err {
                GetError::Status(status) => HistError::Status {
                    key: key.to_string(),
                    status: status.as_u16(),
                },
                GetError::Transport(err) => HistError::Fetch {
                    key: key.to_string(),
                    cause: err.to_string(),
                },
            })
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, GetError> {
        self.limiter.acquire().await;

        let response = self.client.get(url).send().await?;
        if response.status() != StatusCode::OK {
            return Err(GetError::Status(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Debug, thiserror::Error)]
enum GetError {
    #[error("non happy status: {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}
