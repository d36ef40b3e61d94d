use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::StatsError;
use crate::models::{RawTx, SortOrder};

/// Message the explorer uses for a valid-but-empty result set.
pub const NO_TRANSACTIONS: &str = "No transactions found";

/// Base query shared by all three category fetchers.
#[derive(Debug, Clone)]
pub struct TransferQuery {
    pub address: String,
    pub startblock: u64,
    pub endblock: u64,
    pub sort: SortOrder,
}

/// One explorer response envelope. `result` stays raw JSON: an array of
/// records on success, a bare string on explorer-side errors.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub result: serde_json::Value,
}

impl ApiEnvelope {
    /// Decode the envelope into records. A `status=0` page carrying the
    /// "no transactions" sentinel is an empty page, not a failure.
    pub fn into_records(self) -> Result<Vec<RawTx>, StatsError> {
        if self.status == "0" {
            if self.message == NO_TRANSACTIONS {
                return Ok(Vec::new());
            }
            return Err(StatsError::Source {
                message: self.message,
                result: self.result.to_string(),
            });
        }
        match self.result {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item)
                        .map_err(|e| StatsError::Validation(format!("undecodable record: {e}")))
                })
                .collect(),
            serde_json::Value::Null => Ok(Vec::new()),
            other => Err(StatsError::Validation(format!(
                "unexpected result payload: {other}"
            ))),
        }
    }
}

/// Walk a paged query to exhaustion, page 1 upward. A page shorter than
/// `page_size` (or empty) is the completion signal; no total-count field is
/// trusted. `pause` is slept between consecutive page requests to respect
/// the explorer's rate policy.
pub async fn collect_pages<F, Fut>(
    page_size: u64,
    pause: Duration,
    mut fetch_page: F,
) -> Result<Vec<RawTx>, StatsError>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<ApiEnvelope, StatsError>>,
{
    let mut items = Vec::new();
    let mut page = 1u64;
    loop {
        let chunk = fetch_page(page).await?.into_records()?;
        if chunk.is_empty() {
            break;
        }
        let last = (chunk.len() as u64) < page_size;
        items.extend(chunk);
        if last {
            break;
        }
        page += 1;
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    Ok(items)
}

/// The three transfer categories the explorer exposes per address.
#[async_trait]
pub trait TransferSource {
    async fn normal_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError>;
    async fn internal_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError>;
    async fn token_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError>;
}

/// Etherscan-compatible account API client.
#[derive(Debug)]
pub struct EtherscanClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    page_size: u64,
    pause: Duration,
}

impl EtherscanClient {
    pub fn new(
        api_url: String,
        api_key: Option<String>,
        page_size: u64,
        pause: Duration,
    ) -> Result<Self, StatsError> {
        let api_key = match api_key {
            Some(key) if !key.is_empty() => key,
            _ => return Err(StatsError::Config("ETHERSCAN_API_KEY missing".into())),
        };
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_url,
            api_key,
            page_size,
            pause,
        })
    }

    async fn fetch_page(
        &self,
        action: &str,
        query: &TransferQuery,
        page: u64,
    ) -> Result<ApiEnvelope, StatsError> {
        debug!(action, page, address = %query.address, "requesting page");
        let params = [
            ("module", "account".to_string()),
            ("action", action.to_string()),
            ("address", query.address.clone()),
            ("startblock", query.startblock.to_string()),
            ("endblock", query.endblock.to_string()),
            ("sort", query.sort.to_string()),
            ("page", page.to_string()),
            ("offset", self.page_size.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        let response = self
            .http
            .get(&self.api_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn paged(&self, action: &str, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError> {
        let items = collect_pages(self.page_size, self.pause, move |page| {
            self.fetch_page(action, query, page)
        })
        .await?;
        info!(action, records = items.len(), "category fetch complete");
        Ok(items)
    }
}

#[async_trait]
impl TransferSource for EtherscanClient {
    async fn normal_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError> {
        self.paged("txlist", query).await
    }

    async fn internal_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError> {
        self.paged("txlistinternal", query).await
    }

    async fn token_transfers(&self, query: &TransferQuery) -> Result<Vec<RawTx>, StatsError> {
        self.paged("tokentx", query).await
    }
}
