//! Minimal client for the target chain's REST endpoints.
use crate::error::RpcError;
use crate::tx::{BroadcastBody, StdTx, BROADCAST_MODE, TXS_PATH};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    #[serde_as(as = "DisplayFromStr")]
    pub height: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde_as(as = "DisplayFromStr")]
    pub num_txs: u64,
}

#[derive(Debug, Deserialize)]
struct BlockResponse {
    block: Block,
}

#[derive(Debug, Deserialize)]
struct Block {
    header: BlockHeader,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: String,
    #[serde_as(as = "DisplayFromStr")]
    pub account_number: u64,
    #[serde_as(as = "DisplayFromStr")]
    pub sequence: u64,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    result: AccountResult,
}

#[derive(Debug, Deserialize)]
struct AccountResult {
    value: AccountInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BroadcastResponse {
    pub txhash: String,
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    base_url: String,
}

impl RpcClient {
    pub fn new(client: reqwest::Client, target_url: &str) -> Self {
        Self {
            client,
            base_url: target_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn account(&self, address: &str) -> Result<AccountInfo, RpcError> {
        let res: AccountResponse = self.get_json(&format!("/auth/accounts/{address}")).await?;
        Ok(res.result.value)
    }

    pub async fn latest_block(&self) -> Result<BlockHeader, RpcError> {
        let res: BlockResponse = self.get_json("/blocks/latest").await?;
        Ok(res.block.header)
    }

    pub async fn block(&self, height: u64) -> Result<BlockHeader, RpcError> {
        let res: BlockResponse = self.get_json(&format!("/blocks/{height}")).await?;
        Ok(res.block.header)
    }

    pub async fn latest_height(&self) -> Result<u64, RpcError> {
        Ok(self.latest_block().await?.height)
    }

    /// Headers for every height in `from..=to`, in order.
    pub async fn blocks(&self, from: u64, to: u64) -> Result<Vec<BlockHeader>, RpcError> {
        let mut headers = Vec::with_capacity(to.saturating_sub(from) as usize + 1);
        for height in from..=to {
            headers.push(self.block(height).await?);
        }
        Ok(headers)
    }

    /// Broadcasts in sync mode. A response with a non-zero `code` is an error.
    #[instrument(skip_all, fields(msgs = tx.msg.len()))]
    pub async fn broadcast(&self, tx: &StdTx) -> Result<BroadcastResponse, RpcError> {
        let url = format!("{}{TXS_PATH}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&BroadcastBody {
                mode: BROADCAST_MODE,
                tx,
            })
            .send()
            .await?;

        let res: BroadcastResponse = read_json(url, response).await?;
        if res.code != 0 {
            return Err(RpcError::Broadcast {
                code: res.code,
                log: res.raw_log,
            });
        }
        debug!("Broadcast {}", res.txhash);
        Ok(res)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RpcError> {
        let url = format!("{}{path}", self.base_url);
        trace!("GET {url}");
        let response = self.client.get(&url).send().await?;
        read_json(url, response).await
    }
}

async fn read_json<T: DeserializeOwned>(
    url: String,
    response: reqwest::Response,
) -> Result<T, RpcError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(RpcError::RequestFailed {
            url,
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}
