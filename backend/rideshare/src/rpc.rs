//! Fullnode REST client. Waits for submitted transactions to become final.
//!
//! ## Resilience
//!
//! * A transaction the node has not indexed yet (404) or still reports as
//!   pending is polled again after the configured poll interval.
//! * Exponential back-off is applied when the node rate-limits, returns a
//!   5xx, or the request fails in transit, up to [`MAX_BACKOFF_SECS`] seconds.
//! * There is no overall deadline here; see [`crate::transaction::Submitter`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::LedgerError;
use crate::transaction::{CommittedTransaction, Ledger, TransactionHash};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// REST response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransactionResponse {
    /// `pending_transaction`, `user_transaction`, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub hash: Option<String>,
    /// Present once committed.
    pub success: Option<bool>,
    pub vm_status: Option<String>,
    /// Ledger version, encoded as a decimal string.
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Poll {
    Pending,
    Committed(CommittedTransaction),
}

// ─────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct NodeClient {
    client: Client,
    node_url: String,
    poll_interval: Duration,
}

impl NodeClient {
    pub fn new(client: Client, node_url: &str, poll_interval: Duration) -> Self {
        Self {
            client,
            node_url: node_url.trim_end_matches('/').to_string(),
            poll_interval,
        }
    }
}

#[async_trait]
impl Ledger for NodeClient {
    async fn wait_for_finality(
        &self,
        hash: &TransactionHash,
    ) -> Result<CommittedTransaction, LedgerError> {
        let url = format!("{}/v1/transactions/by_hash/{}", self.node_url, hash);
        let mut backoff = INITIAL_BACKOFF_SECS;

        loop {
            let resp = match self.client.get(&url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Node request failed (will retry in {backoff}s): {e}");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                warn!("Node answered {status} (will retry in {backoff}s)");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            backoff = INITIAL_BACKOFF_SECS;

            if status == StatusCode::NOT_FOUND {
                debug!("{hash} not visible on the node yet");
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            if !status.is_success() {
                let text = resp.text().await?;
                return Err(LedgerError::Node {
                    status: status.as_u16(),
                    message: error_message(&text),
                });
            }

            let body: TransactionResponse = resp.json().await?;
            match interpret(body, hash)? {
                Poll::Pending => {
                    debug!("{hash} still pending");
                    tokio::time::sleep(self.poll_interval).await;
                }
                Poll::Committed(committed) => return Ok(committed),
            }
        }
    }
}

fn interpret(body: TransactionResponse, hash: &TransactionHash) -> Result<Poll, LedgerError> {
    if body.kind == "pending_transaction" {
        return Ok(Poll::Pending);
    }
    let vm_status = body.vm_status.unwrap_or_default();
    match body.success {
        // Committed types without a verdict are treated as still settling.
        None => Ok(Poll::Pending),
        Some(false) => Err(LedgerError::Aborted(vm_status)),
        Some(true) => Ok(Poll::Committed(CommittedTransaction {
            hash: body.hash.map(TransactionHash).unwrap_or_else(|| hash.clone()),
            version: body.version.and_then(|v| v.parse().ok()),
            vm_status,
        })),
    }
}

/// Prefer the node's `{"message": ...}` body, fall back to the raw text.
fn error_message(text: &str) -> String {
    serde_json::from_str::<NodeErrorBody>(text)
        .map(|body| body.message)
        .unwrap_or_else(|_| text.trim().to_string())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
