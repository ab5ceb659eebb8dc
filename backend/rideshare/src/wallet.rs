//! Wallet bridge client.
//!
//! The signing key never lives in this process.  A local bridge (browser
//! extension relay, hardware signer, ...) exposes three JSON endpoints:
//!
//! | Endpoint               | Body                  | Reply        |
//! |------------------------|-----------------------|--------------|
//! | `POST /connect`        | `{provider}`          | `{address}`  |
//! | `POST /disconnect`     | (empty)               | any 2xx      |
//! | `POST /sign_and_submit`| `{sender, data}`      | `{hash}`     |
//!
//! Any non-2xx reply is a rejection; its `{"error": ...}` text is kept.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::errors::WalletError;
use crate::session::{AccountAddress, Wallet};
use crate::transaction::{TransactionHash, TransactionRequest};

#[derive(Debug, Deserialize)]
struct ConnectReply {
    address: String,
}

#[derive(Debug, Deserialize)]
struct SubmitReply {
    hash: TransactionHash,
}

#[derive(Debug, Deserialize)]
struct BridgeError {
    error: String,
}

#[derive(Serialize)]
struct SignAndSubmit<'a> {
    sender: &'a AccountAddress,
    data: &'a TransactionRequest,
}

#[derive(Clone)]
pub struct RemoteWallet {
    client: Client,
    base_url: String,
}

impl RemoteWallet {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client settings for the bridge. Only the connect is bounded: a
    /// signature request stays open for as long as the user takes to answer.
    pub fn client_builder(connect_timeout: Duration) -> ClientBuilder {
        Client::builder().connect_timeout(connect_timeout)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

/// Turn a non-2xx bridge reply into a rejection carrying its reason.
async fn check(resp: Response) -> Result<Response, WalletError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await?;
    let reason = serde_json::from_str::<BridgeError>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| match text.trim() {
            "" => status.to_string(),
            trimmed => trimmed.to_string(),
        });
    Err(WalletError::Rejected(reason))
}

#[async_trait]
impl Wallet for RemoteWallet {
    async fn connect(&self, provider: &str) -> Result<AccountAddress, WalletError> {
        let resp = self
            .client
            .post(self.url("connect"))
            .json(&json!({ "provider": provider }))
            .send()
            .await?;
        let reply: ConnectReply = check(resp).await?.json().await?;
        reply
            .address
            .parse()
            .map_err(|e| WalletError::Rejected(format!("bridge returned a bad address: {e}")))
    }

    async fn disconnect(&self) -> Result<(), WalletError> {
        let resp = self.client.post(self.url("disconnect")).send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn sign_and_submit(
        &self,
        sender: &AccountAddress,
        request: &TransactionRequest,
    ) -> Result<TransactionHash, WalletError> {
        debug!("Requesting signature for {}", request.function);
        let resp = self
            .client
            .post(self.url("sign_and_submit"))
            .json(&SignAndSubmit {
                sender,
                data: request,
            })
            .send()
            .await?;
        let reply: SubmitReply = check(resp).await?.json().await?;
        Ok(reply.hash)
    }
}
